//! Checkout and preferences over the real router.
//!
//! The harness points the Polar client at a closed local port, so requests
//! that reach the provider fail with a connection error. That exercises the
//! provider-unavailable path and the rule that checkout preferences are
//! recorded even when checkout fails.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use paperfold_integration_tests::{read_json, request, session_cookie, test_app};

fn checkout_body(email: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "items": [
            {
                "type": "product",
                "productId": "planner-weekly",
                "polarProductId": "polar_prod_planner"
            }
        ]
    });
    if let Some(email) = email {
        body["customerEmail"] = json!(email);
    }
    body
}

// =============================================================================
// Request validation
// =============================================================================

#[tokio::test]
async fn test_checkout_with_no_items_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/checkout",
            Some(&json!({"items": []})),
            None,
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "No items to check out");
}

#[tokio::test]
async fn test_checkout_with_invalid_email_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/checkout",
            Some(&checkout_body(Some("not-an-email"))),
            None,
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid email address");
}

// =============================================================================
// Provider unavailable
// =============================================================================

#[tokio::test]
async fn test_checkout_surfaces_provider_unavailable() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/checkout",
            Some(&checkout_body(None)),
            None,
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Payment provider unavailable");
}

#[tokio::test]
async fn test_express_checkout_surfaces_provider_unavailable() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/checkout/express",
            Some(&json!({
                "type": "product",
                "productId": "planner-weekly",
                "polarProductId": "polar_prod_planner"
            })),
            None,
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_checkout_status_surfaces_provider_unavailable() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            Method::GET,
            "/api/checkout/chk_unknown/status",
            None,
            None,
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Preferences survive a failed checkout
// =============================================================================

#[tokio::test]
async fn test_failed_checkout_still_records_email_preference() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/checkout",
            Some(&checkout_body(Some("buyer@example.com"))),
            None,
        ))
        .await
        .expect("request");

    // The provider is down, but the attempt still saved preferences
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let cookie = session_cookie(&response).expect("attempt writes the session");

    let response = app
        .oneshot(request(Method::GET, "/api/preferences", None, Some(&cookie)))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["email"], "buyer@example.com");
    assert!(body["lastCheckoutAt"].is_string());
}

// =============================================================================
// Preferences endpoints
// =============================================================================

#[tokio::test]
async fn test_preferences_start_empty() {
    let app = test_app().await;

    let response = app
        .oneshot(request(Method::GET, "/api/preferences", None, None))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["email"], json!(null));
    assert_eq!(body["lastCheckoutAt"], json!(null));
}

#[tokio::test]
async fn test_clearing_preferences_forgets_the_email() {
    let app = test_app().await;

    // Record a preference through a (failing) checkout attempt
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/checkout",
            Some(&checkout_body(Some("buyer@example.com"))),
            None,
        ))
        .await
        .expect("request");
    let cookie = session_cookie(&response).expect("cookie");

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            "/api/preferences",
            None,
            Some(&cookie),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::GET, "/api/preferences", None, Some(&cookie)))
        .await
        .expect("request");
    let body = read_json(response).await;
    assert_eq!(body["email"], json!(null));
}
