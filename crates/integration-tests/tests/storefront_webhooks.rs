//! Webhook receiver verification, exercised over the real router.
//!
//! Every test signs (or deliberately mis-signs) a raw body the way Polar
//! would, using the same secret the test config carries. Only rejection
//! paths and no-op events run here; recording a paid order needs Postgres
//! and lives behind the seeded CLI flow instead.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use paperfold_integration_tests::{
    read_json, sign_webhook, signed_webhook_headers, test_app, webhook_request,
};

// =============================================================================
// Signature enforcement
// =============================================================================

#[tokio::test]
async fn test_delivery_without_headers_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(webhook_request(r#"{"type":"order.paid","data":{}}"#, &[]))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "missing webhook header: webhook-id");
}

#[tokio::test]
async fn test_wrong_signature_is_rejected() {
    let app = test_app().await;
    let body = r#"{"type":"order.paid","data":{}}"#;
    let headers = vec![
        ("webhook-id", "msg_test_1".to_owned()),
        ("webhook-timestamp", chrono::Utc::now().timestamp().to_string()),
        ("webhook-signature", "v1,AAAA".to_owned()),
    ];

    let response = app
        .oneshot(webhook_request(body, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = read_json(response).await;
    assert_eq!(json["error"], "no webhook signature matched");
}

#[tokio::test]
async fn test_signature_over_different_body_is_rejected() {
    let app = test_app().await;
    let headers = signed_webhook_headers(r#"{"type":"order.paid","data":{}}"#);

    let response = app
        .oneshot(webhook_request(r#"{"type":"order.refunded","data":{}}"#, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stale_delivery_is_rejected() {
    let app = test_app().await;
    let body = r#"{"type":"order.paid","data":{}}"#;
    // Correctly signed, but an hour old. Replays outside the tolerance
    // window must not verify.
    let timestamp = chrono::Utc::now().timestamp() - 3600;
    let headers = vec![
        ("webhook-id", "msg_test_1".to_owned()),
        ("webhook-timestamp", timestamp.to_string()),
        ("webhook-signature", sign_webhook("msg_test_1", timestamp, body)),
    ];

    let response = app
        .oneshot(webhook_request(body, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = read_json(response).await;
    assert_eq!(json["error"], "webhook timestamp outside tolerance");
}

// =============================================================================
// Event dispatch
// =============================================================================

#[tokio::test]
async fn test_unhandled_event_is_acknowledged() {
    let app = test_app().await;
    let body = r#"{"type":"product.updated","data":{}}"#;
    let headers = signed_webhook_headers(body);

    let response = app
        .oneshot(webhook_request(body, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["received"], true);
}

#[tokio::test]
async fn test_unparseable_body_is_rejected() {
    let app = test_app().await;
    let body = "not even json";
    let headers = signed_webhook_headers(body);

    let response = app
        .oneshot(webhook_request(body, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Invalid webhook payload");
}

#[tokio::test]
async fn test_malformed_order_paid_is_rejected() {
    let app = test_app().await;
    // Verifies, parses as an event envelope, but the data is not a valid
    // order.paid payload (no customer).
    let body = serde_json::to_string(&json!({
        "type": "order.paid",
        "data": {"id": "ord_1"}
    }))
    .expect("serializes");
    let headers = signed_webhook_headers(&body);

    let response = app
        .oneshot(webhook_request(&body, &headers))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Invalid webhook payload");
}
