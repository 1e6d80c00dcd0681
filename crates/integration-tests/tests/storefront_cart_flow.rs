//! Cart flow over the real router.
//!
//! Each test threads the session cookie between requests the way a browser
//! would. The cart never touches the database, so the full add/remove/clear
//! lifecycle runs in process.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use paperfold_integration_tests::{read_json, request, session_cookie, test_app};

fn planner() -> serde_json::Value {
    json!({
        "type": "product",
        "productId": "planner-weekly",
        "polarProductId": "polar_prod_planner",
        "title": "Weekly Planner",
        "price": 1999,
        "compareAtPrice": 2499,
    })
}

fn budget_bundle() -> serde_json::Value {
    json!({
        "type": "bundle",
        "bundleId": "budget-starter",
        "polarProductId": "polar_prod_budget",
        "title": "Budget Starter Bundle",
        "price": 799,
    })
}

// =============================================================================
// Reading the cart
// =============================================================================

#[tokio::test]
async fn test_cart_starts_empty() {
    let app = test_app().await;

    let response = app
        .oneshot(request(Method::GET, "/api/cart", None, None))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["subtotal"], 0);
    assert_eq!(body["savings"], 0);
}

// =============================================================================
// Adding items
// =============================================================================

#[tokio::test]
async fn test_add_items_and_totals() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&planner()),
            None,
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("first write sets the session cookie");
    assert!(cookie.starts_with("pf_session="));

    let body = read_json(response).await;
    assert_eq!(body["added"], true);
    assert_eq!(body["opened"], true);
    assert_eq!(body["subtotal"], 1999);
    assert_eq!(body["savings"], 500);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&budget_bundle()),
            Some(&cookie),
        ))
        .await
        .expect("request");
    let body = read_json(response).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["subtotal"], 2798);
    // The bundle has no compare-at price, so it adds no savings
    assert_eq!(body["savings"], 500);

    // A plain GET with the same cookie sees the same cart
    let response = app
        .oneshot(request(Method::GET, "/api/cart", None, Some(&cookie)))
        .await
        .expect("request");
    let body = read_json(response).await;
    assert_eq!(body["subtotal"], 2798);
    assert_eq!(body["items"][0]["type"], "product");
    assert_eq!(body["items"][0]["productId"], "planner-weekly");
    assert_eq!(body["items"][0]["polarProductId"], "polar_prod_planner");
    assert_eq!(body["items"][1]["type"], "bundle");
    assert_eq!(body["items"][1]["bundleId"], "budget-starter");
}

#[tokio::test]
async fn test_re_adding_same_product_is_a_no_op() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&planner()),
            None,
        ))
        .await
        .expect("request");
    let cookie = session_cookie(&response).expect("cookie");

    // Same catalog identity, different display data
    let mut duplicate = planner();
    duplicate["price"] = json!(1);
    duplicate["title"] = json!("Renamed Planner");

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&duplicate),
            Some(&cookie),
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["added"], false);
    assert_eq!(body["opened"], false);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    // The original line is untouched
    assert_eq!(body["items"][0]["title"], "Weekly Planner");
    assert_eq!(body["subtotal"], 1999);
}

#[tokio::test]
async fn test_add_without_json_body_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(request(Method::POST, "/api/cart/items", None, None))
        .await
        .expect("request");

    // No content-type at all: axum's Json extractor rejects it
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

// =============================================================================
// Removing and clearing
// =============================================================================

#[tokio::test]
async fn test_remove_line_updates_totals() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&planner()),
            None,
        ))
        .await
        .expect("request");
    let cookie = session_cookie(&response).expect("cookie");

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&budget_bundle()),
            Some(&cookie),
        ))
        .await
        .expect("request");
    let body = read_json(response).await;
    let line_id = body["items"][0]["id"].as_str().expect("line id").to_owned();

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/api/cart/items/{line_id}"),
            None,
            Some(&cookie),
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["subtotal"], 799);
    assert_eq!(body["savings"], 0);
}

#[tokio::test]
async fn test_remove_unknown_line_is_a_no_op() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&planner()),
            None,
        ))
        .await
        .expect("request");
    let cookie = session_cookie(&response).expect("cookie");

    let unknown = uuid::Uuid::new_v4();
    let response = app
        .oneshot(request(
            Method::DELETE,
            &format!("/api/cart/items/{unknown}"),
            None,
            Some(&cookie),
        ))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_clear_empties_the_cart() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/cart/items",
            Some(&planner()),
            None,
        ))
        .await
        .expect("request");
    let cookie = session_cookie(&response).expect("cookie");

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/api/cart", None, Some(&cookie)))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::GET, "/api/cart", None, Some(&cookie)))
        .await
        .expect("request");
    let body = read_json(response).await;
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["subtotal"], 0);
}
