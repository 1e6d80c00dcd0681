//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # Cart (session-backed)
//! GET    /api/cart             - Current cart
//! POST   /api/cart/items       - Add an item (idempotent per product)
//! DELETE /api/cart/items/{id}  - Remove a line
//! DELETE /api/cart             - Clear the cart
//!
//! # Checkout
//! POST /api/checkout           - Create a hosted checkout session
//! POST /api/checkout/express   - Single-item express checkout
//! GET  /api/checkout/{id}/status - Poll a checkout session
//!
//! # Auth (emailed one-time codes)
//! POST /api/auth/request-code  - Email a sign-in code
//! POST /api/auth/verify        - Verify a code and start a session
//! POST /api/auth/logout        - End the session
//!
//! # Customer
//! GET    /api/orders           - Order history (requires auth)
//! GET    /api/preferences      - Saved checkout preferences
//! DELETE /api/preferences      - Forget saved preferences
//!
//! # Downloads
//! GET  /api/download/{order_id}/{item} - Redirect to a signed file URL
//!
//! # Webhooks
//! POST /api/webhooks/polar     - Payment provider events
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod download;
pub mod orders;
pub mod preferences;
pub mod webhooks;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::{api_rate_limiter, strict_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::create))
        .route("/express", post(checkout::express))
        .route("/{id}/status", get(checkout::status))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-code", post(auth::request_code))
        .route("/verify", post(auth::verify_code))
        .route("/logout", post(auth::logout))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::list))
}

/// Create the preferences routes router.
pub fn preferences_routes() -> Router<AppState> {
    Router::new().route("/", get(preferences::show).delete(preferences::clear))
}

/// Create the download routes router.
pub fn download_routes() -> Router<AppState> {
    Router::new().route("/{order_id}/{item}", get(download::download))
}

/// Create the webhook routes router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/polar", post(webhooks::receive))
}

/// Create all routes for the storefront API.
///
/// Sign-in and download endpoints sit behind the strict per-IP limiter;
/// the rest of the API gets the general one. Webhooks are exempt: the
/// provider retries from a small set of IPs and the signature check is
/// the gate there.
pub fn routes() -> Router<AppState> {
    let general = Router::new()
        .nest("/api/cart", cart_routes())
        .nest("/api/checkout", checkout_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/preferences", preferences_routes())
        .layer(api_rate_limiter());

    let sensitive = Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/download", download_routes())
        .layer(strict_rate_limiter());

    Router::new()
        .merge(general)
        .merge(sensitive)
        .nest("/api/webhooks", webhook_routes())
}
