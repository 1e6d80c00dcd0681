//! Cart API routes.
//!
//! The cart is session-backed; every handler reads and writes through
//! [`CartService`]. Responses carry the full cart plus derived totals so
//! clients never compute money themselves.

use axum::{Json, extract::Path, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use paperfold_core::{CartLineId, CheckoutProductId, ItemRef, Price};

use crate::error::{Result, add_breadcrumb};
use crate::models::cart::{Cart, CartLine};
use crate::services::cart::CartService;

/// Request to add one item to the cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// Catalog identity (`type` + `productId`/`bundleId`).
    #[serde(flatten)]
    pub item: ItemRef,
    /// The payment provider's product ID for later checkout.
    #[serde(rename = "polarProductId")]
    pub checkout_product_id: CheckoutProductId,
    /// Display title.
    pub title: String,
    /// Display image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Selling price in cents.
    pub price: Price,
    /// Pre-discount price in cents, if on sale.
    #[serde(default)]
    pub compare_at_price: Option<Price>,
}

/// Cart with derived totals, as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Sum of line prices, in cents.
    pub subtotal: Price,
    /// Sum of per-line savings, in cents.
    pub savings: Price,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let subtotal = cart.subtotal();
        let savings = cart.savings();
        Self {
            items: cart.items,
            subtotal,
            savings,
        }
    }
}

/// Response to an add-to-cart request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemResponse {
    #[serde(flatten)]
    pub cart: CartView,
    /// Whether the line was actually added (false for a duplicate).
    pub added: bool,
    /// Hint for the client to open its cart UI.
    pub opened: bool,
}

/// Get the current cart.
///
/// GET /api/cart
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let cart = CartService::new(&session).load().await;
    Json(cart.into())
}

/// Add an item to the cart.
///
/// POST /api/cart/items
///
/// Adding an item that is already present is a no-op; the response says so
/// via `added: false`.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
#[instrument(skip(session, request))]
pub async fn add(
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>> {
    let line = CartLine::new(
        request.item,
        request.checkout_product_id,
        request.title,
        request.image,
        request.price,
        request.compare_at_price,
    );

    let (cart, added) = CartService::new(&session).add(line).await?;

    if added {
        add_breadcrumb("cart", "Added item to cart", None);
    }

    Ok(Json(AddItemResponse {
        cart: cart.into(),
        added,
        opened: added,
    }))
}

/// Remove a line from the cart.
///
/// DELETE /api/cart/items/{line_id}
///
/// Unknown line IDs are a no-op, not an error.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
#[instrument(skip(session))]
pub async fn remove(session: Session, Path(line_id): Path<CartLineId>) -> Result<Json<CartView>> {
    let cart = CartService::new(&session).remove(line_id).await?;
    Ok(Json(cart.into()))
}

/// Clear the cart.
///
/// DELETE /api/cart
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<StatusCode> {
    CartService::new(&session).clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
