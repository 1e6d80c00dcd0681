//! Order history API routes.
//!
//! The signed-in customer's library: their orders and how many downloads
//! each file has left. Storage keys never appear in responses; files are
//! reachable only through the download endpoint.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use paperfold_core::{OrderId, OrderStatus, Price};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::order::OrderWithItems;
use crate::state::AppState;

/// One downloadable file in an order, as shown to the customer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    /// Position within the order; doubles as the download endpoint's item
    /// parameter.
    pub position: i32,
    pub title: String,
    pub downloads_remaining: i32,
    pub max_downloads: i32,
}

/// One order in the customer's library.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    /// Order total in cents.
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemView>,
}

impl From<OrderWithItems> for OrderView {
    fn from(order: OrderWithItems) -> Self {
        Self {
            id: order.order.id,
            status: order.order.status,
            total: order.order.total,
            created_at: order.order.created_at,
            expires_at: order.order.expires_at,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemView {
                    position: item.position,
                    downloads_remaining: item.remaining_downloads(),
                    max_downloads: item.max_downloads,
                    title: item.title,
                })
                .collect(),
        }
    }
}

/// List the signed-in customer's orders, newest first.
///
/// GET /api/orders
///
/// # Errors
///
/// Returns 401 when not signed in and 500 on a database failure.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_email(&customer.email)
        .await?;

    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}
