//! Order domain types.
//!
//! Orders are created by the payment webhook once the checkout provider
//! confirms payment, and read by the download authorizer and the customer
//! library. Items are addressed by their position within the order; positions
//! are assigned contiguously at creation and never reordered.

use chrono::{DateTime, Utc};

use paperfold_core::{CheckoutId, Email, OrderId, OrderStatus, Price, ProviderOrderId};

/// A recorded purchase.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Checkout session that produced this order. Unique per order, which is
    /// what makes webhook delivery idempotent.
    pub checkout_id: CheckoutId,
    /// Provider's own order ID, if the webhook carried one.
    pub provider_order_id: Option<ProviderOrderId>,
    /// Email the order belongs to. Ownership checks compare against this.
    pub customer_email: Email,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Order total.
    #[sqlx(rename = "total_cents")]
    pub total: Price,
    /// Download access cutoff, if the order has one.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the order was recorded.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order's download window has closed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at < Utc::now())
    }
}

/// A deliverable file on an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    /// Order this item belongs to.
    pub order_id: OrderId,
    /// Zero-based position within the order. Stable for the life of the
    /// order and used as the item's public address.
    pub position: i32,
    /// Display title, also used as the download filename.
    pub title: String,
    /// Object-storage key of the deliverable.
    pub file_key: String,
    /// Downloads consumed so far.
    pub downloads_used: i32,
    /// Downloads allowed in total.
    pub max_downloads: i32,
}

impl OrderItem {
    /// Downloads left on this item, clamped at zero.
    #[must_use]
    pub fn remaining_downloads(&self) -> i32 {
        (self.max_downloads - self.downloads_used).max(0)
    }

    /// Whether the download quota is used up.
    #[must_use]
    pub const fn quota_exhausted(&self) -> bool {
        self.downloads_used >= self.max_downloads
    }
}

/// An order together with its items, ordered by position.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    /// The order itself.
    pub order: Order,
    /// Items in position order.
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Look up an item by its positional index.
    #[must_use]
    pub fn item_at(&self, index: usize) -> Option<&OrderItem> {
        self.items.get(index)
    }
}

/// Parameters for recording a new order.
pub struct NewOrder {
    /// Checkout session the payment came from.
    pub checkout_id: CheckoutId,
    /// Provider's order ID, if known.
    pub provider_order_id: Option<ProviderOrderId>,
    /// Purchasing customer's email.
    pub customer_email: Email,
    /// Initial lifecycle state.
    pub status: OrderStatus,
    /// Order total.
    pub total: Price,
    /// Download access cutoff, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Deliverables, in the order they appeared in the checkout.
    pub items: Vec<NewOrderItem>,
}

/// Parameters for one deliverable on a new order.
pub struct NewOrderItem {
    /// Display title.
    pub title: String,
    /// Object-storage key of the deliverable.
    pub file_key: String,
    /// Download quota for this item.
    pub max_downloads: i32,
}
