//! Request and payload types for the Polar API.
//!
//! Only the fields the storefront actually reads are modeled; everything
//! else in Polar's payloads is ignored by serde.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for `POST /v1/checkouts`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckoutRequest {
    /// Polar product IDs to include, in display order.
    pub products: Vec<String>,
    /// Prefill email, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Free-form metadata echoed back on the order webhook.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Where Polar sends the customer after payment. May contain Polar's
    /// `{CHECKOUT_ID}` placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
}

/// A checkout session as returned by Polar.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Hosted checkout URL to redirect the customer to.
    pub url: String,
    /// Session status (`open`, `confirmed`, `succeeded`, `expired`, `failed`).
    #[serde(default)]
    pub status: String,
    /// Email attached to the session, if any.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// When the session stops being payable.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Webhook envelope. The payload shape depends on the event type.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event name, e.g. `order.paid`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload, parsed per event type.
    pub data: serde_json::Value,
}

/// Payload of an `order.paid` event.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPaid {
    /// Polar's order ID.
    pub id: String,
    /// Checkout session the payment came from.
    pub checkout_id: String,
    /// Paying customer.
    pub customer: OrderCustomer,
    /// Order total in cents.
    #[serde(default)]
    pub total_amount: i64,
    /// Purchased items.
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
}

/// Customer data embedded in an order payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCustomer {
    /// Customer email as Polar knows it.
    pub email: String,
}

/// One purchased line on a paid order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemPayload {
    /// Display label, if Polar set one.
    #[serde(default)]
    pub label: Option<String>,
    /// Line amount in cents.
    #[serde(default)]
    pub amount: i64,
    /// The purchased product.
    pub product: ProductPayload,
}

impl OrderItemPayload {
    /// Display title for the item: the line label when present, otherwise
    /// the product name.
    #[must_use]
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.product.name)
    }
}

/// Product data embedded in an order item.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    /// Product name.
    pub name: String,
    /// Merchant-defined metadata. Values arrive as strings, numbers, or
    /// booleans depending on how they were entered in the dashboard.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProductPayload {
    /// Object-storage key of the deliverable, if configured on the product.
    #[must_use]
    pub fn file_key(&self) -> Option<&str> {
        self.metadata.get("file_key").and_then(|v| v.as_str())
    }

    /// Per-product download quota override.
    ///
    /// Accepts either a JSON number or a numeric string, since dashboard
    /// metadata entry does not enforce a type.
    #[must_use]
    pub fn max_downloads(&self) -> Option<i32> {
        let value = self.metadata.get("max_downloads")?;
        if let Some(n) = value.as_i64() {
            return i32::try_from(n).ok();
        }
        value.as_str()?.parse().ok()
    }
}
