//! Payment provider webhook receiver.
//!
//! Polar delivers events signed per the Standard Webhooks spec. The only
//! event the storefront acts on is `order.paid`, which records the order
//! and unlocks downloads; everything else is acknowledged and ignored so
//! the provider stops retrying.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use paperfold_core::{CheckoutId, Email, OrderStatus, Price, ProviderOrderId};
use serde_json::json;
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::order::{NewOrder, NewOrderItem};
use crate::polar::types::{OrderPaid, WebhookEvent};
use crate::polar::webhook::{WebhookHeaders, verify_signature};
use crate::state::AppState;

/// Download quota applied when the product metadata does not set one.
const DEFAULT_MAX_DOWNLOADS: i32 = 5;

// ===== Handlers =====

/// POST /api/webhooks/polar - Receive a signed provider event.
///
/// Verification runs against the raw body before any parsing. Replayed
/// `order.paid` deliveries are absorbed by the order table's checkout-ID
/// uniqueness, so the provider can retry freely.
#[instrument(skip(state, headers, body))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature_headers = WebhookHeaders::from_map(&headers)?;
    verify_signature(&state.config().polar.webhook_secret, &signature_headers, &body)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid webhook payload".to_owned()))?;

    match event.event_type.as_str() {
        "order.paid" => {
            let payload: OrderPaid = serde_json::from_value(event.data).map_err(|error| {
                tracing::error!(error = %error, "Malformed order.paid payload");
                AppError::BadRequest("Invalid webhook payload".to_owned())
            })?;
            record_paid_order(&state, payload).await?;
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring webhook event");
        }
    }

    Ok(Json(json!({"received": true})))
}

// ===== Order recording =====

async fn record_paid_order(state: &AppState, payload: OrderPaid) -> Result<()> {
    let new_order = order_from_payload(payload)?;

    let Some(order) = OrderRepository::new(state.pool()).insert(&new_order).await? else {
        tracing::debug!(
            checkout_id = %new_order.checkout_id,
            "Order already recorded, skipping duplicate delivery"
        );
        return Ok(());
    };

    tracing::info!(
        order_id = %order.id,
        checkout_id = %order.checkout_id,
        items = new_order.items.len(),
        total_cents = order.total.cents(),
        "Recorded paid order"
    );

    let titles: Vec<String> = new_order.items.iter().map(|item| item.title.clone()).collect();
    if let Err(error) = state.email().send_order_ready(&order.customer_email, &titles).await {
        // The order is already durable; delivery gets announced on the
        // library page even when the email does not go out.
        tracing::warn!(error = %error, order_id = %order.id, "Failed to send order-ready email");
    }

    Ok(())
}

/// Translate a provider payload into order parameters.
///
/// Items whose product carries no `file_key` metadata have nothing to
/// deliver and are dropped with an error log rather than failing the whole
/// order.
fn order_from_payload(payload: OrderPaid) -> Result<NewOrder> {
    let customer_email = Email::parse(&payload.customer.email)
        .map_err(|_| AppError::BadRequest("Invalid customer email".to_owned()))?;

    let mut items = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let Some(file_key) = item.product.file_key() else {
            tracing::error!(
                checkout_id = %payload.checkout_id,
                product = %item.product.name,
                "Purchased product has no file_key metadata, nothing to deliver"
            );
            continue;
        };
        items.push(NewOrderItem {
            title: item.title().to_owned(),
            file_key: file_key.to_owned(),
            max_downloads: item.product.max_downloads().unwrap_or(DEFAULT_MAX_DOWNLOADS),
        });
    }

    Ok(NewOrder {
        checkout_id: CheckoutId::new(payload.checkout_id),
        provider_order_id: Some(ProviderOrderId::new(payload.id)),
        customer_email,
        status: OrderStatus::Completed,
        total: Price::from_cents(payload.total_amount),
        expires_at: None,
        items,
    })
}
