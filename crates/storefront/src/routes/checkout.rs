//! Checkout API routes.
//!
//! Opening a checkout never touches the cart; the cart is cleared only
//! after the provider confirms payment. The email used for a checkout is
//! resolved in priority order: explicit in the request, the signed-in
//! customer, then the email remembered from a previous checkout.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use paperfold_core::{CheckoutId, Email, OrderId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::checkout::{CheckoutItem, CheckoutService, CheckoutSummary};
use crate::services::preferences::PreferencesService;
use crate::state::AppState;

/// Request to open a checkout for a list of items.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    /// Email to prefill at the provider; falls back to the session.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Free-form metadata forwarded to the provider.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request to buy a single item directly, skipping the cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressCheckoutRequest {
    #[serde(flatten)]
    pub item: CheckoutItem,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Progress of a checkout session, joined with our local order record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStatusResponse {
    /// The provider's session status (e.g. `open`, `succeeded`).
    pub status: String,
    /// Our order ID, present once the paid webhook has landed.
    pub order_id: Option<OrderId>,
}

/// Open a hosted checkout for the given items.
///
/// POST /api/checkout
///
/// # Errors
///
/// Returns 400 for an empty item list or a provider rejection, and 502 when
/// the provider is unreachable.
#[instrument(skip(state, session, customer, request), fields(items = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSummary>> {
    initiate(
        &state,
        &session,
        customer.map(|current| current.email),
        &request.items,
        request.customer_email.as_deref(),
        request.metadata,
        false,
    )
    .await
}

/// Buy a single item now, bypassing the cart.
///
/// POST /api/checkout/express
///
/// Same contract as a cart checkout; the session is tagged so analytics and
/// fulfillment can tell the flows apart.
///
/// # Errors
///
/// Returns 400 for a provider rejection and 502 when the provider is
/// unreachable.
#[instrument(skip(state, session, customer, request))]
pub async fn express(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(request): Json<ExpressCheckoutRequest>,
) -> Result<Json<CheckoutSummary>> {
    initiate(
        &state,
        &session,
        customer.map(|current| current.email),
        std::slice::from_ref(&request.item),
        request.customer_email.as_deref(),
        request.metadata,
        true,
    )
    .await
}

/// Look up the progress of a checkout session.
///
/// GET /api/checkout/{id}/status
///
/// Success pages poll this until the paid webhook lands and `orderId`
/// appears.
///
/// # Errors
///
/// Returns 404 for an unknown checkout ID and 502 when the provider is
/// unreachable.
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    Path(checkout_id): Path<CheckoutId>,
) -> Result<Json<CheckoutStatusResponse>> {
    let checkout = state.polar().get_checkout(&checkout_id).await?;
    let order = OrderRepository::new(state.pool())
        .get_by_checkout_id(&checkout_id)
        .await?;

    Ok(Json(CheckoutStatusResponse {
        status: checkout.status,
        order_id: order.map(|order| order.id),
    }))
}

async fn initiate(
    state: &AppState,
    session: &Session,
    signed_in: Option<Email>,
    items: &[CheckoutItem],
    explicit_email: Option<&str>,
    metadata: HashMap<String, String>,
    express: bool,
) -> Result<Json<CheckoutSummary>> {
    let explicit = explicit_email
        .map(Email::parse)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;

    let prefs = PreferencesService::new(session);
    let email = match explicit.or(signed_in) {
        Some(email) => Some(email),
        None => prefs.saved_email().await,
    };

    let checkout = CheckoutService::new(state.polar(), &state.config().base_url);
    let result = checkout.initiate(items, email.as_ref(), metadata, express).await;

    // Preferences record the attempt whether or not the provider accepted it
    if let Err(error) = prefs.record_checkout(email.as_ref()).await {
        tracing::warn!(error = %error, "Failed to record checkout preferences");
    }

    let summary = result?;
    add_breadcrumb("checkout", "Checkout session created", None);
    Ok(Json(summary))
}
