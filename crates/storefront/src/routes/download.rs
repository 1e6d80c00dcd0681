//! Download API route.
//!
//! One endpoint, heavily guarded: every request runs the full authorization
//! sequence in [`DownloadService`] and, when it passes, answers with a 302
//! to a short-lived signed URL.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use paperfold_core::{Email, OrderId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::download::DownloadService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Guest identity; ignored when a customer is signed in.
    pub email: Option<String>,
}

/// Download one purchased file.
///
/// GET /api/download/{order_id}/{item}?email=
///
/// `item` is the position of the file within the order. Identity comes from
/// the session when signed in, otherwise from the `email` query parameter.
/// On success the response is a 302 redirect to a signed URL valid for one
/// hour.
///
/// # Errors
///
/// Returns the authorization failure mapped to its status: 401 without an
/// identity, 404 for unknown orders or items, 403 for someone else's order,
/// and 400 for unpaid, expired, or quota-exhausted orders.
#[instrument(skip(state, customer, query))]
pub async fn download(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    Path((order_id, item_index)): Path<(OrderId, usize)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let identity = match customer {
        Some(current) => Some(current.email),
        None => query
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?,
    };

    let service = DownloadService::new(state.pool(), state.signer(), state.usage());
    let url = service
        .authorize(order_id, item_index, identity.as_ref())
        .await?;

    add_breadcrumb("download", "Download granted", None);

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
