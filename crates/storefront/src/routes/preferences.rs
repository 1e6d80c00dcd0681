//! Customer preferences API routes.

use axum::{Json, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use paperfold_core::Email;

use crate::error::Result;
use crate::services::preferences::PreferencesService;

/// Stored preferences, as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub email: Option<Email>,
    pub last_checkout_at: Option<DateTime<Utc>>,
}

/// Get the remembered checkout preferences.
///
/// GET /api/preferences
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<PreferencesView> {
    let prefs = PreferencesService::new(&session).load().await;
    Json(PreferencesView {
        email: prefs.email,
        last_checkout_at: prefs.last_checkout_at,
    })
}

/// Forget the remembered checkout preferences.
///
/// DELETE /api/preferences
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<StatusCode> {
    PreferencesService::new(&session).clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
