//! Customer authentication API routes.
//!
//! Passwordless sign-in: the customer asks for a code, we email it, they
//! post it back. A verified code stores [`CurrentCustomer`] in the session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use paperfold_core::Email;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_customer, set_current_customer};
use crate::models::session::CurrentCustomer;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Request for a sign-in code.
#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

/// Request to verify a sign-in code.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Response to a verified sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub email: Email,
}

/// Email a sign-in code to the given address.
///
/// POST /api/auth/request-code
///
/// Responds 202 whether or not the email could be delivered; delivery
/// failures are only logged.
///
/// # Errors
///
/// Returns 400 for a malformed email and 500 when the code cannot be
/// stored.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn request_code(
    State(state): State<AppState>,
    Json(request): Json<RequestCodeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let email = Email::parse(&request.email)
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;

    let auth = AuthService::new(state.pool());
    let code = auth.request_code(&email).await?;

    if let Err(error) = state.email().send_signin_code(&email, &code).await {
        tracing::error!(error = %error, "Failed to send sign-in code");
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "sent": true }))))
}

/// Verify a sign-in code and start a session.
///
/// POST /api/auth/verify
///
/// # Errors
///
/// Returns 401 for a wrong or expired code and 429 once the code has been
/// guessed at too many times.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn verify_code(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyResponse>> {
    let email = Email::parse(&request.email)
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;

    let auth = AuthService::new(state.pool());
    let user = auth.verify_code(&email, &request.code).await?;

    let customer = CurrentCustomer {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_customer(&session, &customer).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(VerifyResponse { email: user.email }))
}

/// Sign out.
///
/// POST /api/auth/logout
///
/// # Errors
///
/// Returns 500 if the session cannot be destroyed.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_customer(&session).await?;
    clear_sentry_user();
    session.flush().await?;

    Ok(StatusCode::NO_CONTENT)
}
