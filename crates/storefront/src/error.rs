//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses are JSON of the form `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::polar::{PolarError, webhook::WebhookError};
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::download::DownloadError;
use crate::services::email::EmailError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment provider API operation failed.
    #[error("Polar error: {0}")]
    Polar(#[from] PolarError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout could not be opened.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Download request refused or failed.
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Webhook verification failed.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Customer is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Email(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Polar(err) => polar_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCode | AuthError::CodeExpired => StatusCode::UNAUTHORIZED,
                AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::NoItems => StatusCode::BAD_REQUEST,
                CheckoutError::Provider(err) => polar_status(err),
            },
            Self::Download(err) => match err {
                DownloadError::MissingIdentity => StatusCode::UNAUTHORIZED,
                DownloadError::OrderNotFound | DownloadError::ItemNotFound => {
                    StatusCode::NOT_FOUND
                }
                DownloadError::NotYourOrder => StatusCode::FORBIDDEN,
                DownloadError::OrderNotCompleted
                | DownloadError::LinkExpired
                | DownloadError::QuotaExhausted => StatusCode::BAD_REQUEST,
                DownloadError::Signing(_) | DownloadError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Webhook(err) => match err {
                WebhookError::MissingHeader(_) | WebhookError::InvalidTimestamp => {
                    StatusCode::BAD_REQUEST
                }
                WebhookError::StaleTimestamp | WebhookError::SignatureMismatch => {
                    StatusCode::UNAUTHORIZED
                }
                WebhookError::InvalidSecret => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Client-facing message. Internal detail never leaves the server.
    fn client_message(&self) -> String {
        match self {
            Self::Polar(err) => polar_message(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCode | AuthError::CodeExpired => {
                    "Invalid or expired code".to_string()
                }
                AuthError::TooManyAttempts => "Too many attempts, request a new code".to_string(),
                AuthError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::NoItems => "No items to check out".to_string(),
                CheckoutError::Provider(err) => polar_message(err),
            },
            Self::Download(err) => match err {
                DownloadError::Repository(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Webhook(err) => match err {
                WebhookError::InvalidSecret => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Database(_) | Self::Email(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, slow down".to_string(),
        }
    }
}

const fn polar_status(err: &PolarError) -> StatusCode {
    match err {
        // The provider rejected the request; their message goes to the client.
        PolarError::Rejected { .. } => StatusCode::BAD_REQUEST,
        PolarError::NotFound => StatusCode::NOT_FOUND,
        PolarError::Http(_) | PolarError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}

fn polar_message(err: &PolarError) -> String {
    match err {
        PolarError::Rejected { message, .. } => message.clone(),
        PolarError::NotFound => "Checkout not found".to_string(),
        PolarError::Http(_) | PolarError::Parse(_) => "Payment provider unavailable".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({ "error": self.client_message() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
