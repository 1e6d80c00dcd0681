//! Polar hosted-checkout API client.
//!
//! # Architecture
//!
//! - Thin JSON client over `reqwest` for the two calls the storefront makes:
//!   creating a checkout session and polling its status
//! - Polar is the source of truth for payment state; the local orders table
//!   is only written once the `order.paid` webhook lands
//! - Webhook signatures are verified per the Standard Webhooks scheme
//!   (see [`webhook`])

pub mod types;
pub mod webhook;

use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use paperfold_core::CheckoutId;

use crate::config::PolarConfig;

pub use types::{CheckoutSession, CreateCheckoutRequest};

/// Errors that can occur when talking to the Polar API.
#[derive(Debug, Error)]
pub enum PolarError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Polar answered with a non-success status.
    #[error("checkout rejected ({status}): {message}")]
    Rejected {
        /// HTTP status Polar answered with.
        status: u16,
        /// Provider's error message, or a generic one if none was present.
        message: String,
    },

    /// Checkout session does not exist.
    #[error("checkout session not found")]
    NotFound,
}

/// Client for the Polar API.
#[derive(Clone)]
pub struct PolarClient {
    inner: Arc<PolarClientInner>,
}

struct PolarClientInner {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl PolarClient {
    /// Create a new Polar API client.
    #[must_use]
    pub fn new(config: &PolarConfig) -> Self {
        Self {
            inner: Arc::new(PolarClientInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.trim_end_matches('/').to_owned(),
                access_token: config.access_token.expose_secret().to_owned(),
            }),
        }
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns `PolarError::Rejected` with the provider's message when Polar
    /// answers with a non-success status, `PolarError::Http` on transport
    /// failure, and `PolarError::Parse` if the success body is malformed.
    #[instrument(skip(self, request), fields(products = request.products.len()))]
    pub async fn create_checkout(
        &self,
        request: &CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PolarError> {
        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkouts", self.inner.api_url))
            .bearer_auth(&self.inner.access_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Polar checkout creation failed"
            );
            return Err(PolarError::Rejected {
                status: status.as_u16(),
                message: extract_error_message(&body)
                    .unwrap_or_else(|| "Checkout could not be created".to_owned()),
            });
        }

        parse_session(&body)
    }

    /// Fetch an existing checkout session.
    ///
    /// # Errors
    ///
    /// Returns `PolarError::NotFound` for unknown sessions, otherwise the
    /// same errors as [`Self::create_checkout`].
    #[instrument(skip(self, id), fields(checkout_id = %id))]
    pub async fn get_checkout(&self, id: &CheckoutId) -> Result<CheckoutSession, PolarError> {
        let response = self
            .inner
            .client
            .get(format!("{}/v1/checkouts/{id}", self.inner.api_url))
            .bearer_auth(&self.inner.access_token)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PolarError::NotFound);
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                checkout_id = %id,
                body = %body.chars().take(500).collect::<String>(),
                "Polar checkout lookup failed"
            );
            return Err(PolarError::Rejected {
                status: status.as_u16(),
                message: extract_error_message(&body)
                    .unwrap_or_else(|| "Checkout could not be loaded".to_owned()),
            });
        }

        parse_session(&body)
    }
}

fn parse_session(body: &str) -> Result<CheckoutSession, PolarError> {
    match serde_json::from_str(body) {
        Ok(session) => Ok(session),
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Polar checkout response"
            );
            Err(PolarError::Parse(e))
        }
    }
}

/// Pull a human-readable message out of a Polar error body.
///
/// Polar returns either `{"error": "..."}`, `{"detail": "..."}`, or a
/// validation shape where `detail` is an array of `{"msg": "..."}` entries.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = value.get("detail") {
        if let Some(message) = detail.as_str() {
            return Some(message.to_owned());
        }
        if let Some(first) = detail.as_array().and_then(|entries| entries.first()) {
            if let Some(message) = first.get("msg").and_then(|m| m.as_str()) {
                return Some(message.to_owned());
            }
        }
    }

    value
        .get("error")
        .and_then(|e| e.as_str())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_string_detail() {
        let body = r#"{"detail": "Product is archived"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Product is archived")
        );
    }

    #[test]
    fn test_extract_error_message_validation_detail() {
        let body = r#"{"detail": [{"loc": ["body", "products"], "msg": "Field required"}]}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Field required")
        );
    }

    #[test]
    fn test_extract_error_message_error_field() {
        let body = r#"{"error": "invalid_token"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("invalid_token"));
    }

    #[test]
    fn test_extract_error_message_unrecognized_body() {
        assert!(extract_error_message("not json").is_none());
        assert!(extract_error_message(r#"{"unexpected": true}"#).is_none());
    }
}
