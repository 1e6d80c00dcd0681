//! Standard Webhooks signature verification for Polar deliveries.
//!
//! Polar signs every delivery per the Standard Webhooks scheme: an HMAC
//! SHA-256 over `{id}.{timestamp}.{body}` keyed with the endpoint secret,
//! carried base64-encoded in the `webhook-signature` header. Unverified
//! payloads are never parsed.

use axum::http::HeaderMap;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed skew between the delivery timestamp and now, in seconds.
/// Limits the replay window for a captured delivery.
const TOLERANCE_SECONDS: i64 = 300;

/// Header carrying the unique delivery ID.
pub const ID_HEADER: &str = "webhook-id";
/// Header carrying the delivery timestamp (unix seconds).
pub const TIMESTAMP_HEADER: &str = "webhook-timestamp";
/// Header carrying the space-separated signature list.
pub const SIGNATURE_HEADER: &str = "webhook-signature";

/// Errors that can occur while verifying a delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required header is absent or not ASCII.
    #[error("missing webhook header: {0}")]
    MissingHeader(&'static str),

    /// The timestamp header is not an integer.
    #[error("invalid webhook timestamp")]
    InvalidTimestamp,

    /// The timestamp is too far from the current time.
    #[error("webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// The configured endpoint secret does not decode.
    #[error("webhook secret is not valid base64")]
    InvalidSecret,

    /// No candidate signature matched the payload.
    #[error("no webhook signature matched")]
    SignatureMismatch,
}

/// The three Standard Webhooks headers of one delivery.
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    /// Unique delivery ID.
    pub id: &'a str,
    /// Delivery timestamp, unix seconds as a decimal string.
    pub timestamp: &'a str,
    /// Space-separated list of `v1,<base64>` signature candidates.
    pub signature: &'a str,
}

impl<'a> WebhookHeaders<'a> {
    /// Pull the three required headers out of a request's header map.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MissingHeader` naming the first absent header.
    pub fn from_map(headers: &'a HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &'static str| -> Result<&'a str, WebhookError> {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .ok_or(WebhookError::MissingHeader(name))
        };

        Ok(Self {
            id: get(ID_HEADER)?,
            timestamp: get(TIMESTAMP_HEADER)?,
            signature: get(SIGNATURE_HEADER)?,
        })
    }
}

/// Verify a delivery's timestamp and signature.
///
/// The secret is the base64 key Polar issued, with or without its `whsec_`
/// prefix. The signature header may carry several candidates from key
/// rotation; verification succeeds if any `v1` candidate matches. The
/// comparison itself is constant-time via [`Mac::verify_slice`].
///
/// # Errors
///
/// Returns the specific [`WebhookError`] describing what failed; callers
/// map these onto HTTP statuses.
pub fn verify_signature(
    secret: &SecretString,
    headers: &WebhookHeaders<'_>,
    body: &[u8],
) -> Result<(), WebhookError> {
    let timestamp: i64 = headers
        .timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    if (Utc::now().timestamp() - timestamp).abs() > TOLERANCE_SECONDS {
        return Err(WebhookError::StaleTimestamp);
    }

    let exposed = secret.expose_secret();
    let encoded_key = exposed.strip_prefix("whsec_").unwrap_or(exposed);
    let key = BASE64
        .decode(encoded_key)
        .map_err(|_| WebhookError::InvalidSecret)?;

    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(headers.id.as_bytes());
    mac.update(b".");
    mac.update(headers.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    for candidate in headers.signature.split_whitespace() {
        let Some((version, encoded)) = candidate.split_once(',') else {
            continue;
        };
        if version != "v1" {
            continue;
        }
        let Ok(signature) = BASE64.decode(encoded) else {
            continue;
        };
        if mac.clone().verify_slice(&signature).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"paperfold-webhook-test-key";

    fn test_secret() -> SecretString {
        SecretString::from(format!("whsec_{}", BASE64.encode(KEY)))
    }

    fn sign(id: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(KEY).expect("HMAC accepts any key size");
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_passes() {
        let body = br#"{"type":"order.paid"}"#;
        let timestamp = Utc::now().timestamp();
        let signature = sign("msg_1", timestamp, body);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &signature,
        };

        assert!(verify_signature(&test_secret(), &headers, body).is_ok());
    }

    #[test]
    fn test_signature_over_different_body_fails() {
        let timestamp = Utc::now().timestamp();
        let signature = sign("msg_1", timestamp, br#"{"type":"order.paid"}"#);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &signature,
        };

        let result = verify_signature(&test_secret(), &headers, b"tampered");
        assert!(matches!(result, Err(WebhookError::SignatureMismatch)));
    }

    #[test]
    fn test_signature_bound_to_delivery_id() {
        let body = b"{}";
        let timestamp = Utc::now().timestamp();
        let signature = sign("msg_1", timestamp, body);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_2",
            timestamp: &ts,
            signature: &signature,
        };

        let result = verify_signature(&test_secret(), &headers, body);
        assert!(matches!(result, Err(WebhookError::SignatureMismatch)));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let timestamp = Utc::now().timestamp() - 600;
        let signature = sign("msg_1", timestamp, body);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &signature,
        };

        let result = verify_signature(&test_secret(), &headers, body);
        assert!(matches!(result, Err(WebhookError::StaleTimestamp)));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let body = b"{}";
        let timestamp = Utc::now().timestamp() + 600;
        let signature = sign("msg_1", timestamp, body);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &signature,
        };

        let result = verify_signature(&test_secret(), &headers, body);
        assert!(matches!(result, Err(WebhookError::StaleTimestamp)));
    }

    #[test]
    fn test_unparseable_timestamp_rejected() {
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: "not-a-number",
            signature: "v1,AAAA",
        };

        let result = verify_signature(&test_secret(), &headers, b"{}");
        assert!(matches!(result, Err(WebhookError::InvalidTimestamp)));
    }

    #[test]
    fn test_any_matching_candidate_passes() {
        let body = b"{}";
        let timestamp = Utc::now().timestamp();
        let valid = sign("msg_1", timestamp, body);
        let combined = format!("v2,Zm9v v1,Zm9vYmFy {valid}");
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &combined,
        };

        assert!(verify_signature(&test_secret(), &headers, body).is_ok());
    }

    #[test]
    fn test_secret_without_prefix_accepted() {
        let body = b"{}";
        let timestamp = Utc::now().timestamp();
        let signature = sign("msg_1", timestamp, body);
        let ts = timestamp.to_string();
        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: &ts,
            signature: &signature,
        };
        let bare_secret = SecretString::from(BASE64.encode(KEY));

        assert!(verify_signature(&bare_secret, &headers, body).is_ok());
    }

    #[test]
    fn test_from_map_reports_first_missing_header() {
        let mut map = HeaderMap::new();
        map.insert(ID_HEADER, "msg_1".parse().unwrap());

        let result = WebhookHeaders::from_map(&map);
        assert!(matches!(
            result,
            Err(WebhookError::MissingHeader(TIMESTAMP_HEADER))
        ));
    }

    #[test]
    fn test_from_map_extracts_all_three() {
        let mut map = HeaderMap::new();
        map.insert(ID_HEADER, "msg_1".parse().unwrap());
        map.insert(TIMESTAMP_HEADER, "1700000000".parse().unwrap());
        map.insert(SIGNATURE_HEADER, "v1,AAAA".parse().unwrap());

        let headers = WebhookHeaders::from_map(&map).unwrap();
        assert_eq!(headers.id, "msg_1");
        assert_eq!(headers.timestamp, "1700000000");
        assert_eq!(headers.signature, "v1,AAAA");
    }
}
