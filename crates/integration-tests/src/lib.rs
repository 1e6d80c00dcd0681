//! Integration tests for Paperfold.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p paperfold-integration-tests
//! ```
//!
//! # Approach
//!
//! Tests drive the real storefront router in process with
//! `tower::ServiceExt::oneshot`: the full middleware stack, sessions in a
//! `MemoryStore`, no network, no running server. The database pool is lazy
//! and never actually connects, so these tests cover every endpoint that
//! stays off the database; the repositories and database-backed services
//! have their own unit tests in the storefront crate.
//!
//! The Polar API URL points at a closed local port, so checkout requests
//! that reach the provider fail fast with a connection error. That is a
//! feature: it exercises the provider-unavailable path deterministically.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use paperfold_storefront::config::{EmailConfig, PolarConfig, StorageConfig, StorefrontConfig};
use paperfold_storefront::middleware::session::SESSION_COOKIE_NAME;
use paperfold_storefront::routes;
use paperfold_storefront::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Webhook endpoint secret shared by the harness and the signing helper.
pub const WEBHOOK_SECRET: &str = "whsec_dGVzdC1zZWNyZXQ=";

/// Forwarded-for address attached to every test request so the per-IP rate
/// limiter has a key to extract.
pub const TEST_CLIENT_IP: &str = "203.0.113.7";

/// Build a config wired for in-process tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://paperfold@localhost:5432/paperfold_test"),
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        allowed_origin: "http://localhost:5173".to_owned(),
        session_secret: SecretString::from("integration-test-session-secret-0123456789abcdef"),
        polar: PolarConfig {
            // Closed port: provider calls fail fast with a connection error
            api_url: "http://127.0.0.1:9".to_owned(),
            access_token: SecretString::from("polar_test_token"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
        },
        storage: StorageConfig {
            endpoint: "https://test-account.r2.cloudflarestorage.com".to_owned(),
            region: "auto".to_owned(),
            bucket: "paperfold-test".to_owned(),
            access_key_id: "test-access-key".to_owned(),
            secret_access_key: SecretString::from("test-secret-access-key"),
        },
        email: EmailConfig {
            smtp_host: "localhost".to_owned(),
            smtp_port: 2525,
            smtp_username: "test".to_owned(),
            smtp_password: SecretString::from("test"),
            from_address: "Paperfold <orders@paperfold.ink>".to_owned(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Build the real router backed by in-memory sessions and a lazy pool.
///
/// Nothing connects until a handler actually touches the database, which
/// the tests here deliberately avoid.
///
/// # Panics
///
/// Panics if application state cannot be constructed.
pub async fn test_app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://paperfold@localhost:5432/paperfold_test")
        .expect("lazy pool creation is infallible for a well-formed URL");

    let state = AppState::new(config, pool).expect("application state");

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(false);

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}

/// Build a request, optionally with a JSON body and a session cookie.
///
/// # Panics
///
/// Panics if the request is malformed, which in tests means a typo.
#[must_use]
pub fn request(
    method: Method,
    uri: &str,
    json: Option<&serde_json::Value>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", TEST_CLIENT_IP);

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let body = match json {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    builder.body(body).expect("request builds")
}

/// Build a webhook delivery request with raw body and custom headers.
///
/// # Panics
///
/// Panics if the request is malformed.
#[must_use]
pub fn webhook_request(body: &str, headers: &[(&str, String)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/polar")
        .header("x-forwarded-for", TEST_CLIENT_IP)
        .header(header::CONTENT_TYPE, "application/json");

    for (name, value) in headers {
        builder = builder.header(*name, value);
    }

    builder
        .body(Body::from(body.to_owned()))
        .expect("request builds")
}

/// Sign a webhook body the way the provider does: HMAC-SHA256 over
/// `{id}.{timestamp}.{body}`, keyed with the decoded endpoint secret.
///
/// # Panics
///
/// Panics if the shared secret constant is not valid base64.
#[must_use]
pub fn sign_webhook(id: &str, timestamp: i64, body: &str) -> String {
    let encoded_key = WEBHOOK_SECRET
        .strip_prefix("whsec_")
        .unwrap_or(WEBHOOK_SECRET);
    let key = BASE64.decode(encoded_key).expect("secret is valid base64");

    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac accepts any key length");
    mac.update(format!("{id}.{timestamp}.{body}").as_bytes());
    format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
}

/// The three signed delivery headers for a webhook body, stamped now.
#[must_use]
pub fn signed_webhook_headers(body: &str) -> Vec<(&'static str, String)> {
    let timestamp = chrono::Utc::now().timestamp();
    vec![
        ("webhook-id", "msg_test_1".to_owned()),
        ("webhook-timestamp", timestamp.to_string()),
        ("webhook-signature", sign_webhook("msg_test_1", timestamp, body)),
    ]
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON.
pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Extract the session cookie pair (`pf_session=...`) from a response, if
/// one was set.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(ToOwned::to_owned)
}
