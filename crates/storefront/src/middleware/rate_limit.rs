//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two tiers, keyed by client IP:
//! - `strict_rate_limiter`: sign-in code and download endpoints (~10/min)
//! - `api_rate_limiter`: cart, checkout, and the rest of the API (~100/min)

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that resolves the real client IP behind Cloudflare and
/// Fly.io, in proxy-preference order.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

/// Proxy headers that may carry the client IP, most trusted first.
const IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    // X-Forwarded-For may be a chain; the first entry is the client
    let first = value.split(',').next()?;
    first.trim().parse().ok()
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        IP_HEADERS
            .iter()
            .find_map(|name| header_ip(req.headers(), name))
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the strict limiter: ~10 requests per minute per IP.
///
/// Applied to sign-in code endpoints (to slow code guessing) and download
/// endpoints (to keep signed URLs from being farmed).
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn strict_rate_limiter() -> RateLimiterLayer {
    // Replenish 1 token every 6 seconds, burst of 5
    make_limiter(6, 5)
}

/// Create the general API limiter: ~100 requests per minute per IP.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(50)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    // Replenish quickly, burst of 50
    make_limiter(1, 50)
}

fn make_limiter(per_second: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(per_second)
        .burst_size(burst)
        .finish()
        .expect("rate limiter config with positive per_second and burst_size is valid");
    GovernorLayer::new(Arc::new(config))
}
