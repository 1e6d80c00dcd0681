//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod seed;

use secrecy::SecretString;

/// Resolve the storefront database URL from the environment.
///
/// Tries `STOREFRONT_DATABASE_URL` first, then the generic `DATABASE_URL`
/// set by Fly.io postgres attach, matching how the server resolves it.
pub(crate) fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")
}
