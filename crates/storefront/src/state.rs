//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::polar::PolarClient;
use crate::services::email::EmailService;
use crate::services::usage::UsageRecorder;
use crate::storage::{DownloadSigner, R2Signer};

/// Error assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    polar: PolarClient,
    signer: Arc<dyn DownloadSigner>,
    usage: UsageRecorder,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Spawns the usage recording worker, so this must run inside the Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let polar = PolarClient::new(&config.polar);
        let signer: Arc<dyn DownloadSigner> = Arc::new(R2Signer::new(&config.storage));
        let usage = UsageRecorder::spawn(pool.clone());
        let email = EmailService::new(&config.email, &config.base_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                polar,
                signer,
                usage,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn polar(&self) -> &PolarClient {
        &self.inner.polar
    }

    /// Get a reference to the download URL signer.
    #[must_use]
    pub fn signer(&self) -> &dyn DownloadSigner {
        self.inner.signer.as_ref()
    }

    /// Get a handle to the download usage recorder.
    #[must_use]
    pub fn usage(&self) -> &UsageRecorder {
        &self.inner.usage
    }

    /// Get a reference to the transactional email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }
}
