//! Object storage signing for digital deliverables.
//!
//! Paid files live in a private Cloudflare R2 bucket and are never served by
//! the storefront itself. The download authorizer asks a [`DownloadSigner`]
//! for a short-lived presigned URL and redirects the customer to it.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::StorageConfig;

/// Errors that can occur while producing a signed URL.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Signing configuration is invalid (e.g. TTL out of range).
    #[error("storage configuration error: {0}")]
    Config(String),

    /// The SDK failed to produce a presigned request.
    #[error("presign error: {0}")]
    Presign(String),
}

/// Mints short-lived URLs for paid files.
///
/// The production implementation is [`R2Signer`]; tests substitute an
/// in-memory one.
#[async_trait]
pub trait DownloadSigner: Send + Sync {
    /// Produce a time-boxed URL for `file_key` that downloads as `filename`.
    async fn signed_url(
        &self,
        file_key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

/// Signer backed by a Cloudflare R2 bucket via the S3-compatible API.
pub struct R2Signer {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for R2Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Signer")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl R2Signer {
    /// Create a signer from storage configuration.
    ///
    /// Construction is pure: no network traffic happens until a URL is
    /// signed.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.expose_secret().to_owned(),
            None,
            None,
            "paperfold-config",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl DownloadSigner for R2Signer {
    #[instrument(skip(self), fields(backend = "r2"))]
    async fn signed_url(
        &self,
        file_key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let presigning =
            PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Config(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(file_key)
            .response_content_disposition(format!(
                "attachment; filename=\"{}\"",
                sanitize_filename(filename)
            ))
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}

/// Make a display title safe to embed in a quoted `Content-Disposition`
/// filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_sanitize_filename_strips_header_breakers() {
        assert_eq!(sanitize_filename("Weekly Planner"), "Weekly Planner");
        assert_eq!(sanitize_filename("a\"b"), "a_b");
        assert_eq!(sanitize_filename("a\\b"), "a_b");
        assert_eq!(sanitize_filename("a\r\nb"), "a__b");
    }

    #[test]
    fn test_signer_constructs_without_io() {
        let config = StorageConfig {
            endpoint: "http://localhost:9000".to_owned(),
            region: "auto".to_owned(),
            bucket: "paperfold-files".to_owned(),
            access_key_id: "test-key".to_owned(),
            secret_access_key: SecretString::from("test-secret"),
        };

        let signer = R2Signer::new(&config);
        assert_eq!(signer.bucket, "paperfold-files");
    }
}
