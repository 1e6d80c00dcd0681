//! One-time sign-in code storage.
//!
//! Codes are stored as SHA-256 digests, never in the clear. One live code
//! per email; requesting a new code replaces any outstanding one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use paperfold_core::Email;

use super::RepositoryError;

/// Wrong guesses allowed before a code is locked out.
const MAX_ATTEMPTS: i32 = 5;

/// Outcome of attempting to consume a one-time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpConsume {
    /// Digest matched; the code has been deleted and cannot be reused.
    Verified,
    /// Digest did not match; the attempt counter was incremented.
    Mismatch,
    /// The code's expiry has passed. The row was deleted.
    Expired,
    /// Too many wrong guesses were made against this code.
    TooManyAttempts,
    /// No code is outstanding for this email.
    NotFound,
}

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    code_digest: String,
    expires_at: DateTime<Utc>,
    attempts: i32,
}

/// Repository for one-time sign-in codes.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code digest for an email, replacing any outstanding one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn create(
        &self,
        email: &Email,
        code_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.otp_codes WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.otp_codes (email, code_digest, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(email)
        .bind(code_digest)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Attempt to consume the outstanding code for an email.
    ///
    /// The row is locked for the duration of the check so concurrent guesses
    /// serialize against the attempt counter. A correct guess deletes the
    /// code; a wrong one increments `attempts` until the code locks out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn consume(
        &self,
        email: &Email,
        code_digest: &str,
    ) -> Result<OtpConsume, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OtpRow>(
            r"
            SELECT code_digest, expires_at, attempts
            FROM storefront.otp_codes
            WHERE email = $1
            FOR UPDATE
            ",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(OtpConsume::NotFound);
        };

        if row.attempts >= MAX_ATTEMPTS {
            tx.commit().await?;
            return Ok(OtpConsume::TooManyAttempts);
        }

        if row.expires_at < Utc::now() {
            sqlx::query("DELETE FROM storefront.otp_codes WHERE email = $1")
                .bind(email)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(OtpConsume::Expired);
        }

        if row.code_digest != code_digest {
            sqlx::query(
                "UPDATE storefront.otp_codes SET attempts = attempts + 1 WHERE email = $1",
            )
            .bind(email)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(OtpConsume::Mismatch);
        }

        sqlx::query("DELETE FROM storefront.otp_codes WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(OtpConsume::Verified)
    }
}
