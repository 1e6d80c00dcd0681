//! Customer authentication.
//!
//! Customers sign in with a one-time code emailed to them; there are no
//! passwords. A verified code upserts the customer record and marks the
//! email verified, which is what download ownership checks key on.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use paperfold_core::Email;

use crate::db::otp_codes::OtpConsume;
use crate::db::{OtpRepository, UserRepository};
use crate::models::user::User;

/// How long a sign-in code stays valid.
const CODE_TTL_MINUTES: i64 = 10;

/// Customer authentication service.
///
/// Issues and verifies one-time sign-in codes. Only the SHA-256 digest of a
/// code is stored; the plaintext exists just long enough to email it.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    codes: OtpRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            codes: OtpRepository::new(pool),
        }
    }

    /// Issue a fresh sign-in code for `email`, replacing any outstanding one.
    ///
    /// Returns the plaintext code for the caller to deliver.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the code cannot be stored.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn request_code(&self, email: &Email) -> Result<String, AuthError> {
        let code = generate_signin_code();
        let digest = code_digest(&code);
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

        self.codes.create(email, &digest, expires_at).await?;

        tracing::info!(email = %email, "Sign-in code issued");
        Ok(code)
    }

    /// Verify a submitted code and sign the customer in.
    ///
    /// A correct code consumes itself and upserts the customer as verified.
    /// Wrong guesses burn an attempt; the code dies after five.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for a wrong or unknown code,
    /// `AuthError::CodeExpired` when the window has passed, and
    /// `AuthError::TooManyAttempts` once the guess limit is hit.
    #[instrument(skip(self, email, code), fields(email = %email))]
    pub async fn verify_code(&self, email: &Email, code: &str) -> Result<User, AuthError> {
        let digest = code_digest(code);

        match self.codes.consume(email, &digest).await? {
            OtpConsume::Verified => {
                let user = self.users.upsert_verified(email).await?;
                tracing::info!(user_id = %user.id, "Customer signed in");
                Ok(user)
            }
            OtpConsume::Mismatch | OtpConsume::NotFound => Err(AuthError::InvalidCode),
            OtpConsume::Expired => Err(AuthError::CodeExpired),
            OtpConsume::TooManyAttempts => Err(AuthError::TooManyAttempts),
        }
    }
}

/// Generate a 6-digit sign-in code.
#[must_use]
pub fn generate_signin_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// SHA-256 digest of a code, hex-encoded, as stored in the database.
#[must_use]
pub fn code_digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_signin_code_format() {
        let code = generate_signin_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_signin_code_range() {
        for _ in 0..100 {
            let code: u32 = generate_signin_code().parse().expect("valid number");
            assert!(code >= 100_000);
            assert!(code < 1_000_000);
        }
    }

    #[test]
    fn test_code_digest_is_stable_hex() {
        let digest = code_digest("123456");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, code_digest("123456"));
        assert_ne!(digest, code_digest("123457"));
    }
}
