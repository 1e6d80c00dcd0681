//! Customer authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during sign-in code verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted code does not match, or no code was requested.
    #[error("invalid or expired code")]
    InvalidCode,

    /// The code was correct once but its window has passed.
    #[error("code has expired, request a new one")]
    CodeExpired,

    /// The code has been guessed at too many times.
    #[error("too many attempts, request a new code")]
    TooManyAttempts,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
