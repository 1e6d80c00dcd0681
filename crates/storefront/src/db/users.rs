//! User repository for database operations.

use sqlx::PgPool;

use paperfold_core::Email;

use super::RepositoryError;
use crate::models::user::User;

/// Repository for customer account operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a verified user for this email, or mark the existing one
    /// verified.
    ///
    /// Called after a one-time code is verified, so the account is known to
    /// control the address either way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_verified(&self, email: &Email) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO storefront.users (email, email_verified)
            VALUES ($1, TRUE)
            ON CONFLICT (email) DO UPDATE
                SET email_verified = TRUE, updated_at = NOW()
            RETURNING id, email, email_verified, created_at, updated_at
            ",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }
}
