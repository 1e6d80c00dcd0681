//! Customer domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use paperfold_core::{Email, UserId};

/// A storefront customer (domain type).
///
/// Created on first verified sign-in. Orders are keyed by email rather than
/// user id so purchases made before the customer ever signed in still show up
/// in their library.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Customer's email address.
    pub email: Email,
    /// Whether the email has been verified via a one-time code.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
