//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use paperfold_core::{Email, UserId};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the signed-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: UserId,
    /// Customer's email address.
    pub email: Email,
}

/// Session keys for storefront data.
pub mod keys {
    /// Key for storing the current signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for remembered customer preferences.
    pub const CUSTOMER_PREFERENCES: &str = "customer_preferences";
}
