//! Remembered customer preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperfold_core::Email;

/// Schema version written with every preferences blob.
///
/// Bump when the shape changes incompatibly. Loads of a newer version than
/// this are treated as absent rather than misread.
pub const CURRENT_VERSION: u32 = 1;

/// Sticky per-customer data used to prefill future checkouts.
///
/// Written after every checkout attempt, successful or not. Stored in the
/// session alongside the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferences {
    /// Last email the customer checked out with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// When the customer last started a checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkout_at: Option<DateTime<Utc>>,
    /// Schema version of this blob.
    pub version: u32,
}

impl Default for CustomerPreferences {
    fn default() -> Self {
        Self {
            email: None,
            last_checkout_at: None,
            version: CURRENT_VERSION,
        }
    }
}
