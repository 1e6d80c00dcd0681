//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - One-time-code customer sign-in
//! - `cart` - Session-backed cart operations
//! - `checkout` - Hosted checkout initiation with the payment provider
//! - `download` - Authorization and signed URLs for purchased files
//! - `email` - Transactional email (sign-in codes, order notifications)
//! - `preferences` - Session-backed customer preferences
//! - `usage` - Durable recording of download grants

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod download;
pub mod email;
pub mod preferences;
pub mod usage;
