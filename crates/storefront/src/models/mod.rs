//! Domain models for the storefront.
//!
//! - [`cart`] - Session-persisted shopping cart
//! - [`order`] - Recorded purchases and their deliverables
//! - [`preferences`] - Sticky checkout-prefill data
//! - [`session`] - Session-stored identity and session keys
//! - [`user`] - Customer accounts

pub mod cart;
pub mod order;
pub mod preferences;
pub mod session;
pub mod user;
