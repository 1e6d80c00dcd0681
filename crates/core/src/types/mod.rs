//! Core types for Paperfold.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod item;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use item::ItemRef;
pub use price::Price;
pub use status::OrderStatus;
