//! Core types for Wovry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{
    CurrencyCode, MAX_ORDER_TOTAL, MAX_PRODUCT_PRICE, Price, PriceError, STORED_AMOUNT_SCALE,
};
pub use status::*;
