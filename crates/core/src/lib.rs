//! Wovry Core - Shared domain types.
//!
//! This crate provides the types used across all Wovry components:
//! - `storefront` - Checkout, payment webhook, catalog and admin API server
//! - `cli` - Command-line tools for migrations, catalog import and reconciliation
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Order totals, cart validation and catalog
//! filtering live here so every collaborator implementation agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`models`] - Cart, order, product, subscriber and identity models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
