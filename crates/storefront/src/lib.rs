//! Wovry Storefront library.
//!
//! Checkout, payment webhook, catalog, newsletter and admin API for the
//! Knit & Purl shop. The binary in `main.rs` wires the production
//! collaborators; tests build [`state::AppState`] from in-memory stores and
//! fakes and drive [`routes::app`] directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
