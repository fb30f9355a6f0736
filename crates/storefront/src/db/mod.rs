//! Order, product and subscriber persistence.
//!
//! # Database: `wovry`
//!
//! ## Tables (schema `storefront`)
//!
//! - `orders` - Checkout orders with item snapshots and payment status
//! - `products` - The catalog
//! - `newsletter_subscriber` - Newsletter signups, unique by email
//!
//! Handlers talk to the stores through the traits in this module. The
//! `PostgreSQL` implementations live in [`orders`], [`products`] and
//! [`subscribers`]; [`memory`] holds in-process implementations used by the
//! test suite and for running the server without a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p wovry-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod subscribers;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use wovry_core::{
    Email, IdentityId, NewOrder, Order, OrderId, OrderStatus, PaymentTransition, Product,
    ProductDraft, ProductFacets, ProductId, ProductQuery, Subscriber,
};

pub use memory::{InMemoryOrderStore, InMemoryProductStore, InMemorySubscriberStore};
pub use orders::PgOrderStore;
pub use products::PgProductStore;
pub use subscribers::PgSubscriberStore;

/// Embedded storefront migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Result of a newsletter signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// A new subscriber record was created.
    Created(Subscriber),
    /// The address was already subscribed; nothing was written.
    Existing,
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a validated order as `pending` under a freshly generated id.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Record the processor session opened for an order.
    async fn set_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError>;

    /// Move an order from `pending` to `paid`.
    ///
    /// The check and the write happen atomically, so concurrent deliveries of
    /// the same event transition the order once.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no order has this id.
    async fn mark_paid(&self, id: OrderId) -> Result<PaymentTransition, RepositoryError>;

    /// All orders, newest first, optionally filtered by status.
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError>;

    /// Orders placed by one identity, newest first.
    async fn list_for_user(&self, user_id: &IdentityId) -> Result<Vec<Order>, RepositoryError>;

    /// Orders still `pending` that were created before `cutoff`, oldest first.
    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Catalog persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Filter, order and page the catalog.
    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Distinct categories, sizes and colors.
    async fn facets(&self) -> Result<ProductFacets, RepositoryError>;

    /// Insert a product; the store assigns id and creation time.
    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Replace the editable fields of a product.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no product has this id.
    async fn update(&self, id: ProductId, draft: ProductDraft)
    -> Result<Product, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no product has this id.
    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// Newsletter subscriber persistence.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Create a subscriber unless the address is already subscribed.
    async fn subscribe(&self, email: &Email) -> Result<Subscription, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
