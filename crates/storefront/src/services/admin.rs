//! Admin dashboard operations.
//!
//! Callers are authorized before they get here (see
//! [`crate::middleware::RequireAdmin`]); this layer only talks to the
//! collaborators.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use wovry_core::{
    IdentitySummary, Order, OrderStatus, Product, ProductDraft, ProductError, ProductId,
};

use crate::db::{OrderStore, ProductStore, RepositoryError};
use crate::identity::{IdentityError, IdentityProvider, MAX_LISTED_IDENTITIES};

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("identity listing failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("invalid product: {0}")]
    InvalidProduct(#[from] ProductError),

    #[error("product not found")]
    ProductNotFound,

    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AdminError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::ProductNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Admin-only reads and catalog writes.
#[derive(Clone)]
pub struct AdminService {
    identity: Arc<dyn IdentityProvider>,
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
}

impl AdminService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
    ) -> Self {
        Self {
            identity,
            orders,
            products,
        }
    }

    /// Up to 1000 identities from the authentication provider.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Identity`] if the provider listing fails.
    #[instrument(skip(self))]
    pub async fn list_identities(&self) -> Result<Vec<IdentitySummary>, AdminError> {
        let identities = self.identity.list_identities(MAX_LISTED_IDENTITIES).await?;
        tracing::info!(count = identities.len(), "Listed identities for admin");
        Ok(identities)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Repository`] on store failure.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AdminError> {
        Ok(self.orders.list(status).await?)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::InvalidProduct`] for a blank name or negative price.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, AdminError> {
        let product = self.products.create(draft.validate()?).await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::ProductNotFound`] when no product has this id.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, AdminError> {
        let product = self.products.update(id, draft.validate()?).await?;
        tracing::info!("Product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns [`AdminError::ProductNotFound`] when no product has this id.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.products.delete(id).await?;
        tracing::info!("Product deleted");
        Ok(())
    }
}
