//! Orders and the customer details captured at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::{CartError, CartItem, order_total, validate_items};
use super::identity::IdentityId;
use crate::{CurrencyCode, Email, MAX_ORDER_TOTAL, OrderId, OrderStatus};

/// Errors in the customer details submitted with a checkout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerInfoError {
    /// The customer's name is blank.
    #[error("customer name is required")]
    MissingName,
}

/// Contact and shipping details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

impl CustomerInfo {
    /// Check the fields the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`CustomerInfoError::MissingName`] when the name is blank.
    pub fn validate(&self) -> Result<(), CustomerInfoError> {
        if self.name.trim().is_empty() {
            return Err(CustomerInfoError::MissingName);
        }
        Ok(())
    }
}

/// An order that has been validated but not yet persisted.
///
/// The only way to build one is [`NewOrder::new`], so the total always equals
/// the sum over the submitted items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    customer_info: CustomerInfo,
    items: Vec<CartItem>,
    total: Decimal,
    user_id: Option<IdentityId>,
}

impl NewOrder {
    /// Validate the items and compute the total server-side.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the items cannot be checked out in
    /// `currency`, or if their total exceeds [`MAX_ORDER_TOTAL`].
    pub fn new(
        items: Vec<CartItem>,
        customer_info: CustomerInfo,
        user_id: Option<IdentityId>,
        currency: CurrencyCode,
    ) -> Result<Self, CartError> {
        validate_items(&items, currency)?;
        let total = order_total(&items)?;
        if total > MAX_ORDER_TOTAL {
            return Err(CartError::TotalTooLarge {
                max: MAX_ORDER_TOTAL,
            });
        }

        Ok(Self {
            customer_info,
            items,
            total,
            user_id,
        })
    }

    #[must_use]
    pub const fn customer_info(&self) -> &CustomerInfo {
        &self.customer_info
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<&IdentityId> {
        self.user_id.as_ref()
    }

    /// Materialize the stored order. New orders always start `pending`.
    #[must_use]
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            customer_info: self.customer_info,
            items: self.items,
            total: self.total,
            status: OrderStatus::Pending,
            created_at,
            paid_at: None,
            payment_session_id: None,
            user_id: self.user_id,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_info: CustomerInfo,
    /// Item snapshots taken at checkout; later catalog edits do not touch them.
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Processor checkout session opened for this order, if any.
    pub payment_session_id: Option<String>,
    /// Identity that placed the order (guest checkouts have none).
    pub user_id: Option<IdentityId>,
}
