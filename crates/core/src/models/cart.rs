//! Shopping cart value object.
//!
//! The cart belongs to the shopper's session. The server never keeps a copy;
//! the client hands the items over at checkout, where they are validated and
//! snapshotted into an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::{CurrencyCode, MAX_ORDER_TOTAL, ProductId};

/// Maximum number of line items in a single checkout (payment processor limit).
pub const MAX_LINE_ITEMS: usize = 100;

/// Errors raised when a cart cannot be checked out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The cart has no items.
    #[error("cart is empty")]
    Empty,

    /// The cart has more line items than a checkout session accepts.
    #[error("cart has {count} line items, at most {max} are allowed")]
    TooManyItems {
        /// Submitted line item count.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// An item has a blank name.
    #[error("item {index} has no name")]
    MissingName {
        /// Zero-based position in the cart.
        index: usize,
    },

    /// An item has a zero quantity.
    #[error("item {index} must have a positive quantity")]
    NonPositiveQuantity {
        /// Zero-based position in the cart.
        index: usize,
    },

    /// An item has a negative unit price.
    #[error("item {index} has a negative price")]
    NegativePrice {
        /// Zero-based position in the cart.
        index: usize,
    },

    /// An item's unit price has more decimal places than the currency's minor unit.
    #[error("item {index} has a price finer than the currency's smallest unit")]
    SubMinorUnitPrice {
        /// Zero-based position in the cart.
        index: usize,
    },

    /// An item's unit price exceeds what an order can hold.
    #[error("item {index} has a price above {max}")]
    PriceTooLarge {
        /// Zero-based position in the cart.
        index: usize,
        /// Largest accepted amount.
        max: Decimal,
    },

    /// The cart total exceeds what an order can hold.
    #[error("cart total is above {max}")]
    TotalTooLarge {
        /// Largest accepted total.
        max: Decimal,
    },

    /// The cart total does not fit a decimal.
    #[error("cart total overflowed")]
    TotalOverflow,
}

/// A line in the cart: a snapshot of a product at the moment it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog product this line refers to, when known.
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    /// Product name at the time it was added.
    pub name: String,
    /// Price per unit in the store currency's standard unit.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    /// Number of units. Must be positive to check out.
    pub quantity: u32,
    /// Product image shown on the processor's hosted page.
    #[serde(default)]
    pub image_url: String,
}

impl CartItem {
    /// Snapshot a catalog product into a cart line.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: Some(product.id),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_url: product.image_url.clone(),
        }
    }

    /// `unit_price × quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Check that a list of items can be turned into an order.
///
/// Prices must be whole minor units of `currency` so the amount charged
/// equals the order total.
///
/// # Errors
///
/// Returns the first [`CartError`] found, scanning items in order.
pub fn validate_items(items: &[CartItem], currency: CurrencyCode) -> Result<(), CartError> {
    if items.is_empty() {
        return Err(CartError::Empty);
    }
    if items.len() > MAX_LINE_ITEMS {
        return Err(CartError::TooManyItems {
            count: items.len(),
            max: MAX_LINE_ITEMS,
        });
    }

    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(CartError::MissingName { index });
        }
        if item.quantity == 0 {
            return Err(CartError::NonPositiveQuantity { index });
        }
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            return Err(CartError::NegativePrice { index });
        }
        if !currency.is_whole_minor_units(item.unit_price) {
            return Err(CartError::SubMinorUnitPrice { index });
        }
        if item.unit_price > MAX_ORDER_TOTAL {
            return Err(CartError::PriceTooLarge {
                index,
                max: MAX_ORDER_TOTAL,
            });
        }
    }

    Ok(())
}

/// Sum of `unit_price × quantity` over the items.
///
/// # Errors
///
/// Returns [`CartError::TotalOverflow`] if the sum exceeds the decimal range.
pub fn order_total(items: &[CartItem]) -> Result<Decimal, CartError> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        item.line_total()
            .and_then(|line| sum.checked_add(line))
            .ok_or(CartError::TotalOverflow)
    })
}

/// The shopper's cart.
///
/// Serializes as a plain JSON array of items so clients can persist it
/// wherever they keep session state and send it back at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from items previously stored by the client.
    #[must_use]
    pub const fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Add a product. Adding a product already in the cart increases its quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == Some(product.id))
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem::from_product(product, quantity));
        }
    }

    /// Remove a product's line. Returns `true` if a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != Some(product_id));
        self.items.len() != before
    }

    /// Set a product's quantity. A quantity of zero or less removes the line.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> bool {
        let Ok(quantity) = u32::try_from(quantity) else {
            return quantity <= 0 && self.remove(product_id);
        };
        if quantity == 0 {
            return self.remove(product_id);
        }

        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == Some(product_id))
        {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Total number of units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Cart subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TotalOverflow`] if the sum exceeds the decimal range.
    pub fn subtotal(&self) -> Result<Decimal, CartError> {
        order_total(&self.items)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empty the cart (after a successful checkout).
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Hand the items over to checkout.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }
}
