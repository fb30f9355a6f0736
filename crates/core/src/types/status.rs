//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Order payment status.
///
/// An order is created `Pending` and moves to `Paid` exactly once, when the
/// payment processor confirms the checkout session. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Only `pending -> paid` is allowed. Staying in the same state is not a
    /// transition; callers treat it as an idempotent no-op.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Pending, Self::Paid))
    }

    /// Returns the lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Result of asking the store to mark an order paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTransition {
    /// The order moved from `pending` to `paid` by this call.
    Transitioned,
    /// The order was already `paid`; nothing changed.
    AlreadyPaid,
}
