//! Order reconciliation commands.
//!
//! When a payment webhook could not be applied (it is acknowledged anyway and
//! logged), the order stays `pending`. These commands find such orders and
//! apply the same idempotent `pending -> paid` transition by hand.
//!
//! # Usage
//!
//! ```bash
//! # Orders still pending after 30 minutes
//! wovry-cli orders pending --older-than 30
//!
//! # Mark one paid after checking the payment in the Stripe dashboard
//! wovry-cli orders mark-paid 5b8f0a52-9d7e-4a0c-8a55-1f3f2d9c7e10
//! ```

use chrono::{Duration, Utc};

use wovry_core::{OrderId, PaymentTransition};
use wovry_storefront::db::{OrderStore, PgOrderStore, RepositoryError};

use super::{CliError, connect};

/// List pending orders created more than `older_than_minutes` ago, oldest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn pending(older_than_minutes: u32) -> Result<(), CliError> {
    let store = PgOrderStore::new(connect().await?);
    let cutoff = Utc::now() - Duration::minutes(i64::from(older_than_minutes));
    let orders = store.list_stale_pending(cutoff).await?;

    #[allow(clippy::print_stdout)]
    {
        if orders.is_empty() {
            println!("No pending orders older than {older_than_minutes} minutes.");
        }
        for order in &orders {
            println!(
                "{}  {}  {:>12}  {:<24}  session={}",
                order.id,
                order.created_at.format("%Y-%m-%d %H:%M"),
                order.total,
                order.customer_info.email,
                order.payment_session_id.as_deref().unwrap_or("-"),
            );
        }
    }

    tracing::info!(count = orders.len(), "Listed pending orders");
    Ok(())
}

/// Mark an order paid.
///
/// Running it on an order that is already paid changes nothing.
///
/// # Errors
///
/// Returns an error if the id is malformed, names no order, or the update fails.
pub async fn mark_paid(order_id: &str) -> Result<(), CliError> {
    let id: OrderId = order_id
        .parse()
        .map_err(|_| CliError::InvalidOrderId(order_id.to_string()))?;

    let store = PgOrderStore::new(connect().await?);
    match store.mark_paid(id).await {
        Ok(PaymentTransition::Transitioned) => {
            tracing::info!(order_id = %id, "Order marked paid");
        }
        Ok(PaymentTransition::AlreadyPaid) => {
            tracing::info!(order_id = %id, "Order was already paid, nothing changed");
        }
        Err(RepositoryError::NotFound) => return Err(CliError::OrderNotFound(id.to_string())),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
