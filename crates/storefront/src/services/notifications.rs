//! One-shot notification dispatch.
//!
//! Messages are sent from a spawned task so the request that triggered them
//! never waits on SMTP. Delivery failures are logged and dropped.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use wovry_core::{Email, Order};

use super::email::Mailer;

/// Fires notifications in the background.
///
/// Without a mailer every notification is skipped with a warning.
#[derive(Clone, Default)]
pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self { mailer }
    }

    /// Whether a mail transport is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Welcome a newly created subscriber.
    ///
    /// Returns the spawned task, or `None` when mail is not configured.
    pub fn welcome(&self, email: Email) -> Option<JoinHandle<()>> {
        let Some(mailer) = self.mailer.clone() else {
            tracing::warn!(email = %email, "SMTP not configured, skipping welcome email");
            return None;
        };

        let span = tracing::info_span!("welcome_email", email = %email);
        Some(tokio::spawn(
            async move {
                match mailer.send_welcome(&email).await {
                    Ok(()) => tracing::info!("Welcome email sent"),
                    Err(e) => tracing::error!(error = %e, "Failed to send welcome email"),
                }
            }
            .instrument(span),
        ))
    }

    /// Confirm an order that just moved to `paid`.
    ///
    /// Returns the spawned task, or `None` when mail is not configured.
    pub fn order_paid(&self, order: Order) -> Option<JoinHandle<()>> {
        let Some(mailer) = self.mailer.clone() else {
            tracing::warn!(order_id = %order.id, "SMTP not configured, skipping order confirmation");
            return None;
        };

        let span = tracing::info_span!("order_confirmation_email", order_id = %order.id);
        Some(tokio::spawn(
            async move {
                match mailer.send_order_confirmation(&order).await {
                    Ok(()) => tracing::info!("Order confirmation sent"),
                    Err(e) => tracing::error!(error = %e, "Failed to send order confirmation"),
                }
            }
            .instrument(span),
        ))
    }
}
