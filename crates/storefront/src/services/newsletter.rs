//! Newsletter signup.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use wovry_core::{Email, EmailError as AddressError};

use super::notifications::Notifier;
use crate::db::{RepositoryError, SubscriberStore, Subscription};

/// Body of `POST /api/newsletter`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Errors that can occur during signup.
#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] AddressError),

    #[error("failed to save subscriber: {0}")]
    Repository(#[from] RepositoryError),
}

/// Records subscribers and welcomes new ones.
#[derive(Clone)]
pub struct NewsletterService {
    subscribers: Arc<dyn SubscriberStore>,
    notifier: Notifier,
}

impl NewsletterService {
    #[must_use]
    pub fn new(subscribers: Arc<dyn SubscriberStore>, notifier: Notifier) -> Self {
        Self {
            subscribers,
            notifier,
        }
    }

    /// Subscribe an address. Only a newly created subscriber is welcomed.
    ///
    /// # Errors
    ///
    /// Returns [`NewsletterError::InvalidEmail`] before touching the store
    /// when the address does not parse.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, raw_email: &str) -> Result<Subscription, NewsletterError> {
        let email = Email::parse(raw_email)?;
        let subscription = self.subscribers.subscribe(&email).await?;

        match &subscription {
            Subscription::Created(subscriber) => {
                tracing::info!(subscriber_id = %subscriber.id, "New newsletter subscriber");
                self.notifier.welcome(subscriber.email.clone());
            }
            Subscription::Existing => {
                tracing::debug!(email = %email, "Address already subscribed");
            }
        }

        Ok(subscription)
    }
}
