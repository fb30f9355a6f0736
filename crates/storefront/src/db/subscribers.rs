//! `PostgreSQL` newsletter subscriber store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use wovry_core::{Email, Subscriber, SubscriberId};

use super::{RepositoryError, SubscriberStore, Subscription};

/// Subscribers in `storefront.newsletter_subscriber`.
#[derive(Clone)]
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: SubscriberId,
    email: Email,
    subscribed_at: DateTime<Utc>,
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    #[instrument(skip(self), fields(email = %email))]
    async fn subscribe(&self, email: &Email) -> Result<Subscription, RepositoryError> {
        // `ON CONFLICT DO NOTHING` returns no row for an existing address, so
        // only the request that actually inserted sees `Created`.
        let row = sqlx::query_as::<_, SubscriberRow>(
            r"
            INSERT INTO storefront.newsletter_subscriber (id, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, subscribed_at
            ",
        )
        .bind(SubscriberId::generate())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => Subscription::Created(Subscriber {
                id: row.id,
                email: row.email,
                subscribed_at: row.subscribed_at,
            }),
            None => Subscription::Existing,
        })
    }
}
