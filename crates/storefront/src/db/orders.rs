//! `PostgreSQL` order store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use wovry_core::{
    CartItem, CustomerInfo, IdentityId, NewOrder, Order, OrderId, OrderStatus, PaymentTransition,
};

use super::{OrderStore, RepositoryError};

/// Orders in `storefront.orders`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for order queries.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_info: Json<CustomerInfo>,
    items: Json<Vec<CartItem>>,
    total: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    payment_session_id: Option<String>,
    user_id: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_info: row.customer_info.0,
            items: row.items.0,
            total: row.total,
            status: row.status,
            created_at: row.created_at,
            paid_at: row.paid_at,
            payment_session_id: row.payment_session_id,
            user_id: row.user_id.map(IdentityId::new),
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self, order), fields(total = %order.total()))]
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO storefront.orders (id, customer_info, items, total, status, user_id)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING id, customer_info, items, total, status, created_at,
                      paid_at, payment_session_id, user_id
            ",
        )
        .bind(OrderId::generate())
        .bind(Json(order.customer_info()))
        .bind(Json(order.items()))
        .bind(order.total())
        .bind(order.user_id().map(IdentityId::as_str))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, customer_info, items, total, status, created_at,
                   paid_at, payment_session_id, user_id
            FROM storefront.orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    #[instrument(skip(self))]
    async fn set_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE storefront.orders SET payment_session_id = $2 WHERE id = $1")
                .bind(id)
                .bind(session_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_paid(&self, id: OrderId) -> Result<PaymentTransition, RepositoryError> {
        // The row lock serializes concurrent deliveries; the loser sees `paid`.
        let previous: Option<OrderStatus> = sqlx::query_scalar(
            r"
            WITH target AS (
                SELECT id, status FROM storefront.orders WHERE id = $1 FOR UPDATE
            ), transition AS (
                UPDATE storefront.orders o
                SET status = 'paid', paid_at = now()
                FROM target
                WHERE o.id = target.id AND target.status = 'pending'
                RETURNING o.id
            )
            SELECT status FROM target
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match previous {
            None => Err(RepositoryError::NotFound),
            Some(OrderStatus::Pending) => Ok(PaymentTransition::Transitioned),
            Some(OrderStatus::Paid) => Ok(PaymentTransition::AlreadyPaid),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, customer_info, items, total, status, created_at,
                   paid_at, payment_session_id, user_id
            FROM storefront.orders
            WHERE $1::storefront.order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id
            ",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_for_user(&self, user_id: &IdentityId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, customer_info, items, total, status, created_at,
                   paid_at, payment_session_id, user_id
            FROM storefront.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, customer_info, items, total, status, created_at,
                   paid_at, payment_session_id, user_id
            FROM storefront.orders
            WHERE status = 'pending' AND created_at < $1
            ORDER BY created_at ASC, id
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
