//! In-process stores.
//!
//! Thread-safe `Arc<RwLock<HashMap<..>>>` implementations of the store
//! traits. They follow the same contracts as the `PostgreSQL` stores (atomic
//! payment transition, create-once subscribers) and back the integration
//! tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use wovry_core::{
    Email, IdentityId, NewOrder, Order, OrderId, OrderStatus, PaymentTransition, Product,
    ProductDraft, ProductFacets, ProductId, ProductQuery, Subscriber, SubscriberId,
};

use super::{OrderStore, ProductStore, RepositoryError, SubscriberStore, Subscription};

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// A thread-safe in-memory order store.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed order (fixtures with a chosen id or status).
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Whether no order has been stored.
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let order = order.into_order(OrderId::generate(), Utc::now());
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn set_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.payment_session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn mark_paid(&self, id: OrderId) -> Result<PaymentTransition, RepositoryError> {
        // Held for the whole check-and-set.
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if !order.status.can_transition_to(OrderStatus::Paid) {
            return Ok(PaymentTransition::AlreadyPaid);
        }
        order.status = OrderStatus::Paid;
        order.paid_at = Some(Utc::now());
        Ok(PaymentTransition::Transitioned)
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| status.is_none_or(|s| order.status == s))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_for_user(&self, user_id: &IdentityId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.status == OrderStatus::Pending && order.created_at < cutoff)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }
}

/// A thread-safe in-memory catalog.
#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed product (fixtures with a chosen creation time).
    pub async fn insert(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(query.apply(products.values().cloned()))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn facets(&self) -> Result<ProductFacets, RepositoryError> {
        let products = self.products.read().await;
        Ok(ProductFacets::collect(products.values()))
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let product = draft.into_product(ProductId::generate(), Utc::now());
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.apply(draft);
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// A thread-safe in-memory subscriber list.
#[derive(Default, Clone)]
pub struct InMemorySubscriberStore {
    subscribers: Arc<RwLock<HashMap<Email, Subscriber>>>,
}

impl InMemorySubscriberStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All subscribers, in no particular order.
    pub async fn all(&self) -> Vec<Subscriber> {
        self.subscribers.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn subscribe(&self, email: &Email) -> Result<Subscription, RepositoryError> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.contains_key(email) {
            return Ok(Subscription::Existing);
        }

        let subscriber = Subscriber {
            id: SubscriberId::generate(),
            email: email.clone(),
            subscribed_at: Utc::now(),
        };
        subscribers.insert(email.clone(), subscriber.clone());
        Ok(Subscription::Created(subscriber))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use wovry_core::{CartItem, CurrencyCode, CustomerInfo};

    use super::*;

    fn new_order(user: Option<&str>) -> NewOrder {
        NewOrder::new(
            vec![CartItem {
                product_id: None,
                name: "Wool skein".to_string(),
                unit_price: Decimal::from(250),
                quantity: 2,
                image_url: String::new(),
            }],
            CustomerInfo {
                name: "Meera".to_string(),
                email: Email::parse("meera@example.in").unwrap(),
                phone: String::new(),
                address: String::new(),
                city: String::new(),
                state: String::new(),
                zip: String::new(),
            },
            user.map(IdentityId::from),
            CurrencyCode::INR,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let order = store.create(new_order(None)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        assert_eq!(
            store.mark_paid(order.id).await.unwrap(),
            PaymentTransition::Transitioned
        );
        assert_eq!(
            store.mark_paid(order.id).await.unwrap(),
            PaymentTransition::AlreadyPaid
        );

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_paid_unknown_order() {
        let store = InMemoryOrderStore::new();
        assert!(matches!(
            store.mark_paid(OrderId::generate()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_mark_paid_transitions_once() {
        let store = InMemoryOrderStore::new();
        let order = store.create(new_order(None)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.mark_paid(order.id).await.unwrap() })
            })
            .collect();

        let mut transitioned = 0;
        for handle in handles {
            if handle.await.unwrap() == PaymentTransition::Transitioned {
                transitioned += 1;
            }
        }
        assert_eq!(transitioned, 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = InMemoryOrderStore::new();
        let mine = store.create(new_order(Some("u-1"))).await.unwrap();
        let other = store.create(new_order(Some("u-2"))).await.unwrap();
        store.mark_paid(other.id).await.unwrap();

        let for_user = store.list_for_user(&IdentityId::new("u-1")).await.unwrap();
        assert_eq!(for_user.len(), 1);
        assert_eq!(for_user[0].id, mine.id);

        let paid = store.list(Some(OrderStatus::Paid)).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, other.id);
        assert_eq!(store.list(None).await.unwrap().len(), 2);

        let stale = store
            .list_stale_pending(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_subscribe_once() {
        let store = InMemorySubscriberStore::new();
        let email = Email::parse("knit@example.in").unwrap();

        assert!(matches!(
            store.subscribe(&email).await.unwrap(),
            Subscription::Created(_)
        ));
        assert_eq!(
            store.subscribe(&email).await.unwrap(),
            Subscription::Existing
        );
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_product_crud() {
        let store = InMemoryProductStore::new();
        let draft: ProductDraft =
            serde_json::from_str(r#"{"name":"Beanie","price":"300","category":"hats"}"#).unwrap();
        let created = store.create(draft.clone()).await.unwrap();

        let renamed = ProductDraft {
            name: "Slouchy beanie".to_string(),
            ..draft
        };
        let updated = store.update(created.id, renamed).await.unwrap();
        assert_eq!(updated.name, "Slouchy beanie");
        assert_eq!(updated.created_at, created.created_at);

        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
