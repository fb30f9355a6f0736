//! Checkout orchestration.
//!
//! 1. Validate the cart and customer details (no side effects on failure)
//! 2. Persist a `pending` order with a server-computed total
//! 3. Open a hosted payment session tagged with the order id
//! 4. Record the session id on the order (best effort)

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use wovry_core::{
    Cart, CartError, CurrencyCode, CustomerInfo, CustomerInfoError, IdentityId, NewOrder, OrderId,
    Price, PriceError,
};

use crate::db::{OrderStore, RepositoryError};
use crate::payments::{CheckoutSessionRequest, PaymentError, PaymentGateway, SessionLineItem};

/// Body of `POST /createCheckoutSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// A missing list is treated as an empty cart.
    #[serde(default)]
    pub items: Cart,
    pub customer_info: CustomerInfo,
}

/// Reply to a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Where the hosted payment page sends the shopper afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrls {
    pub success: String,
    pub cancel: String,
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid cart: {0}")]
    InvalidCart(#[from] CartError),

    #[error("invalid customer info: {0}")]
    InvalidCustomer(#[from] CustomerInfoError),

    /// A line price cannot be expressed in minor units.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("failed to persist order: {0}")]
    Repository(#[from] RepositoryError),

    /// The order was saved but the processor did not open a session.
    #[error("failed to create payment session: {0}")]
    PaymentSession(#[from] PaymentError),
}

impl CheckoutError {
    /// Whether the shopper sent something unusable (as opposed to a server fault).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCart(_) | Self::InvalidCustomer(_) | Self::InvalidPrice(_)
        )
    }
}

/// Creates orders and hands them to the payment processor.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    currency: CurrencyCode,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentGateway>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            orders,
            payments,
            currency,
        }
    }

    /// Create a pending order and open its payment session.
    ///
    /// # Errors
    ///
    /// Validation errors are returned before anything is written. If the
    /// processor fails after the order is saved, the order stays `pending`
    /// and [`CheckoutError::PaymentSession`] is returned.
    #[instrument(
        skip(self, request, redirects),
        fields(lines = request.items.items().len(), user_id = user_id.as_ref().map(IdentityId::as_str))
    )]
    pub async fn create_checkout(
        &self,
        request: CheckoutRequest,
        user_id: Option<IdentityId>,
        redirects: RedirectUrls,
    ) -> Result<CheckoutResponse, CheckoutError> {
        request.customer_info.validate()?;
        let new_order = NewOrder::new(
            request.items.into_items(),
            request.customer_info,
            user_id,
            self.currency,
        )?;
        let line_items = self.line_items(&new_order)?;
        let customer_email = Some(new_order.customer_info().email.clone());

        let order = self.orders.create(new_order).await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Created pending order");

        let session = self
            .payments
            .create_checkout_session(&CheckoutSessionRequest {
                order_id: order.id,
                currency: self.currency,
                line_items,
                success_url: redirects.success,
                cancel_url: redirects.cancel,
                customer_email,
            })
            .await
            .inspect_err(|e| {
                tracing::error!(order_id = %order.id, error = %e, "Payment session creation failed; order left pending");
            })?;

        if let Err(e) = self.orders.set_payment_session(order.id, &session.id).await {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to record payment session id");
        }

        Ok(CheckoutResponse {
            session_id: session.id,
            order_id: order.id,
            url: session.url,
        })
    }

    fn line_items(&self, order: &NewOrder) -> Result<Vec<SessionLineItem>, PriceError> {
        order
            .items()
            .iter()
            .map(|item| {
                Ok(SessionLineItem {
                    name: item.name.trim().to_string(),
                    unit_amount: Price::new(item.unit_price, self.currency).minor_units()?,
                    quantity: item.quantity,
                    image_url: Some(item.image_url.trim())
                        .filter(|url| !url.is_empty())
                        .map(str::to_string),
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;
    use wovry_core::{CartItem, Email, OrderStatus};

    use super::*;
    use crate::db::InMemoryOrderStore;
    use crate::payments::CheckoutSession;

    #[derive(Default)]
    struct RecordingGateway {
        requests: Mutex<Vec<CheckoutSessionRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_checkout_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            self.requests.lock().await.push(request.clone());
            if self.fail {
                return Err(PaymentError::Api {
                    status: 402,
                    message: "card_declined".to_string(),
                });
            }
            Ok(CheckoutSession {
                id: "cs_test_1".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
            })
        }
    }

    fn item(price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            product_id: None,
            name: "Chunky beanie".to_string(),
            unit_price: price,
            quantity,
            image_url: String::new(),
        }
    }

    fn request(items: Vec<CartItem>) -> CheckoutRequest {
        CheckoutRequest {
            items: Cart::from_items(items),
            customer_info: CustomerInfo {
                name: "Meera".to_string(),
                email: Email::parse("meera@example.in").unwrap(),
                phone: String::new(),
                address: String::new(),
                city: String::new(),
                state: String::new(),
                zip: String::new(),
            },
        }
    }

    fn redirects() -> RedirectUrls {
        RedirectUrls {
            success: "https://wovry.shop/payment-success.html".to_string(),
            cancel: "https://wovry.shop/payment-cancel.html".to_string(),
        }
    }

    fn service(
        gateway: Arc<RecordingGateway>,
    ) -> (CheckoutService, Arc<InMemoryOrderStore>) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let service = CheckoutService::new(orders.clone(), gateway, CurrencyCode::INR);
        (service, orders)
    }

    #[tokio::test]
    async fn test_checkout_persists_pending_order_and_tags_session() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, orders) = service(gateway.clone());

        let response = service
            .create_checkout(
                request(vec![
                    item(Decimal::from(500), 2),
                    item(Decimal::from(1200), 1),
                ]),
                None,
                redirects(),
            )
            .await
            .unwrap();

        assert_eq!(response.session_id, "cs_test_1");
        let order = orders.get(response.order_id).await.unwrap().unwrap();
        assert_eq!(order.total, Decimal::from(2200));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_session_id.as_deref(), Some("cs_test_1"));

        let requests = gateway.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].order_id, response.order_id);
        assert_eq!(requests[0].line_items[0].unit_amount, 50_000);
        assert!(requests[0].line_items[0].image_url.is_none());
    }

    #[tokio::test]
    async fn test_empty_cart_has_no_side_effects() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, orders) = service(gateway.clone());

        let err = service
            .create_checkout(request(Vec::new()), None, redirects())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidCart(CartError::Empty)));
        assert!(err.is_client_error());
        assert!(orders.is_empty().await);
        assert!(gateway.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_price_rejected_before_persisting() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, orders) = service(gateway.clone());

        for price in [Decimal::MAX, Decimal::from(10_i64.pow(13))] {
            let err = service
                .create_checkout(request(vec![item(price, 1)]), None, redirects())
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                CheckoutError::InvalidCart(CartError::PriceTooLarge { index: 0, .. })
            ));
            assert!(err.is_client_error());
        }
        assert!(orders.is_empty().await);
        assert!(gateway.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_sub_minor_unit_price_rejected_before_persisting() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, orders) = service(gateway.clone());

        let err = service
            .create_checkout(
                request(vec![item(Decimal::new(5, 3), 1000)]),
                None,
                redirects(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InvalidCart(CartError::SubMinorUnitPrice { index: 0 })
        ));
        assert!(err.is_client_error());
        assert!(orders.is_empty().await);
        assert!(gateway.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_amount_charged_equals_order_total() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, orders) = service(gateway.clone());

        let response = service
            .create_checkout(
                request(vec![
                    item(Decimal::new(1999, 2), 3),
                    item(Decimal::new(45_050, 3), 2),
                ]),
                None,
                redirects(),
            )
            .await
            .unwrap();

        let order = orders.get(response.order_id).await.unwrap().unwrap();
        let charged: i64 = gateway.requests.lock().await[0]
            .line_items
            .iter()
            .map(|line| line.unit_amount * i64::from(line.quantity))
            .sum();
        assert_eq!(Decimal::new(charged, 2), order.total);
        assert_eq!(order.total, Decimal::new(15_007, 2));
    }

    #[tokio::test]
    async fn test_processor_failure_leaves_order_pending() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..RecordingGateway::default()
        });
        let (service, orders) = service(gateway);

        let err = service
            .create_checkout(
                request(vec![item(Decimal::from(300), 1)]),
                Some(IdentityId::from("uid-7")),
                redirects(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentSession(_)));
        assert!(!err.is_client_error());
        let pending = orders.list(Some(OrderStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, Some(IdentityId::from("uid-7")));
        assert!(pending[0].payment_session_id.is_none());
    }
}
