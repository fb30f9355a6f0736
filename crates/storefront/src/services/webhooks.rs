//! Payment webhook reconciliation.
//!
//! Authenticates a Stripe delivery, picks out checkout completions, and moves
//! the referenced order from `pending` to `paid`. The first transition fires
//! the order confirmation email.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use wovry_core::{OrderId, PaymentTransition};

use super::notifications::Notifier;
use crate::config::StripeConfig;
use crate::db::{OrderStore, RepositoryError};
use crate::payments::webhook::{SignatureError, StripeEvent, StripeEventType, verify_signature};

/// What a delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order moved to `paid`.
    Paid(OrderId),
    /// The order was already `paid`; nothing changed.
    AlreadyPaid(OrderId),
    /// The correlation id names no order.
    UnknownOrder(String),
    /// A completed session whose funds have not settled yet.
    AwaitingPayment(String),
    /// An event type the storefront does not act on.
    Ignored(String),
    /// Persisting the transition failed; acknowledged by policy.
    ReconcileFailed(OrderId),
}

impl WebhookOutcome {
    /// Short name reported back to the processor in the acknowledgement.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paid(_) => "paid",
            Self::AlreadyPaid(_) => "already_paid",
            Self::UnknownOrder(_) => "unknown_order",
            Self::AwaitingPayment(_) => "awaiting_payment",
            Self::Ignored(_) => "ignored",
            Self::ReconcileFailed(_) => "reconcile_failed",
        }
    }
}

/// Why a delivery was rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("checkout session has no order reference")]
    MissingCorrelation,

    /// Only returned when reconciliation failures are not acknowledged.
    #[error("no order matches reference {0}")]
    UnknownOrder(String),

    /// Only returned when reconciliation failures are not acknowledged.
    #[error("failed to reconcile order {order_id}: {source}")]
    Reconcile {
        order_id: OrderId,
        #[source]
        source: RepositoryError,
    },
}

impl WebhookError {
    /// Whether the processor sent something it should not resend as-is.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Signature(_) | Self::MalformedEvent(_) | Self::MissingCorrelation
        )
    }
}

/// Applies payment confirmations to orders.
#[derive(Clone)]
pub struct WebhookService {
    orders: Arc<dyn OrderStore>,
    notifier: Notifier,
    secret: SecretString,
    tolerance: Duration,
    ack_reconcile_failures: bool,
}

impl WebhookService {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>, notifier: Notifier, config: &StripeConfig) -> Self {
        Self {
            orders,
            notifier,
            secret: config.webhook_secret.clone(),
            tolerance: config.webhook_tolerance,
            ack_reconcile_failures: config.ack_reconcile_failures,
        }
    }

    /// Handle one delivery. `now` is the current unix time in seconds.
    ///
    /// # Errors
    ///
    /// Signature, parsing and correlation failures are always errors. Unknown
    /// orders and store failures are errors only when the acknowledgment
    /// policy is off; otherwise they are logged and reported as outcomes.
    #[instrument(skip_all, fields(event_id, event_type))]
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<WebhookOutcome, WebhookError> {
        let header = signature.ok_or(SignatureError::MissingHeader)?;
        verify_signature(payload, header, &self.secret, self.tolerance, now).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook with bad signature");
        })?;

        let event = StripeEvent::from_bytes(payload)?;
        let span = tracing::Span::current();
        span.record("event_id", event.id.as_str());
        span.record("event_type", event.event_type.as_str());

        let event_type = event.typed_event_type();
        if !matches!(
            event_type,
            StripeEventType::CheckoutSessionCompleted
                | StripeEventType::CheckoutSessionAsyncPaymentSucceeded
        ) {
            tracing::debug!("Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored(event.event_type));
        }

        let session = event.checkout_session()?;
        if event_type == StripeEventType::CheckoutSessionCompleted && !session.is_settled() {
            tracing::info!(session_id = %session.id, "Checkout completed but payment not settled yet");
            return Ok(WebhookOutcome::AwaitingPayment(session.id));
        }

        let reference = session
            .order_reference()
            .ok_or(WebhookError::MissingCorrelation)?;

        let Ok(order_id) = reference.parse::<OrderId>() else {
            return self.unknown_order(reference);
        };

        match self.orders.mark_paid(order_id).await {
            Ok(PaymentTransition::Transitioned) => {
                tracing::info!(order_id = %order_id, session_id = %session.id, "Order marked paid");
                self.confirm(order_id).await;
                Ok(WebhookOutcome::Paid(order_id))
            }
            Ok(PaymentTransition::AlreadyPaid) => {
                tracing::info!(order_id = %order_id, "Order already paid, ignoring redelivery");
                Ok(WebhookOutcome::AlreadyPaid(order_id))
            }
            Err(RepositoryError::NotFound) => self.unknown_order(reference),
            Err(source) => {
                tracing::error!(order_id = %order_id, error = %source, "Failed to mark order paid");
                if self.ack_reconcile_failures {
                    Ok(WebhookOutcome::ReconcileFailed(order_id))
                } else {
                    Err(WebhookError::Reconcile { order_id, source })
                }
            }
        }
    }

    fn unknown_order(&self, reference: &str) -> Result<WebhookOutcome, WebhookError> {
        tracing::error!(reference = %reference, "Payment confirmed for unknown order");
        if self.ack_reconcile_failures {
            Ok(WebhookOutcome::UnknownOrder(reference.to_string()))
        } else {
            Err(WebhookError::UnknownOrder(reference.to_string()))
        }
    }

    async fn confirm(&self, order_id: OrderId) {
        match self.orders.get(order_id).await {
            Ok(Some(order)) => {
                self.notifier.order_paid(order);
            }
            Ok(None) => {
                tracing::warn!(order_id = %order_id, "Paid order vanished before confirmation");
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to load paid order for confirmation");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use wovry_core::{CartItem, CurrencyCode, CustomerInfo, Email, NewOrder, OrderStatus};

    use super::*;
    use crate::db::InMemoryOrderStore;
    use crate::payments::webhook::compute_signature;

    const NOW: i64 = 1_767_225_600;

    fn config(ack: bool) -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_51HxYzQaBcDeFgHiJkLmNoP"),
            webhook_secret: SecretString::from("whsec_Qm8vT2xLp4Rz"),
            currency: CurrencyCode::INR,
            api_base: "https://api.stripe.com".to_string(),
            webhook_tolerance: Duration::from_secs(300),
            ack_reconcile_failures: ack,
        }
    }

    fn signed(payload: &str, config: &StripeConfig) -> String {
        format!(
            "t={NOW},v1={}",
            compute_signature(NOW, payload.as_bytes(), &config.webhook_secret)
        )
    }

    fn event(event_type: &str, payment_status: &str, order_ref: Option<&str>) -> String {
        let metadata = order_ref.map_or_else(
            || "{}".to_string(),
            |r| format!(r#"{{"orderId":"{r}"}}"#),
        );
        format!(
            r#"{{"id":"evt_1","type":"{event_type}","created":{NOW},"data":{{"object":{{"id":"cs_1","payment_status":"{payment_status}","metadata":{metadata}}}}}}}"#
        )
    }

    async fn pending_order(store: &InMemoryOrderStore) -> OrderId {
        let order = NewOrder::new(
            vec![CartItem {
                product_id: None,
                name: "Sock yarn".to_string(),
                unit_price: Decimal::from(350),
                quantity: 1,
                image_url: String::new(),
            }],
            CustomerInfo {
                name: "Kabir".to_string(),
                email: Email::parse("kabir@example.in").unwrap(),
                phone: String::new(),
                address: String::new(),
                city: String::new(),
                state: String::new(),
                zip: String::new(),
            },
            None,
            CurrencyCode::INR,
        )
        .unwrap()
        .into_order(OrderId::generate(), Utc::now());
        let id = order.id;
        store.insert(order).await;
        id
    }

    fn service(store: &Arc<InMemoryOrderStore>, ack: bool) -> WebhookService {
        WebhookService::new(store.clone(), Notifier::default(), &config(ack))
    }

    #[tokio::test]
    async fn test_completion_marks_paid_once() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let service = service(&store, true);

        let body = event("checkout.session.completed", "paid", Some(&id.to_string()));
        let header = signed(&body, &config(true));

        let first = service.handle(body.as_bytes(), Some(&header), NOW).await;
        let second = service.handle(body.as_bytes(), Some(&header), NOW).await;

        assert_eq!(first.unwrap(), WebhookOutcome::Paid(id));
        assert_eq!(second.unwrap(), WebhookOutcome::AlreadyPaid(id));
        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_bad_signature_mutates_nothing() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let service = service(&store, true);

        let body = event("checkout.session.completed", "paid", Some(&id.to_string()));
        let forged = format!("t={NOW},v1={}", "0".repeat(64));

        let err = service
            .handle(body.as_bytes(), Some(&forged), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Signature(SignatureError::Mismatch)));

        let err = service.handle(body.as_bytes(), None, NOW).await.unwrap_err();
        assert!(matches!(
            err,
            WebhookError::Signature(SignatureError::MissingHeader)
        ));

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_correlation_differs_from_unknown_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let service = service(&store, true);

        let body = event("checkout.session.completed", "paid", None);
        let err = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(true))), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingCorrelation));
        assert!(err.is_client_error());

        let stranger = OrderId::generate().to_string();
        let body = event("checkout.session.completed", "paid", Some(&stranger));
        let outcome = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(true))), NOW)
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::UnknownOrder(stranger));
    }

    #[tokio::test]
    async fn test_unknown_order_is_error_when_not_acknowledging() {
        let store = Arc::new(InMemoryOrderStore::new());
        let service = service(&store, false);

        let body = event("checkout.session.completed", "paid", Some("not-a-uuid"));
        let err = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(false))), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnknownOrder(ref r) if r == "not-a-uuid"));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_unpaid_completion_waits_for_async_success() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let service = service(&store, true);

        let body = event("checkout.session.completed", "unpaid", Some(&id.to_string()));
        let outcome = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(true))), NOW)
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::AwaitingPayment("cs_1".to_string()));
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );

        let body = event(
            "checkout.session.async_payment_succeeded",
            "paid",
            Some(&id.to_string()),
        );
        let outcome = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(true))), NOW)
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Paid(id));
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let store = Arc::new(InMemoryOrderStore::new());
        let service = service(&store, true);

        let body = event("checkout.session.expired", "unpaid", Some("whatever"));
        let outcome = service
            .handle(body.as_bytes(), Some(&signed(&body, &config(true))), NOW)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored("checkout.session.expired".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_event() {
        let store = Arc::new(InMemoryOrderStore::new());
        let service = service(&store, true);

        let body = "{not json";
        let err = service
            .handle(body.as_bytes(), Some(&signed(body, &config(true))), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedEvent(_)));
    }

    #[test]
    fn test_outcome_names_are_distinct() {
        let id = OrderId::generate();
        let names = [
            WebhookOutcome::Paid(id),
            WebhookOutcome::AlreadyPaid(id),
            WebhookOutcome::UnknownOrder("missing".to_string()),
            WebhookOutcome::AwaitingPayment("cs_1".to_string()),
            WebhookOutcome::Ignored("charge.refunded".to_string()),
            WebhookOutcome::ReconcileFailed(id),
        ]
        .map(|outcome| outcome.as_str());

        assert_eq!(names[0], "paid");
        assert_eq!(names[1], "already_paid");
        assert_eq!(names[2], "unknown_order");
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
