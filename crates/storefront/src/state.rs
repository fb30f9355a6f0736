//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    OrderStore, PgOrderStore, PgProductStore, PgSubscriberStore, ProductStore, SubscriberStore,
};
use crate::identity::{IdentityError, IdentityProvider, IdentityToolkitClient};
use crate::payments::{PaymentError, PaymentGateway, StripeClient};
use crate::services::{
    AdminService, CheckoutService, EmailService, Mailer, NewsletterService, Notifier,
    WebhookService,
};

/// Error wiring up the production collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// The external systems the storefront talks to.
///
/// Production wiring comes from [`Collaborators::connect`]; tests assemble
/// this by hand from in-memory stores and fakes.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderStore>,
    pub products: Arc<dyn ProductStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when SMTP is not configured.
    pub mailer: Option<Arc<dyn Mailer>>,
}

impl Collaborators {
    /// `PostgreSQL` stores plus the Stripe, Identity Toolkit and SMTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the SMTP relay cannot be built.
    pub fn connect(config: &StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer: Option<Arc<dyn Mailer>> = match &config.email {
            Some(email) => Some(Arc::new(EmailService::new(
                email,
                &config.base_url,
                config.stripe.currency,
            )?)),
            None => None,
        };

        Ok(Self {
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            products: Arc::new(PgProductStore::new(pool.clone())),
            subscribers: Arc::new(PgSubscriberStore::new(pool)),
            payments: Arc::new(StripeClient::new(&config.stripe)?),
            identity: Arc::new(IdentityToolkitClient::new(&config.identity)?),
            mailer,
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration, collaborators and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    identity: Arc<dyn IdentityProvider>,
    checkout: CheckoutService,
    webhooks: WebhookService,
    newsletter: NewsletterService,
    admin: AdminService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            orders,
            products,
            subscribers,
            payments,
            identity,
            mailer,
        } = collaborators;

        let notifier = Notifier::new(mailer);
        if !notifier.is_enabled() {
            tracing::warn!("SMTP not configured; welcome and confirmation emails are disabled");
        }

        let checkout = CheckoutService::new(orders.clone(), payments, config.stripe.currency);
        let webhooks = WebhookService::new(orders.clone(), notifier.clone(), &config.stripe);
        let newsletter = NewsletterService::new(subscribers, notifier);
        let admin = AdminService::new(identity.clone(), orders.clone(), products.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orders,
                products,
                identity,
                checkout,
                webhooks,
                newsletter,
                admin,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.inner.products.as_ref()
    }

    /// The authentication provider used to verify bearer tokens.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn webhooks(&self) -> &WebhookService {
        &self.inner.webhooks
    }

    #[must_use]
    pub fn newsletter(&self) -> &NewsletterService {
        &self.inner.newsletter
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }
}
