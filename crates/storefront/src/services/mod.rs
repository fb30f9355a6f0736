//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `admin` - Identity listing, order listing and catalog writes
//! - `checkout` - Pending order creation and payment session handoff
//! - `email` - Transactional email via SMTP
//! - `newsletter` - Subscriber signup
//! - `notifications` - Fire-and-forget email dispatch
//! - `webhooks` - Payment confirmation reconciliation

pub mod admin;
pub mod checkout;
pub mod email;
pub mod newsletter;
pub mod notifications;
pub mod webhooks;

pub use admin::{AdminError, AdminService};
pub use checkout::{CheckoutError, CheckoutRequest, CheckoutResponse, CheckoutService, RedirectUrls};
pub use email::{EmailError, EmailService, Mailer};
pub use newsletter::{NewsletterError, NewsletterService, SubscribeRequest};
pub use notifications::Notifier;
pub use webhooks::{WebhookError, WebhookOutcome, WebhookService};
