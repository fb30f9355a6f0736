//! Payment processor integration.
//!
//! - [`PaymentGateway`] - opens hosted checkout sessions
//! - [`stripe`] - the Stripe REST implementation
//! - [`webhook`] - signature verification and event parsing for Stripe webhooks

pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

use wovry_core::{CurrencyCode, Email, OrderId};

pub use stripe::StripeClient;

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One line of a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    /// Price per unit in the currency's minor unit (paise, cents).
    pub unit_amount: i64,
    pub quantity: u32,
    pub image_url: Option<String>,
}

/// Everything needed to open a checkout session for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Echoed back in the completion webhook as metadata `orderId`.
    pub order_id: OrderId,
    pub currency: CurrencyCode,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Prefills the email field on the hosted page.
    pub customer_email: Option<Email>,
}

/// A checkout session opened by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page, when the processor returns one.
    pub url: Option<String>,
}

/// Opens hosted checkout sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a one-off payment session.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the processor rejects or cannot be reached.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}
