//! Stripe API client for hosted checkout sessions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway};
use crate::config::StripeConfig;

/// Stripe API version the request and webhook shapes were written against.
const API_VERSION: &str = "2024-06-20";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let currency = request.currency.processor_code();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("metadata[orderId]".to_string(), request.order_id.to_string()),
        (
            "client_reference_id".to_string(),
            request.order_id.to_string(),
        ),
    ];

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.to_string()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image_url {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let response = self
            .client
            .post(&url)
            .form(&session_form(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}
