//! Payment processor webhook handler.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::payments::webhook::SIGNATURE_HEADER;
use crate::services::WebhookOutcome;
use crate::state::AppState;

/// Receive a Stripe event.
///
/// `POST /stripeWebhook`
///
/// The body is taken raw: the signature covers the exact bytes sent.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .webhooks()
        .handle(&body, signature, Utc::now().timestamp())
        .await?;

    let processed = matches!(outcome, WebhookOutcome::Paid(_));
    Ok(Json(json!({
        "received": true,
        "processed": processed,
        "outcome": outcome.as_str(),
    })))
}
