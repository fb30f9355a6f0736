//! Stripe webhook authentication and event types.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`. The MAC is
//! HMAC-SHA256 over `"<t>.<raw body>"` keyed with the endpoint secret.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Metadata key linking a checkout session to its order.
pub const ORDER_ID_METADATA_KEY: &str = "orderId";

type HmacSha256 = Hmac<Sha256>;

/// Why a webhook delivery failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("signature header has no timestamp")]
    MissingTimestamp,
    #[error("signature header has no v1 signatures")]
    MissingSignature,
    #[error("signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    Mismatch,
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
#[must_use]
pub fn compute_signature(timestamp: i64, payload: &[u8], secret: &SecretString) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// `now` is the current unix time in seconds. Every `v1` entry is tried, so
/// deliveries signed during a secret rotation still verify.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing the first problem found.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if now.saturating_sub(timestamp).abs() > tolerance {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let expected = compute_signature(timestamp, payload, secret);
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Stripe event types this storefront distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
    /// Anything else; acknowledged and ignored.
    Unknown,
}

impl FromStr for StripeEventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                Self::CheckoutSessionAsyncPaymentSucceeded
            }
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            _ => Self::Unknown,
        })
    }
}

/// Generic Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Other,
}

/// The fields of a checkout session object the storefront reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// The order id echoed back from session metadata, if present and non-blank.
    #[must_use]
    pub fn order_reference(&self) -> Option<&str> {
        self.metadata
            .get(ORDER_ID_METADATA_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Whether funds are confirmed. An absent status counts as confirmed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(
            self.payment_status,
            Some(PaymentStatus::Unpaid | PaymentStatus::Other)
        )
    }
}

impl StripeEvent {
    /// Parse from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body is not a Stripe event envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The typed event type.
    #[must_use]
    pub fn typed_event_type(&self) -> StripeEventType {
        match StripeEventType::from_str(&self.event_type) {
            Ok(event_type) => event_type,
            Err(never) => match never {},
        }
    }

    /// Interpret the event object as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the object is not a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, serde_json::Error> {
        CheckoutSessionObject::deserialize(&self.data.object)
    }
}
