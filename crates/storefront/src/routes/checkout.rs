//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::ORIGIN},
};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalIdentity;
use crate::routes::extract::ApiJson;
use crate::services::{CheckoutRequest, CheckoutResponse, RedirectUrls};
use crate::state::AppState;

/// Create a pending order and a hosted payment session for it.
///
/// `POST /createCheckoutSession`
#[instrument(skip_all)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    OptionalIdentity(user_id): OptionalIdentity,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let config = state.config();
    let origin = config.redirect_origin(headers.get(ORIGIN).and_then(|v| v.to_str().ok()));
    let redirects = RedirectUrls {
        success: config.checkout.success_url(origin),
        cancel: config.checkout.cancel_url(origin),
    };

    let response = state
        .checkout()
        .create_checkout(request, user_id, redirects)
        .await?;

    let order_id = response.order_id.to_string();
    add_breadcrumb(
        "checkout",
        "Payment session created",
        Some(&[("order_id", order_id.as_str())]),
    );

    Ok(Json(response))
}
