//! Signed-in customer routes.

use axum::{Json, extract::State};
use tracing::instrument;

use wovry_core::Order;

use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::state::AppState;

/// The caller's order history, newest first.
///
/// `GET /api/account/orders`
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireIdentity(user_id): RequireIdentity,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_for_user(&user_id).await?))
}
