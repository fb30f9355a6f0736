//! Newsletter subscription route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::Subscription;
use crate::error::Result;
use crate::routes::extract::ApiJson;
use crate::services::SubscribeRequest;
use crate::state::AppState;

/// Subscribe an address to the newsletter.
///
/// `POST /api/newsletter`
///
/// 201 for a new subscriber (who gets the welcome email), 200 when the
/// address was already on the list.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    match state.newsletter().subscribe(&form.email).await? {
        Subscription::Created(subscriber) => Ok((
            StatusCode::CREATED,
            Json(json!({ "subscribed": true, "email": subscriber.email })),
        )),
        Subscription::Existing => Ok((
            StatusCode::OK,
            Json(json!({ "subscribed": true, "alreadySubscribed": true })),
        )),
    }
}
