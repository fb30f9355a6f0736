//! Admin dashboard route handlers.
//!
//! Every handler takes [`RequireAdmin`], so a caller that is not in the
//! configured admin set gets a 403 before any collaborator is called.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use wovry_core::{IdentitySummary, Order, OrderStatus, Product, ProductDraft, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Optional order listing filter.
#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Product".to_string()))
}

/// `GET /listUsers`
#[instrument(skip_all, fields(admin = %admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<IdentitySummary>>> {
    Ok(Json(state.admin().list_identities().await?))
}

/// `GET /api/admin/orders`
#[instrument(skip_all, fields(admin = %admin))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(params): ApiQuery<OrderListParams>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.admin().list_orders(params.status).await?))
}

/// `POST /api/admin/products`
#[instrument(skip_all, fields(admin = %admin))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.admin().create_product(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip_all, fields(admin = %admin, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.admin().update_product(id, draft).await?))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip_all, fields(admin = %admin, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_product_id(&id)?;
    state.admin().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
