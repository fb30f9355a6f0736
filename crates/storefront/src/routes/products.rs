//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use wovry_core::{Product, ProductFacets, ProductId, ProductQuery, ProductSort, parse_tag_list};

use crate::error::{AppError, Result};
use crate::routes::extract::ApiQuery;
use crate::state::AppState;

/// Catalog listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub category: Option<String>,
    pub max_price: Option<Decimal>,
    /// Comma-separated; products must offer all of them.
    pub sizes: Option<String>,
    /// Comma-separated; products must offer all of them.
    pub colors: Option<String>,
    pub q: Option<String>,
    pub sort: Option<ProductSort>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ProductListParams> for ProductQuery {
    fn from(params: ProductListParams) -> Self {
        let query = Self {
            category: params
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty() && c != "all"),
            max_price: params.max_price,
            sizes: params.sizes.as_deref().map(parse_tag_list).unwrap_or_default(),
            colors: params.colors.as_deref().map(parse_tag_list).unwrap_or_default(),
            search: params.q,
            sort: params.sort.unwrap_or_default(),
            offset: params.offset.unwrap_or(0),
            ..Self::default()
        };
        match params.limit {
            Some(limit) => query.with_limit(limit),
            None => query,
        }
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Product".to_string()))
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ProductListParams>,
) -> Result<Json<Vec<Product>>> {
    let query = ProductQuery::from(params);
    Ok(Json(state.products().query(&query).await?))
}

/// `GET /api/products/featured`
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products().query(&ProductQuery::featured()).await?))
}

/// `GET /api/products/facets`
#[instrument(skip(state))]
pub async fn facets(State(state): State<AppState>) -> Result<Json<ProductFacets>> {
    Ok(Json(state.products().facets().await?))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    state
        .products()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// `GET /api/products/{id}/related`
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let id = parse_product_id(&id)?;
    let product = state
        .products()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(Json(
        state
            .products()
            .query(&ProductQuery::related_to(&product))
            .await?,
    ))
}
