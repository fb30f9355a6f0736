//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (pings the database)
//!
//! # Checkout
//! POST   /createCheckoutSession       - Pending order + hosted payment session
//! POST   /stripeWebhook               - Payment confirmation (signed)
//!
//! # Catalog
//! GET    /api/products                - Filtered, sorted, paged listing
//! GET    /api/products/featured       - Featured strip
//! GET    /api/products/facets         - Categories, sizes, colors
//! GET    /api/products/{id}           - Product detail
//! GET    /api/products/{id}/related   - Same-category strip
//!
//! # Newsletter
//! POST   /api/newsletter              - Subscribe (welcome email on first signup)
//!
//! # Account (bearer token)
//! GET    /api/account/orders          - Caller's orders
//!
//! # Admin (bearer token of an admin identity)
//! GET    /listUsers                   - Identity listing
//! GET    /api/admin/orders            - All orders
//! POST   /api/admin/products          - Create product
//! PUT    /api/admin/products/{id}     - Update product
//! DELETE /api/admin/products/{id}     - Delete product
//! ```

pub mod account;
pub mod admin;
pub mod checkout;
pub mod extract;
pub mod health;
pub mod newsletter;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/featured", get(products::featured))
        .route("/facets", get(products::facets))
        .route("/{id}", get(products::show))
        .route("/{id}/related", get(products::related))
}

/// Create the admin API routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route(
            "/createCheckoutSession",
            post(checkout::create_checkout_session),
        )
        .route("/stripeWebhook", post(webhooks::stripe_webhook))
        .route("/listUsers", get(admin::list_users))
        .route("/api/newsletter", post(newsletter::subscribe))
        .route("/api/account/orders", get(account::orders))
        .nest("/api/products", product_routes())
        .nest("/api/admin", admin_routes())
}

/// CORS for the configured storefront origins.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config()
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Skipping unusable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// The complete application: routes, JSON fallbacks and the middleware stack.
///
/// Sentry layers are added by the binary so tests can run without a hub.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state);

    routes()
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}
