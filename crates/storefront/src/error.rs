//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Bodies are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AdminError, CheckoutError, NewsletterError, WebhookError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Newsletter error: {0}")]
    Newsletter(#[from] NewsletterError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to see this. The reason is logged, never sent.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// A dependency needed to serve the request is down.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Webhook(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Newsletter(NewsletterError::InvalidEmail(_))
            | Self::Admin(AdminError::InvalidProduct(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Admin(AdminError::ProductNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_)
            | Self::Checkout(_)
            | Self::Webhook(_)
            | Self::Newsletter(_)
            | Self::Admin(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Level this error is logged at.
    ///
    /// Server faults are errors; forbidden requests are info so they land as
    /// breadcrumbs rather than Sentry events.
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.status().is_server_error() {
            tracing::Level::ERROR
        } else if matches!(self, Self::Forbidden(_)) {
            tracing::Level::INFO
        } else {
            tracing::Level::DEBUG
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Checkout(err) if err.is_client_error() => err.to_string(),
            Self::Checkout(CheckoutError::PaymentSession(_)) => {
                "Failed to create payment session".to_string()
            }
            Self::Webhook(err) if err.is_client_error() => format!("Webhook Error: {err}"),
            Self::Newsletter(NewsletterError::InvalidEmail(_)) => {
                "A valid email is required".to_string()
            }
            Self::Admin(err @ (AdminError::InvalidProduct(_) | AdminError::ProductNotFound)) => {
                err.to_string()
            }
            Self::Forbidden(_) => "Forbidden".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
            Self::Unavailable(_) => "Service unavailable".to_string(),
            // Don't expose internal error details to clients
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self.log_level() {
            // Capture server errors to Sentry
            tracing::Level::ERROR => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Request error"
                );
            }
            tracing::Level::INFO => tracing::info!(error = %self, "Request forbidden"),
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a verified identity.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for a business event.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order created", Some(&[("order_id", "…")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
