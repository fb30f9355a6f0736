//! Authentication provider integration.
//!
//! Sign-in happens in the browser against the provider. The server only
//! verifies the ID tokens it is handed and, for the admin dashboard, lists
//! identities.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

use wovry_core::{IdentityId, IdentitySummary};

pub use client::IdentityToolkitClient;

/// Most identities returned by one listing call.
pub const MAX_LISTED_IDENTITIES: u32 = 1000;

/// Errors that can occur when talking to the authentication provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token is malformed, expired, revoked or names no identity.
    #[error("invalid identity token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Verifies ID tokens and lists identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve an ID token to the identity it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidToken`] when the provider rejects the token.
    async fn verify_token(&self, token: &str) -> Result<IdentityId, IdentityError>;

    /// List up to `max` identities.
    async fn list_identities(&self, max: u32) -> Result<Vec<IdentitySummary>, IdentityError>;
}
