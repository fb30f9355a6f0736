//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (allowed storefront origins)
//!
//! Identity checks are extractors, not layers: handlers opt in with
//! [`RequireIdentity`], [`OptionalIdentity`] or [`RequireAdmin`].

pub mod auth;
pub mod request_id;

pub use auth::{OptionalIdentity, RequireAdmin, RequireIdentity};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
