//! Request ID middleware for request tracing and correlation.
//!
//! Payment webhooks and checkout calls are matched up across the processor
//! dashboard and our logs by this id. An upstream `x-request-id` is reused
//! when it looks sane; otherwise a UUID v4 is generated. The id is:
//! - Stored as a [`RequestId`] request extension
//! - Recorded in the current tracing span
//! - Added to the Sentry scope for error correlation
//! - Returned in the response headers

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id we are willing to echo back.
const MAX_UPSTREAM_LEN: usize = 128;

/// The id assigned to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

fn accept_upstream(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let ok = !raw.is_empty()
        && raw.len() <= MAX_UPSTREAM_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
    ok.then_some(raw)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(accept_upstream)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_upstream() {
        assert_eq!(accept_upstream(" cf-8a1b:42 "), Some("cf-8a1b:42"));
        assert_eq!(accept_upstream(""), None);
        assert_eq!(accept_upstream("has space"), None);
        assert_eq!(accept_upstream("<script>"), None);
        assert_eq!(accept_upstream(&"a".repeat(MAX_UPSTREAM_LEN + 1)), None);
    }
}
