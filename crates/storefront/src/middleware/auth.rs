//! Bearer-token identity extractors.
//!
//! The browser signs in against the authentication provider and sends the
//! resulting ID token as `Authorization: Bearer <token>`. These extractors
//! verify it with the provider.
//!
//! Every rejection is a bare 403 so callers learn nothing about why.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use wovry_core::IdentityId;

use crate::error::{AppError, set_sentry_user};
use crate::identity::IdentityError;
use crate::state::AppState;

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn verify(parts: &Parts, state: &AppState) -> Result<IdentityId, AppError> {
    let token = bearer_token(parts)
        .ok_or_else(|| AppError::Forbidden("missing or non-bearer authorization".to_string()))?;

    match state.identity().verify_token(token).await {
        Ok(id) => {
            set_sentry_user(&id);
            Ok(id)
        }
        Err(IdentityError::InvalidToken) => {
            Err(AppError::Forbidden("invalid identity token".to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Identity provider failed to verify token");
            Err(AppError::Forbidden(format!("token verification failed: {e}")))
        }
    }
}

/// Extractor that requires a verified identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireIdentity(uid): RequireIdentity) -> impl IntoResponse {
///     format!("orders for {uid}")
/// }
/// ```
pub struct RequireIdentity(pub IdentityId);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify(parts, state).await.map(Self)
    }
}

/// Extractor that verifies a bearer token when one is sent.
///
/// Unlike `RequireIdentity`, a missing or bad token yields `None` instead of
/// rejecting, so guests can still check out.
pub struct OptionalIdentity(pub Option<IdentityId>);

impl FromRequestParts<AppState> for OptionalIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(AUTHORIZATION).is_none() {
            return Ok(Self(None));
        }

        match verify(parts, state).await {
            Ok(id) => Ok(Self(Some(id))),
            Err(e) => {
                tracing::info!(error = %e, "Ignoring unverifiable token, continuing as guest");
                Ok(Self(None))
            }
        }
    }
}

/// Extractor that requires a verified identity in the admin set.
pub struct RequireAdmin(pub IdentityId);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = verify(parts, state).await?;
        if !state.config().identity.is_admin(&id) {
            return Err(AppError::Forbidden("caller is not an administrator".to_string()));
        }
        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/listUsers");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwdw=="))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
