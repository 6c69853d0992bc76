//! Bearer-token authentication for caller-scoped routes.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::warn;

use ltc_providers::{ProviderError, VerifiedIdentity};

use crate::{ApiError, AppState};

/// The authenticated caller. Extracting it verifies the
/// `Authorization: Bearer <id token>` header against the identity provider.
#[derive(Clone, Debug)]
pub struct Caller(pub VerifiedIdentity);

/// The token part of a `Bearer` authorization header, if well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        match state.identity.verify(token).await {
            Ok(identity) => Ok(Caller(identity)),
            Err(ProviderError::InvalidToken) => Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(error = %e, "identity provider lookup failed");
                Err(ApiError::Upstream(e.to_string()))
            }
        }
    }
}
