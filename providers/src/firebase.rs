//! Firebase Authentication: turn a bearer ID token into a uid.
//!
//! Tokens are checked server-side with the Identity Toolkit `accounts:lookup`
//! call, which rejects expired, revoked, or forged tokens.

use async_trait::async_trait;
use serde::Deserialize;

use ltc_types::Uid;

use crate::{http_client, transport_error, ProviderError};

/// Public Identity Toolkit endpoint.
pub const DEFAULT_IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com";

/// Who a valid token belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: Uid,
    pub email: Option<String>,
}

/// Resolves an ID token to the identity it was issued for.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ProviderError>;
}

/// [`TokenVerifier`] backed by Firebase's `accounts:lookup` endpoint.
pub struct FirebaseTokenVerifier {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl FirebaseTokenVerifier {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_IDENTITY_BASE)
    }

    /// Point the verifier at a different host (emulator or test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("firebase api key"));
        }
        if id_token.is_empty() {
            return Err(ProviderError::InvalidToken);
        }

        let url = format!(
            "{}/v1/accounts:lookup?key={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        );
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            // Identity Toolkit answers 400 INVALID_ID_TOKEN / TOKEN_EXPIRED.
            return Err(ProviderError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let lookup: LookupResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse lookup response: {e}"))
        })?;
        identity_from_lookup(lookup)
    }
}

fn identity_from_lookup(lookup: LookupResponse) -> Result<VerifiedIdentity, ProviderError> {
    let user = lookup
        .users
        .into_iter()
        .next()
        .ok_or(ProviderError::InvalidToken)?;
    let uid = Uid::parse(user.local_id)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    Ok(VerifiedIdentity {
        uid,
        email: user.email,
    })
}
