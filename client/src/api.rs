//! HTTP client for the verification API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::debug;

use ltc_types::VerificationStatus;

use crate::{ClientError, IdentityTokenProvider};

/// What the poller needs from one status lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationSnapshot {
    pub is_verified_21: bool,
    pub status: VerificationStatus,
}

impl VerificationSnapshot {
    pub fn pending() -> Self {
        Self {
            is_verified_21: false,
            status: VerificationStatus::Pending,
        }
    }

    pub fn approved() -> Self {
        Self {
            is_verified_21: true,
            status: VerificationStatus::Approved,
        }
    }
}

/// Anything that can report the signed-in user's verification status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<VerificationSnapshot, ClientError>;
}

/// `GET /auth/me` body. Only the fields the client acts on are decoded.
#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(deserialize_with = "flag")]
    is_verified_21: bool,
    #[serde(default)]
    verification_status: Option<String>,
}

/// Accepts `0`/`1` as well as `true`/`false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

/// The flag decides. The status string only refines a pending answer, and
/// an unknown string falls back to what the flag says.
impl From<MeResponse> for VerificationSnapshot {
    fn from(body: MeResponse) -> Self {
        if body.is_verified_21 {
            return Self::approved();
        }
        let status = match body.verification_status.as_deref().map(str::parse::<VerificationStatus>) {
            Some(Ok(VerificationStatus::Rejected)) => VerificationStatus::Rejected,
            Some(Err(_)) => {
                debug!(raw = ?body.verification_status, "unrecognised status; using flag");
                VerificationStatus::Pending
            }
            _ => VerificationStatus::Pending,
        };
        Self {
            is_verified_21: false,
            status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InquiryResponse {
    inquiry_id: String,
}

/// Talks to the verification API on behalf of the signed-in user.
///
/// Every call asks the token provider for a fresh token, so a token that
/// expired between polls never causes a spurious sign-out.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn IdentityTokenProvider>,
}

impl ApiClient {
    /// Create a client for the API at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn IdentityTokenProvider>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self.tokens.get_token(true).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ClientError::NotRegistered),
            status if !status.is_success() => Err(ClientError::Status(status.as_u16())),
            _ => Ok(response),
        }
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> Result<VerificationSnapshot, ClientError> {
        let response = self.send(self.http.get(self.url("/auth/me"))).await?;
        let body: MeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(body.into())
    }

    /// `POST /auth/register`
    pub async fn register(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), ClientError> {
        let body = json!({ "username": username, "email": email });
        self.send(self.http.post(self.url("/auth/register")).json(&body))
            .await
            .map(|_| ())
    }

    /// `POST /verify/persona/create-inquiry`. Returns the inquiry id to hand
    /// to the hosted verification flow.
    pub async fn create_inquiry(&self) -> Result<String, ClientError> {
        let response = self
            .send(self.http.post(self.url("/verify/persona/create-inquiry")))
            .await?;
        let body: InquiryResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(body.inquiry_id)
    }

    /// `POST /auth/update-fcm-token`
    pub async fn update_push_token(&self, fcm_token: &str) -> Result<(), ClientError> {
        let body = json!({ "fcmToken": fcm_token });
        self.send(self.http.post(self.url("/auth/update-fcm-token")).json(&body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self) -> Result<VerificationSnapshot, ClientError> {
        self.me().await
    }
}
