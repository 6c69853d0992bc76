//! Firebase Cloud Messaging HTTP v1 sender.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::push::{PushMessage, PushSender};
use crate::{http_client, transport_error, ProviderError};

/// Public FCM endpoint.
pub const DEFAULT_FCM_BASE: &str = "https://fcm.googleapis.com";

/// Sends notifications through `projects/{id}/messages:send`.
///
/// The OAuth access token is supplied by configuration; minting it from a
/// service account happens outside this process.
pub struct FcmSender {
    http: reqwest::Client,
    project_id: String,
    access_token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

impl FcmSender {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_base_url(project_id, access_token, DEFAULT_FCM_BASE)
    }

    pub fn with_base_url(
        project_id: impl Into<String>,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: http_client(),
            project_id: project_id.into(),
            access_token: access_token.into(),
            base_url: base_url.into(),
        }
    }
}

/// Request body for the v1 send call.
pub(crate) fn request_body(message: &PushMessage) -> Value {
    let mut webpush = json!({
        "notification": {
            "icon": "/favicon.ico",
            "badge": "/favicon.ico",
            "requireInteraction": false,
        }
    });
    if let Some(link) = &message.link {
        webpush["fcm_options"] = json!({ "link": link });
    }
    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "webpush": webpush,
        }
    })
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(&self, message: &PushMessage) -> Result<String, ProviderError> {
        if self.project_id.is_empty() || self.access_token.is_empty() {
            return Err(ProviderError::NotConfigured("fcm credentials"));
        }

        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url.trim_end_matches('/'),
            self.project_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request_body(message))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse send response: {e}"))
        })?;
        Ok(sent.name)
    }
}
