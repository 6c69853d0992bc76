//! Persona inquiry creation.
//!
//! The inquiry is opened server-side with the user's uid as its
//! `reference-id`; Persona echoes that reference back in every webhook for
//! the inquiry, which is how the webhook finds the user again.

use async_trait::async_trait;
use serde::Deserialize;

use ltc_types::{InquiryId, Uid};

use crate::{http_client, transport_error, ProviderError};

/// Public Persona API host.
pub const DEFAULT_PERSONA_BASE: &str = "https://withpersona.com";

/// API version header value the request/response shapes below follow.
const PERSONA_VERSION: &str = "2023-01-05";

/// Opens a verification inquiry bound to a user.
#[async_trait]
pub trait InquiryCreator: Send + Sync {
    async fn create_inquiry(&self, reference: &Uid) -> Result<InquiryId, ProviderError>;
}

pub struct PersonaClient {
    http: reqwest::Client,
    api_key: String,
    template_id: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct InquiryEnvelope {
    data: InquiryData,
}

#[derive(Debug, Deserialize)]
struct InquiryData {
    id: String,
}

impl PersonaClient {
    pub fn new(api_key: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self::with_base_url(api_key, template_id, DEFAULT_PERSONA_BASE)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        template_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: http_client(),
            api_key: api_key.into(),
            template_id: template_id.into(),
            base_url: base_url.into(),
        }
    }
}

pub(crate) fn request_body(template_id: &str, reference: &Uid) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "attributes": {
                "inquiry-template-id": template_id,
                "reference-id": reference.as_str(),
            }
        }
    })
}

#[async_trait]
impl InquiryCreator for PersonaClient {
    async fn create_inquiry(&self, reference: &Uid) -> Result<InquiryId, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("persona api key"));
        }
        if self.template_id.is_empty() {
            return Err(ProviderError::NotConfigured("persona template id"));
        }

        let url = format!("{}/api/v1/inquiries", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Persona-Version", PERSONA_VERSION)
            .json(&request_body(&self.template_id, reference))
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

        let envelope: InquiryEnvelope = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse inquiry response: {e}"))
        })?;
        if envelope.data.id.is_empty() {
            return Err(ProviderError::InvalidResponse("empty inquiry id".into()));
        }
        tracing::debug!(reference = %reference, inquiry = %envelope.data.id, "persona inquiry created");
        Ok(InquiryId::new(envelope.data.id))
    }
}
