//! Persona webhook ingestion.
//!
//! The provider delivers at-least-once, so the handler is idempotent: the
//! signature is checked over the exact raw body, only `approved` events
//! mutate the store, and the mutation is a single atomic update keyed by the
//! uid the provider echoes back as `reference-id`. Re-delivery rewrites the
//! same values and never shifts `verified_at`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ltc_crypto::{verify_signature, SignatureError};
use ltc_providers::PushMessage;
use ltc_store::ApprovalOutcome;
use ltc_types::{InquiryId, Timestamp, Uid, VerificationRecord};

use crate::metrics::outcome;
use crate::{ApiError, AppState};

/// Header carrying the hex HMAC-SHA256 of the body.
pub const SIGNATURE_HEADER: &str = "persona-signature";

const APPROVED: &str = "approved";

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<InquiryData>,
}

#[derive(Debug, Default, Deserialize)]
struct InquiryData {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<InquiryAttributes>,
}

#[derive(Debug, Default, Deserialize)]
struct InquiryAttributes {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "reference-id")]
    reference_id: Option<String>,
}

/// The parts of an inquiry event this service acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InquiryEvent {
    pub reference: Uid,
    pub status: Option<String>,
    pub inquiry_id: Option<InquiryId>,
}

impl InquiryEvent {
    pub fn is_approved(&self) -> bool {
        self.status.as_deref() == Some(APPROVED)
    }
}

/// Parse a webhook body into an [`InquiryEvent`]. Fails with `BadRequest`
/// when the body is not JSON or carries no usable `reference-id`.
pub fn parse_event(body: &[u8]) -> Result<InquiryEvent, ApiError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid payload"))?;
    let data = envelope.data.unwrap_or_default();
    let attributes = data.attributes.unwrap_or_default();
    let raw = attributes
        .reference_id
        .filter(|r| !r.trim().is_empty())
        .ok_or(ApiError::BadRequest("Missing reference-id"))?;
    let reference = Uid::parse(raw).map_err(|_| ApiError::BadRequest("Invalid reference-id"))?;
    Ok(InquiryEvent {
        reference,
        status: attributes.status,
        inquiry_id: data.id.filter(|id| !id.is_empty()).map(InquiryId::new),
    })
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub message: String,
    #[serde(rename = "firebaseUid", default, skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl WebhookAck {
    fn ignored() -> Self {
        Self {
            message: "Webhook received but not approved".to_string(),
            firebase_uid: None,
            verified: None,
        }
    }

    fn processed(uid: &Uid) -> Self {
        Self {
            message: "Verification processed successfully".to_string(),
            firebase_uid: Some(uid.to_string()),
            verified: Some(true),
        }
    }
}

/// The signature header as text. A header that is not visible ASCII is
/// malformed, not missing.
fn signature_header(headers: &HeaderMap) -> Result<Option<&str>, SignatureError> {
    headers
        .get(SIGNATURE_HEADER)
        .map(|v| v.to_str().map_err(|_| SignatureError::Malformed))
        .transpose()
}

/// `POST /verify/webhook`
pub async fn persona_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let metrics = &state.metrics;

    let verdict = signature_header(&headers).and_then(|signature| {
        verify_signature(state.settings.webhook_secret.as_deref(), signature, &body)
    });
    if let Err(e) = verdict {
        warn!(reason = %e, "rejecting webhook");
        metrics.webhook(outcome::UNAUTHORIZED);
        return Err(ApiError::Unauthorized);
    }

    let event = parse_event(&body).inspect_err(|e| {
        warn!(error = %e, "malformed webhook payload");
        metrics.webhook(outcome::BAD_REQUEST);
    })?;
    let uid = &event.reference;
    debug!(uid = %uid, status = ?event.status, "webhook received");

    if !event.is_approved() {
        match event.status.as_deref() {
            Some("declined") | Some("failed") | Some("rejected") => {
                warn!(uid = %uid, status = ?event.status, "inquiry not approved; no state change")
            }
            _ => info!(uid = %uid, status = ?event.status, "skipping non-approved inquiry"),
        }
        metrics.webhook(outcome::IGNORED);
        return Ok(Json(WebhookAck::ignored()));
    }

    if event.inquiry_id.is_none() {
        debug!(uid = %uid, "approved webhook without inquiry id; keeping stored one");
    }

    let now = state.clock.now();
    match state.store.apply_approval(uid, event.inquiry_id.as_ref(), now) {
        Ok(ApprovalOutcome::Applied(record)) => {
            info!(uid = %uid, inquiry_id = ?record.inquiry_id, "user verified");
            metrics.webhook(outcome::APPLIED);
            metrics.approvals_applied.inc();
            spawn_unlock_notification(&state, &record, now);
            Ok(Json(WebhookAck::processed(uid)))
        }
        Ok(ApprovalOutcome::AlreadyApproved(_)) => {
            info!(uid = %uid, "duplicate approval delivery; record unchanged");
            metrics.webhook(outcome::DUPLICATE);
            Ok(Json(WebhookAck::processed(uid)))
        }
        Ok(ApprovalOutcome::UnknownUid) => {
            error!(uid = %uid, "approval for unknown user");
            metrics.webhook(outcome::UNKNOWN_UID);
            Err(ApiError::NotFound("User not found"))
        }
        Err(e) => {
            error!(uid = %uid, error = %e, "failed to apply approval");
            metrics.webhook(outcome::STORAGE_ERROR);
            Err(ApiError::Storage(e.to_string()))
        }
    }
}

/// Send the "feed unlocked" push in the background. The webhook response
/// never waits on or reflects the delivery.
fn spawn_unlock_notification(state: &AppState, record: &VerificationRecord, now: Timestamp) {
    let Some(token) = record.push_token.as_deref() else {
        warn!(uid = %record.uid, "no push token registered; skipping notification");
        return;
    };
    let message = PushMessage::verification_approved(
        token,
        record.username.as_deref(),
        &record.uid,
        now,
        &state.settings.frontend_url,
    );
    let push = Arc::clone(&state.push);
    let metrics = Arc::clone(&state.metrics);
    let uid = record.uid.clone();
    tokio::spawn(async move {
        match push.send(&message).await {
            Ok(message_id) => {
                metrics.push_sent.inc();
                info!(uid = %uid, message_id = %message_id, "unlock notification sent");
            }
            Err(e) => {
                metrics.push_failed.inc();
                warn!(uid = %uid, error = %e, "unlock notification failed");
            }
        }
    });
}
