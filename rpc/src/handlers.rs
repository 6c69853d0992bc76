//! Request handlers for the caller-scoped and operational routes.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ltc_providers::PushMessage;
use ltc_types::{Uid, VerificationRecord, VerificationStatus};

use crate::auth::Caller;
use crate::{ApiError, AppState};

// ── Status ───────────────────────────────────────────────────────────────

/// Body of `GET /auth/me`. `is_verified_21` is 0 or 1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub uid: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_verified_21: u8,
    pub verification_status: VerificationStatus,
    pub inquiry_id: Option<String>,
    pub verified_at: Option<u64>,
    pub created_at: u64,
}

impl From<&VerificationRecord> for StatusResponse {
    fn from(record: &VerificationRecord) -> Self {
        Self {
            uid: record.uid.to_string(),
            username: record.username.clone(),
            email: record.email.clone(),
            is_verified_21: u8::from(record.is_verified_21()),
            verification_status: record.status,
            inquiry_id: record.inquiry_id.as_ref().map(|id| id.as_str().to_string()),
            verified_at: record.verified_at.map(|t| t.as_secs()),
            created_at: record.created_at.as_secs(),
        }
    }
}

/// `GET /auth/me`: the caller's own record. Read-only.
pub async fn auth_me(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = state
        .store
        .get(&identity.uid)?
        .ok_or(ApiError::NotFound("User not found"))?;
    state.metrics.status_queries.inc();
    Ok(Json(StatusResponse::from(&record)))
}

// ── Registration ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /auth/register`: create the caller's pending record.
pub async fn register(
    State(state): State<AppState>,
    Caller(identity): Caller,
    body: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let username = request.username.filter(|u| !u.trim().is_empty());
    let email = request.email.or(identity.email);
    let record =
        VerificationRecord::new_pending(identity.uid, username, email, state.clock.now());
    state.store.insert(&record)?;
    info!(uid = %record.uid, "user registered");
    Ok((StatusCode::CREATED, Json(StatusResponse::from(&record))))
}

// ── Inquiry ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponse {
    pub inquiry_id: String,
}

/// `POST /verify/persona/create-inquiry`: open a Persona inquiry whose
/// reference is the caller's uid.
pub async fn create_inquiry(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<InquiryResponse>, ApiError> {
    let uid = identity.uid;
    if state.store.get(&uid)?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }
    let inquiry_id = state.inquiries.create_inquiry(&uid).await.map_err(|e| {
        error!(uid = %uid, error = %e, "failed to create inquiry");
        ApiError::Upstream(e.to_string())
    })?;
    state.store.set_inquiry_id(&uid, &inquiry_id)?;
    info!(uid = %uid, inquiry_id = %inquiry_id.as_str(), "inquiry created");
    Ok(Json(InquiryResponse {
        inquiry_id: inquiry_id.as_str().to_string(),
    }))
}

// ── Push token ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub fcm_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// `POST /auth/update-fcm-token`
pub async fn update_push_token(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(request): Json<PushTokenRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let token = request.fcm_token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Missing fcmToken"));
    }
    state.store.set_push_token(&identity.uid, token)?;
    info!(uid = %identity.uid, "push token updated");
    Ok(Json(SuccessResponse { success: true }))
}

// ── Test notification ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationResponse {
    pub success: bool,
    pub message_id: String,
}

/// `GET /verify/test-notification/:uid`. Hidden unless enabled.
pub async fn test_notification(
    State(state): State<AppState>,
    Path(raw_uid): Path<String>,
) -> Result<Json<TestNotificationResponse>, ApiError> {
    if !state.settings.enable_test_notification {
        return Err(ApiError::NotFound("Not found"));
    }
    let uid = Uid::parse(raw_uid).map_err(|_| ApiError::BadRequest("Invalid uid"))?;
    let token = state
        .store
        .get(&uid)?
        .and_then(|record| record.push_token)
        .ok_or(ApiError::NotFound("User or push token not found"))?;
    let message = PushMessage::test_notification(&token, &state.settings.frontend_url);
    match state.push.send(&message).await {
        Ok(message_id) => {
            state.metrics.push_sent.inc();
            Ok(Json(TestNotificationResponse {
                success: true,
                message_id,
            }))
        }
        Err(e) => {
            state.metrics.push_failed.inc();
            warn!(uid = %uid, error = %e, "test notification failed");
            Err(ApiError::Upstream(e.to_string()))
        }
    }
}

// ── Operational ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let text = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}
