//! In-process HTTP tests for the API, driven through `tower::ServiceExt`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ltc_crypto::compute_signature;
use ltc_nullables::{
    NullClock, NullInquiryCreator, NullPushSender, NullRecordStore, NullTokenVerifier,
};
use ltc_rpc::handlers::StatusResponse;
use ltc_rpc::metrics::outcome;
use ltc_rpc::{router, ApiSettings, AppState, ServiceMetrics};
use ltc_store::VerificationRecordStore;
use ltc_types::{InquiryId, Timestamp, Uid, VerificationRecord, VerificationStatus};

const SECRET: &str = "whsec_test";

struct Harness {
    store: Arc<NullRecordStore>,
    identity: Arc<NullTokenVerifier>,
    push: Arc<NullPushSender>,
    inquiries: Arc<NullInquiryCreator>,
    clock: Arc<NullClock>,
    metrics: Arc<ServiceMetrics>,
    app: Router,
}

fn uid(s: &str) -> Uid {
    Uid::parse(s).unwrap()
}

fn harness_with(records: Vec<VerificationRecord>, push: NullPushSender, settings: ApiSettings) -> Harness {
    let store = Arc::new(NullRecordStore::with_records(records));
    let identity = Arc::new(NullTokenVerifier::new());
    let push = Arc::new(push);
    let inquiries = Arc::new(NullInquiryCreator::new());
    let clock = Arc::new(NullClock::new(1_700_000_000));
    let metrics = Arc::new(ServiceMetrics::new());
    let state = AppState::new(
        store.clone(),
        identity.clone(),
        push.clone(),
        inquiries.clone(),
    )
    .with_clock(clock.clone())
    .with_metrics(metrics.clone())
    .with_settings(settings);
    Harness {
        store,
        identity,
        push,
        inquiries,
        clock,
        metrics,
        app: router(state),
    }
}

fn settings() -> ApiSettings {
    ApiSettings {
        webhook_secret: Some(SECRET.to_string()),
        frontend_url: "https://app.example.com".to_string(),
        enable_test_notification: true,
        enable_metrics: true,
        cors_origins: Vec::new(),
    }
}

fn pending_with_token(s: &str) -> VerificationRecord {
    let mut record = VerificationRecord::new_pending(
        uid(s),
        Some("sativa_sam".into()),
        Some("sam@example.com".into()),
        Timestamp::new(1_600_000_000),
    );
    record.push_token = Some("device-token".into());
    record
}

fn harness() -> Harness {
    harness_with(vec![pending_with_token("uid-42")], NullPushSender::new(), settings())
}

fn webhook_body(status: &str, reference: &str) -> String {
    json!({
        "data": {
            "id": "inq_abc",
            "type": "inquiry",
            "attributes": { "status": status, "reference-id": reference }
        }
    })
    .to_string()
}

fn signed_webhook(body: &str) -> Request<Body> {
    Request::post("/verify/webhook")
        .header("content-type", "application/json")
        .header("persona-signature", compute_signature(SECRET.as_bytes(), body.as_bytes()))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn bearer_get(path: &str, token: &str) -> Request<Body> {
    Request::get(path)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn bearer_post(path: &str, token: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Webhook ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn approved_webhook_verifies_user_and_sends_push() {
    let h = harness();
    let (status, body) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-42"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firebaseUid"], "uid-42");
    assert_eq!(body["verified"], true);

    let record = h.store.get(&uid("uid-42")).unwrap().unwrap();
    assert_eq!(record.status, VerificationStatus::Approved);
    assert!(record.is_verified_21());
    assert_eq!(record.inquiry_id.unwrap().as_str(), "inq_abc");
    assert_eq!(record.verified_at, Some(Timestamp::new(1_700_000_000)));

    assert!(h.push.wait_for(1, Duration::from_secs(2)).await);
    let sent = h.push.sent();
    assert_eq!(sent[0].token, "device-token");
    assert!(sent[0].body.starts_with("Hey sativa_sam!"));
    assert_eq!(sent[0].link.as_deref(), Some("https://app.example.com/feed"));

    assert_eq!(h.metrics.webhook_count(outcome::APPLIED), 1);
    assert_eq!(h.metrics.approvals_applied.get(), 1);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_mutation() {
    let h = harness();
    let body = webhook_body("approved", "uid-42");
    let request = Request::post("/verify/webhook")
        .header("persona-signature", compute_signature(b"wrong-secret", body.as_bytes()))
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.metrics.webhook_count(outcome::UNAUTHORIZED), 1);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let h = harness();
    let request = Request::post("/verify/webhook")
        .body(Body::from(webhook_body("approved", "uid-42")))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn non_ascii_signature_is_rejected() {
    let h = harness();
    let request = Request::post("/verify/webhook")
        .header(
            "persona-signature",
            axum::http::HeaderValue::from_bytes(b"\xfe\xff").unwrap(),
        )
        .body(Body::from(webhook_body("approved", "uid-42")))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.metrics.webhook_count(outcome::UNAUTHORIZED), 1);
}

#[tokio::test]
async fn unconfigured_secret_rejects_every_webhook() {
    let h = harness_with(
        vec![pending_with_token("uid-42")],
        NullPushSender::new(),
        ApiSettings {
            webhook_secret: None,
            ..settings()
        },
    );
    let (status, _) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-42"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn body_altered_after_signing_is_rejected() {
    let h = harness();
    let signed = webhook_body("declined", "uid-42");
    let request = Request::post("/verify/webhook")
        .header("persona-signature", compute_signature(SECRET.as_bytes(), signed.as_bytes()))
        .body(Body::from(webhook_body("approved", "uid-42")))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn missing_reference_id_is_bad_request() {
    let h = harness();
    let body = json!({ "data": { "id": "inq_abc", "attributes": { "status": "approved" } } })
        .to_string();
    let (status, json) = send(&h.app, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing reference-id");
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn approval_without_inquiry_id_still_verifies() {
    let h = harness();
    h.store
        .set_inquiry_id(&uid("uid-42"), &InquiryId::new("inq_created"))
        .unwrap();
    let body = json!({
        "data": { "attributes": { "status": "approved", "reference-id": "uid-42" } }
    })
    .to_string();

    let (status, json) = send(&h.app, signed_webhook(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["verified"], true);
    let record = h.store.get(&uid("uid-42")).unwrap().unwrap();
    assert!(record.is_verified_21());
    assert_eq!(record.status, VerificationStatus::Approved);
    assert_eq!(record.inquiry_id, Some(InquiryId::new("inq_created")));
    assert_eq!(h.metrics.webhook_count(outcome::APPLIED), 1);
}

#[tokio::test]
async fn non_approved_status_is_acknowledged_without_mutation() {
    let h = harness();
    for status in ["created", "completed", "declined", "failed"] {
        let (code, json) = send(&h.app, signed_webhook(&webhook_body(status, "uid-42"))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["message"], "Webhook received but not approved");
    }
    assert_eq!(h.store.write_count(), 0);
    let record = h.store.get(&uid("uid-42")).unwrap().unwrap();
    assert_eq!(record.status, VerificationStatus::Pending);
    assert_eq!(h.metrics.webhook_count(outcome::IGNORED), 4);
}

#[tokio::test]
async fn duplicate_approval_is_idempotent() {
    let h = harness();
    let body = webhook_body("approved", "uid-42");

    let (first, _) = send(&h.app, signed_webhook(&body)).await;
    let after_first = h.store.get(&uid("uid-42")).unwrap().unwrap();

    h.clock.advance(3600);
    let (second, json) = send(&h.app, signed_webhook(&body)).await;
    let after_second = h.store.get(&uid("uid-42")).unwrap().unwrap();

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(json["verified"], true);
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.verified_at, Some(Timestamp::new(1_700_000_000)));

    // Only the first delivery notifies.
    assert!(h.push.wait_for(1, Duration::from_secs(2)).await);
    assert!(!h.push.wait_for(2, Duration::from_millis(100)).await);
    assert_eq!(h.metrics.webhook_count(outcome::DUPLICATE), 1);
}

#[tokio::test]
async fn approval_for_unknown_user_is_not_found() {
    let h = harness();
    let (status, _) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-nobody"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.store.write_count(), 0);
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn storage_failure_is_internal_error() {
    let h = harness();
    h.store.set_failing(true);
    let (status, json) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-42"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(h.metrics.webhook_count(outcome::STORAGE_ERROR), 1);
}

#[tokio::test]
async fn push_failure_does_not_change_response() {
    let h = harness_with(
        vec![pending_with_token("uid-42")],
        NullPushSender::failing(),
        settings(),
    );
    let (status, _) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-42"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.push.wait_for(1, Duration::from_secs(2)).await);
    assert!(h.store.get(&uid("uid-42")).unwrap().unwrap().is_verified_21());
}

#[tokio::test]
async fn approval_without_push_token_skips_notification() {
    let record = VerificationRecord::new_pending(uid("uid-7"), None, None, Timestamp::new(1));
    let h = harness_with(vec![record], NullPushSender::new(), settings());
    let (status, _) = send(&h.app, signed_webhook(&webhook_body("approved", "uid-7"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!h.push.wait_for(1, Duration::from_millis(100)).await);
}

// ── Status ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_me_returns_callers_record() {
    let h = harness();
    h.identity.allow("tok-42", &uid("uid-42"));

    let (status, json) = send(&h.app, bearer_get("/auth/me", "tok-42")).await;

    assert_eq!(status, StatusCode::OK);
    let body: StatusResponse = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(body.uid, "uid-42");
    assert_eq!(body.is_verified_21, 0);
    assert_eq!(body.verification_status, VerificationStatus::Pending);
    assert_eq!(json["verification_status"], "pending");
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.metrics.status_queries.get(), 1);
}

#[tokio::test]
async fn auth_me_requires_valid_token() {
    let h = harness();
    let request = Request::get("/auth/me").body(Body::empty()).unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&h.app, bearer_get("/auth/me", "forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_me_without_record_is_not_found() {
    let h = harness();
    h.identity.allow("tok-new", &uid("uid-new"));
    let (status, _) = send(&h.app, bearer_get("/auth/me", "tok-new")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Registration, inquiry, push token ────────────────────────────────────

#[tokio::test]
async fn register_creates_pending_record_once() {
    let h = harness();
    h.identity.allow("tok-new", &uid("uid-new"));

    let request = bearer_post("/auth/register", "tok-new", json!({ "username": "indica_ida" }));
    let (status, json) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["verification_status"], "pending");
    assert_eq!(json["is_verified_21"], 0);
    assert_eq!(json["username"], "indica_ida");

    let again = bearer_post("/auth/register", "tok-new", json!({}));
    let (status, _) = send(&h.app, again).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_inquiry_uses_caller_uid_and_stores_id() {
    let h = harness();
    h.identity.allow("tok-42", &uid("uid-42"));

    let request = bearer_post(
        "/verify/persona/create-inquiry",
        "tok-42",
        json!({ "reference-id": "someone-else" }),
    );
    let (status, json) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    let inquiry_id = json["inquiryId"].as_str().unwrap().to_string();
    let record = h.store.get(&uid("uid-42")).unwrap().unwrap();
    assert_eq!(record.inquiry_id.unwrap().as_str(), inquiry_id);
    assert!(h.store.get(&uid("someone-else")).unwrap().is_none());
}

#[tokio::test]
async fn create_inquiry_reports_provider_outage() {
    let h = harness();
    h.identity.allow("tok-42", &uid("uid-42"));
    h.inquiries.set_unavailable(true);
    let request = bearer_post("/verify/persona/create-inquiry", "tok-42", json!({}));
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn update_push_token_stores_token() {
    let record = VerificationRecord::new_pending(uid("uid-7"), None, None, Timestamp::new(1));
    let h = harness_with(vec![record], NullPushSender::new(), settings());
    h.identity.allow("tok-7", &uid("uid-7"));

    let request = bearer_post("/auth/update-fcm-token", "tok-7", json!({ "fcmToken": "fresh" }));
    let (status, json) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let stored = h.store.get(&uid("uid-7")).unwrap().unwrap();
    assert_eq!(stored.push_token.as_deref(), Some("fresh"));
}

// ── Operational ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_notification_sends_when_enabled() {
    let h = harness();
    let request = Request::get("/verify/test-notification/uid-42")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(h.push.sent()[0].title, "Test Notification");
}

#[tokio::test]
async fn test_notification_hidden_when_disabled() {
    let h = harness_with(
        vec![pending_with_token("uid-42")],
        NullPushSender::new(),
        ApiSettings {
            enable_test_notification: false,
            ..settings()
        },
    );
    let request = Request::get("/verify/test-notification/uid-42")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn health_and_metrics() {
    let h = harness();
    let (status, json) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("ltc_approvals_applied_total"));
}

#[tokio::test]
async fn metrics_route_absent_when_disabled() {
    let h = harness_with(
        Vec::new(),
        NullPushSender::new(),
        ApiSettings {
            enable_metrics: false,
            ..settings()
        },
    );
    let (status, _) = send(&h.app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
