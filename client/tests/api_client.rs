//! `ApiClient` against an in-process stand-in for the verification API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ltc_client::{
    ApiClient, AuthState, ClientError, IdentityTokenProvider, PollOutcome, PollerConfig, Session,
    StatusSource, VerificationPoller, VerificationSnapshot,
};
use ltc_types::VerificationStatus;

/// Always hands out `good-token` and counts forced refreshes.
#[derive(Default)]
struct CountingTokens {
    forced: AtomicUsize,
}

#[async_trait]
impl IdentityTokenProvider for CountingTokens {
    async fn get_token(&self, force_refresh: bool) -> Result<String, ClientError> {
        if force_refresh {
            self.forced.fetch_add(1, Ordering::SeqCst);
        }
        Ok("good-token".to_string())
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer good-token")
}

fn me_route(body: Value) -> Router {
    Router::new().route(
        "/auth/me",
        get(move |headers: HeaderMap| {
            let body = body.clone();
            async move {
                if authorized(&headers) {
                    Json(body).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }
        }),
    )
}

fn client(base: &str, tokens: Arc<CountingTokens>) -> ApiClient {
    ApiClient::new(base, tokens).expect("client")
}

#[tokio::test]
async fn reads_verified_status_and_refreshes_token() {
    let base = spawn(me_route(json!({
        "uid": "uid-42",
        "is_verified_21": 1,
        "verification_status": "approved"
    })))
    .await;
    let tokens = Arc::new(CountingTokens::default());
    let api = client(&base, tokens.clone());

    let snapshot = api.fetch_status().await.unwrap();
    assert!(snapshot.is_verified_21);
    assert_eq!(snapshot.status, VerificationStatus::Approved);

    api.fetch_status().await.unwrap();
    assert_eq!(tokens.forced.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn flag_counts_even_when_status_lags() {
    let base = spawn(me_route(json!({
        "is_verified_21": 1,
        "verification_status": "pending"
    })))
    .await;
    let api = client(&base, Arc::new(CountingTokens::default()));
    let snapshot = api.fetch_status().await.unwrap();
    assert!(snapshot.is_verified_21);
    assert_eq!(snapshot.status, VerificationStatus::Approved);
}

#[tokio::test]
async fn unknown_status_string_falls_back_to_flag() {
    let base = spawn(me_route(json!({
        "is_verified_21": 0,
        "verification_status": "completed"
    })))
    .await;
    let api = client(&base, Arc::new(CountingTokens::default()));
    let snapshot = api.fetch_status().await.unwrap();
    assert!(!snapshot.is_verified_21);
    assert_eq!(snapshot.status, VerificationStatus::Pending);
}

#[tokio::test]
async fn poller_unlocks_on_flag_with_stale_status() {
    let base = spawn(me_route(json!({
        "is_verified_21": 1,
        "verification_status": "pending"
    })))
    .await;
    let api = client(&base, Arc::new(CountingTokens::default()));
    let session = Session::new();
    session.identity_changed(Some(VerificationSnapshot::pending()));
    let config = PollerConfig {
        max_attempts: 3,
        interval: Duration::from_millis(10),
    };

    let outcome = VerificationPoller::with_config(Arc::new(api), session.clone(), config)
        .spawn()
        .outcome()
        .await;
    assert_eq!(outcome, PollOutcome::Verified);
    assert_eq!(session.state(), AuthState::AuthenticatedVerified);
}

#[tokio::test]
async fn maps_error_statuses() {
    async fn status(code: u16) -> Response {
        StatusCode::from_u16(code).unwrap().into_response()
    }
    let app = Router::new()
        .route("/auth/me", get(|| status(404)))
        .route("/verify/persona/create-inquiry", post(|| status(502)))
        .route("/auth/update-fcm-token", post(|| status(401)));
    let base = spawn(app).await;
    let api = client(&base, Arc::new(CountingTokens::default()));

    assert!(matches!(api.me().await, Err(ClientError::NotRegistered)));
    assert!(matches!(
        api.create_inquiry().await,
        Err(ClientError::Status(502))
    ));
    assert!(matches!(
        api.update_push_token("t").await,
        Err(ClientError::Unauthorized)
    ));
}

#[tokio::test]
async fn create_inquiry_returns_id() {
    let app = Router::new().route(
        "/verify/persona/create-inquiry",
        post(|headers: HeaderMap| async move {
            if authorized(&headers) {
                Json(json!({ "inquiryId": "inq_123" })).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    );
    let base = spawn(app).await;
    let api = client(&base, Arc::new(CountingTokens::default()));
    assert_eq!(api.create_inquiry().await.unwrap(), "inq_123");
}

#[tokio::test]
async fn unreachable_server_is_transient() {
    let api = client("http://127.0.0.1:9", Arc::new(CountingTokens::default()));
    let err = api.fetch_status().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
}
