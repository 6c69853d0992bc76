//! Axum-based API server.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::ApiSettings;
use crate::{handlers, webhook, AppState};

/// Build the application router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings);

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/verify/webhook", post(webhook::persona_webhook))
        .route("/auth/me", get(handlers::auth_me))
        .route("/auth/register", post(handlers::register))
        .route("/auth/update-fcm-token", post(handlers::update_push_token))
        .route(
            "/verify/persona/create-inquiry",
            post(handlers::create_inquiry),
        )
        .route(
            "/verify/test-notification/:uid",
            get(handlers::test_notification),
        );

    if state.settings.enable_metrics {
        app = app.route("/metrics", get(handlers::metrics));
    }

    app.layer(cors).with_state(state)
}

fn cors_layer(settings: &ApiSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(webhook::SIGNATURE_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    if settings.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serves [`router`] on a socket address.
pub struct RpcServer {
    pub addr: SocketAddr,
    state: AppState,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ApiError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "API server listening");
        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}
