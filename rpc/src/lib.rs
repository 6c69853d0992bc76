//! HTTP API for the verification sync service.
//!
//! Provides endpoints for:
//! - Persona webhook ingestion (`POST /verify/webhook`)
//! - The caller's own verification status (`GET /auth/me`)
//! - Registration, inquiry creation and push-token updates
//! - Health and Prometheus metrics

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod state;
pub mod webhook;

pub use error::ApiError;
pub use metrics::ServiceMetrics;
pub use server::{router, RpcServer};
pub use state::{ApiSettings, AppState};
