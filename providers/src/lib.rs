//! Outbound integrations with hosted services.
//!
//! Each service sits behind a trait so the API layer and tests never depend
//! on a live endpoint:
//! - [`TokenVerifier`] resolves a Firebase ID token to a uid
//! - [`PushSender`] delivers a Firebase Cloud Messaging notification
//! - [`InquiryCreator`] opens a Persona inquiry for a user

pub mod error;
pub mod firebase;
pub mod fcm;
pub mod persona;
pub mod push;

pub use error::ProviderError;
pub use fcm::FcmSender;
pub use firebase::{FirebaseTokenVerifier, TokenVerifier, VerifiedIdentity};
pub use persona::{InquiryCreator, PersonaClient};
pub use push::{PushMessage, PushSender};

use std::time::Duration;

/// Default timeout for outbound requests.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Map a transport failure the way every client here reports it.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Unreachable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::Unreachable(format!("connection failed: {e}"))
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}
