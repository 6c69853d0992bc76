//! The identity-provider seam: where bearer tokens come from.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::ClientError;

/// Issues ID tokens for the signed-in user.
#[async_trait]
pub trait IdentityTokenProvider: Send + Sync {
    /// A token for the current user. With `force_refresh` the provider must
    /// not hand back a cached token. Fails with [`ClientError::NoSession`]
    /// when nobody is signed in.
    async fn get_token(&self, force_refresh: bool) -> Result<String, ClientError>;
}

/// A provider holding one fixed token, e.g. taken from the command line.
pub struct StaticTokenProvider {
    token: Mutex<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    /// A provider with nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            token: Mutex::new(None),
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }
}

#[async_trait]
impl IdentityTokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String, ClientError> {
        self.token
            .lock()
            .ok()
            .and_then(|token| token.clone())
            .ok_or(ClientError::NoSession)
    }
}
