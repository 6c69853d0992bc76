//! Nullable identity provider: a fixed table of token → uid.

use async_trait::async_trait;
use ltc_providers::{ProviderError, TokenVerifier, VerifiedIdentity};
use ltc_types::Uid;
use std::collections::HashMap;
use std::sync::Mutex;

/// Accepts exactly the tokens it was told about.
pub struct NullTokenVerifier {
    tokens: Mutex<HashMap<String, VerifiedIdentity>>,
}

impl NullTokenVerifier {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Make `token` resolve to `uid`.
    pub fn allow(&self, token: &str, uid: &Uid) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            VerifiedIdentity {
                uid: uid.clone(),
                email: None,
            },
        );
    }

    /// Make `token` stop resolving (session revoked).
    pub fn revoke(&self, token: &str) {
        self.tokens.lock().unwrap().remove(token);
    }
}

impl Default for NullTokenVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifier for NullTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        self.tokens
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or(ProviderError::InvalidToken)
    }
}
