//! Webhook signature computation and verification.
//!
//! The provider signs the exact bytes it sends. Verification must therefore
//! run over the raw request body, never over a re-serialized JSON value.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,

    #[error("webhook secret is not configured")]
    SecretNotConfigured,

    #[error("signature is not valid hex")]
    Malformed,

    #[error("signature does not match body")]
    Mismatch,
}

fn mac_for(secret: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC accepts keys of any length")
}

/// Hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a header-supplied signature against the raw body.
///
/// Fails closed: an absent header, an empty or absent secret, a non-hex
/// header, and a mismatch are all errors. The comparison is constant time.
pub fn verify_signature(
    secret: Option<&str>,
    header: Option<&str>,
    body: &[u8],
) -> Result<(), SignatureError> {
    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Err(SignatureError::SecretNotConfigured),
    };
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(SignatureError::Missing)?;

    let provided = hex::decode(header).map_err(|_| SignatureError::Malformed)?;

    let mut mac = mac_for(secret.as_bytes());
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}
