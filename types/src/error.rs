//! Top-level error type shared across crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LtcError {
    #[error("invalid uid: {0}")]
    InvalidUid(String),

    #[error("unknown verification status: {0}")]
    UnknownStatus(String),
}
