//! Cryptographic primitives for the verification sync service.
//!
//! - **HMAC-SHA256** over the raw webhook body, hex encoded, keyed with the
//!   shared provider secret
//! - Constant-time verification of the header-supplied signature

pub mod signature;

pub use signature::{compute_signature, verify_signature, SignatureError};
