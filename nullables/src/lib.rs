//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, record storage, identity provider, push
//! delivery, inquiry creation) are abstracted behind traits. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod identity;
pub mod inquiry;
pub mod push;
pub mod store;

pub use clock::NullClock;
pub use identity::NullTokenVerifier;
pub use inquiry::NullInquiryCreator;
pub use push::NullPushSender;
pub use store::NullRecordStore;
