//! Fundamental types for the verification sync service.
//!
//! Shared by every other crate in the workspace: identity keys, the
//! verification status enum, the per-user record, and timestamps.

pub mod error;
pub mod identity;
pub mod record;
pub mod state;
pub mod time;

pub use error::LtcError;
pub use identity::{InquiryId, Uid};
pub use record::VerificationRecord;
pub use state::VerificationStatus;
pub use time::{Clock, SystemClock, Timestamp};
