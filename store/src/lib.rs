//! Abstract storage traits for the verification sync service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod memory;
pub mod verification;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use verification::{ApprovalOutcome, VerificationRecordStore};
