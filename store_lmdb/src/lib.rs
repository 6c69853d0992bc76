//! LMDB storage backend for the verification sync service.
//!
//! Implements the `ltc-store` traits using the `heed` LMDB bindings. Records
//! are bincode-encoded under their uid in a single named database.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod verification;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use verification::LmdbVerificationStore;
