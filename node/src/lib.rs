//! Verification sync node.
//!
//! The node is the process that:
//! - Loads configuration (TOML plus environment overrides)
//! - Opens the verification record store (LMDB or in-memory)
//! - Serves the HTTP API
//! - Shuts it down gracefully on SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod node;
pub mod shutdown;

pub use config::{FcmConfig, FirebaseConfig, NodeConfig, PersonaConfig, StoreBackend};
pub use error::NodeError;
pub use node::LtcNode;
pub use shutdown::ShutdownController;
