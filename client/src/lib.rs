//! Client side of verification sync.
//!
//! - [`ApiClient`]: typed calls to the verification API
//! - [`VerificationPoller`]: bounded status polling after the hosted flow
//! - [`Session`]: the shared auth-state context
//! - [`decide`] / [`GateWatcher`]: the access gate for protected views

pub mod api;
pub mod error;
pub mod gate;
pub mod poller;
pub mod session;
pub mod token;

pub use api::{ApiClient, StatusSource, VerificationSnapshot};
pub use error::ClientError;
pub use gate::{decide, Decision, GateWatcher, Route};
pub use poller::{PollHandle, PollOutcome, PollerConfig, VerificationPoller};
pub use session::{AuthState, Session};
pub use token::{IdentityTokenProvider, StaticTokenProvider};
