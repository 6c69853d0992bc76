//! Verification status as persisted and as reported to clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LtcError;

/// Persisted verification status of a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// No terminal signal from the provider yet.
    #[default]
    Pending,
    /// Provider approved the inquiry; 21+ content is unlocked.
    Approved,
    /// Provider declined the inquiry.
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether protected content may be shown.
    pub fn is_verified_21(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether the status will not change without a new inquiry.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = LtcError;

    /// Accepts the stored names plus the `verified`/`failed` aliases older
    /// clients used.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" | "verified" => Ok(Self::Approved),
            "rejected" | "failed" => Ok(Self::Rejected),
            other => Err(LtcError::UnknownStatus(other.to_string())),
        }
    }
}
