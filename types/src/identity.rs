//! Identity keys: the user's stable uid and the provider's inquiry reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LtcError;

/// Longest uid accepted from any source. Firebase uids are at most 128 bytes.
const MAX_UID_LEN: usize = 128;

/// Stable external identity key for a user (the Firebase uid).
///
/// Assigned at account creation and never changed. The webhook finds the
/// record through the provider's echoed `reference-id`, the status endpoint
/// through the caller's own token; both must carry the same `Uid`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Validate and wrap a raw uid string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, LtcError> {
        let s = raw.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LtcError::InvalidUid("empty".into()));
        }
        if trimmed.len() > MAX_UID_LEN {
            return Err(LtcError::InvalidUid(format!(
                "longer than {MAX_UID_LEN} bytes"
            )));
        }
        if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(LtcError::InvalidUid("contains whitespace".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Uid {
    type Err = LtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = LtcError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

/// Opaque inquiry reference issued by the verification provider (`inq_...`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InquiryId(String);

impl InquiryId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InquiryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
