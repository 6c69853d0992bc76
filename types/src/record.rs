//! The per-user verification record.

use serde::{Deserialize, Serialize};

use crate::identity::{InquiryId, Uid};
use crate::state::VerificationStatus;
use crate::time::Timestamp;

/// One row per user, keyed by [`Uid`].
///
/// `is_verified_21` is not stored: it is always read off `status`, so the
/// flag and the status cannot disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub uid: Uid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: VerificationStatus,
    /// Provider reference for the current or most recent inquiry.
    pub inquiry_id: Option<InquiryId>,
    /// Set once, on the first transition to `Approved`.
    pub verified_at: Option<Timestamp>,
    /// Firebase Cloud Messaging registration token, if the user opted in.
    pub push_token: Option<String>,
    pub created_at: Timestamp,
}

impl VerificationRecord {
    /// A freshly registered user: pending, no inquiry, no push token.
    pub fn new_pending(
        uid: Uid,
        username: Option<String>,
        email: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            uid,
            username,
            email,
            status: VerificationStatus::Pending,
            inquiry_id: None,
            verified_at: None,
            push_token: None,
            created_at,
        }
    }

    pub fn is_verified_21(&self) -> bool {
        self.status.is_verified_21()
    }

    /// Apply a provider approval.
    ///
    /// Status and inquiry id are overwritten with the same values on every
    /// delivery; `verified_at` keeps its first value. A delivery without an
    /// inquiry id leaves the stored one alone. Returns `true` only on the
    /// delivery that actually unlocked the user.
    pub fn approve(&mut self, inquiry_id: Option<InquiryId>, now: Timestamp) -> bool {
        let newly_approved = self.status != VerificationStatus::Approved;
        self.status = VerificationStatus::Approved;
        if inquiry_id.is_some() {
            self.inquiry_id = inquiry_id;
        }
        if self.verified_at.is_none() {
            self.verified_at = Some(now);
        }
        newly_approved
    }
}
