//! Verification record storage trait.

use ltc_types::{InquiryId, Timestamp, Uid, VerificationRecord};

use crate::StoreError;

/// Result of applying a provider approval to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// This delivery moved the record to `approved`.
    Applied(VerificationRecord),
    /// The record was already approved; values were rewritten unchanged.
    AlreadyApproved(VerificationRecord),
    /// No record exists for the uid.
    UnknownUid,
}

/// Keyed storage for [`VerificationRecord`]s. Lookups are exact-match on
/// [`Uid`] only.
///
/// Backends implement the three primitives. `update` must be atomic: the
/// closure sees the current row and its result is written back before any
/// other writer can observe or modify that row. The provided methods build
/// every state transition on top of `update`, so backends never
/// re-implement the transition rules.
pub trait VerificationRecordStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if the uid
    /// already has one.
    fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError>;

    /// Fetch the record for `uid`, if any.
    fn get(&self, uid: &Uid) -> Result<Option<VerificationRecord>, StoreError>;

    /// Atomically read-modify-write the record for `uid`. Returns the record
    /// as written, or `None` if there is no record (nothing is written).
    fn update(
        &self,
        uid: &Uid,
        apply: &mut dyn FnMut(&mut VerificationRecord),
    ) -> Result<Option<VerificationRecord>, StoreError>;

    /// Record the inquiry created for this user.
    fn set_inquiry_id(&self, uid: &Uid, inquiry_id: &InquiryId) -> Result<(), StoreError> {
        self.update(uid, &mut |record| {
            record.inquiry_id = Some(inquiry_id.clone());
        })?
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(uid.to_string()))
    }

    /// Apply a provider approval in one atomic write: status, derived flag,
    /// inquiry id and first `verified_at` change together. Without an
    /// inquiry id the stored one is kept.
    fn apply_approval(
        &self,
        uid: &Uid,
        inquiry_id: Option<&InquiryId>,
        now: Timestamp,
    ) -> Result<ApprovalOutcome, StoreError> {
        let mut newly_approved = false;
        let written = self.update(uid, &mut |record| {
            newly_approved = record.approve(inquiry_id.cloned(), now);
        })?;
        Ok(match written {
            Some(record) if newly_approved => ApprovalOutcome::Applied(record),
            Some(record) => ApprovalOutcome::AlreadyApproved(record),
            None => ApprovalOutcome::UnknownUid,
        })
    }

    /// Store the user's push-notification registration token.
    fn set_push_token(&self, uid: &Uid, token: &str) -> Result<(), StoreError> {
        self.update(uid, &mut |record| {
            record.push_token = Some(token.to_string());
        })?
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(uid.to_string()))
    }
}
