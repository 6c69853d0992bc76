//! LMDB implementation of VerificationRecordStore.
//!
//! One key per user: the uid string maps to the bincode-encoded record.
//! `update` runs inside a single write transaction, and LMDB admits one
//! writer at a time, so every read-modify-write is atomic.

use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env};

use ltc_store::{StoreError, VerificationRecordStore};
use ltc_types::{Uid, VerificationRecord};

use crate::LmdbError;

pub struct LmdbVerificationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Str, Bytes>,
}

fn decode(raw: &[u8]) -> Result<VerificationRecord, LmdbError> {
    Ok(bincode::deserialize(raw)?)
}

fn encode(record: &VerificationRecord) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(record)?)
}

impl LmdbVerificationStore {
    /// Number of stored records.
    pub fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.records_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

impl VerificationRecordStore for LmdbVerificationStore {
    fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        let key = record.uid.as_str();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let exists = self
            .records_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some();
        if exists {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        let raw = encode(record)?;
        self.records_db
            .put(&mut wtxn, key, &raw)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, uid: &Uid) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let record = self
            .records_db
            .get(&rtxn, uid.as_str())
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()?;
        Ok(record)
    }

    fn update(
        &self,
        uid: &Uid,
        apply: &mut dyn FnMut(&mut VerificationRecord),
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = self
            .records_db
            .get(&wtxn, uid.as_str())
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()?;

        let Some(mut record) = current else {
            // Dropping the transaction aborts it; nothing was written.
            return Ok(None);
        };

        apply(&mut record);
        let raw = encode(&record)?;
        self.records_db
            .put(&mut wtxn, uid.as_str(), &raw)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use ltc_store::ApprovalOutcome;
    use ltc_types::{InquiryId, Timestamp, VerificationStatus};

    fn temp_store() -> (tempfile::TempDir, LmdbEnvironment, LmdbVerificationStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024).expect("open env");
        let store = env.verification_store();
        (dir, env, store)
    }

    fn uid(s: &str) -> Uid {
        Uid::parse(s).unwrap()
    }

    fn pending(s: &str) -> VerificationRecord {
        VerificationRecord::new_pending(uid(s), Some("kush_kid".into()), None, Timestamp::new(1))
    }

    #[test]
    fn insert_then_get() {
        let (_dir, _env, store) = temp_store();
        store.insert(&pending("uid-1")).unwrap();
        let got = store.get(&uid("uid-1")).unwrap().unwrap();
        assert_eq!(got.status, VerificationStatus::Pending);
        assert_eq!(got.username.as_deref(), Some("kush_kid"));
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let (_dir, _env, store) = temp_store();
        store.insert(&pending("uid-1")).unwrap();
        assert!(matches!(
            store.insert(&pending("uid-1")),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn update_missing_writes_nothing() {
        let (_dir, _env, store) = temp_store();
        let mut called = false;
        let out = store.update(&uid("ghost"), &mut |_| called = true).unwrap();
        assert!(out.is_none());
        assert!(!called);
        assert!(store.get(&uid("ghost")).unwrap().is_none());
    }

    #[test]
    fn approval_is_idempotent_on_disk() {
        let (_dir, _env, store) = temp_store();
        store.insert(&pending("uid-42")).unwrap();
        let inquiry = InquiryId::new("inq_abc");

        let first = store
            .apply_approval(&uid("uid-42"), Some(&inquiry), Timestamp::new(100))
            .unwrap();
        assert!(matches!(first, ApprovalOutcome::Applied(_)));

        let second = store
            .apply_approval(&uid("uid-42"), Some(&inquiry), Timestamp::new(900))
            .unwrap();
        assert!(matches!(second, ApprovalOutcome::AlreadyApproved(_)));

        let rec = store.get(&uid("uid-42")).unwrap().unwrap();
        assert!(rec.is_verified_21());
        assert_eq!(rec.status, VerificationStatus::Approved);
        assert_eq!(rec.verified_at, Some(Timestamp::new(100)));
        assert_eq!(rec.inquiry_id, Some(inquiry));
    }

    #[test]
    fn approval_for_unknown_uid() {
        let (_dir, _env, store) = temp_store();
        let out = store
            .apply_approval(&uid("nobody"), Some(&InquiryId::new("inq_x")), Timestamp::new(5))
            .unwrap();
        assert_eq!(out, ApprovalOutcome::UnknownUid);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        {
            let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024).unwrap();
            let store = env.verification_store();
            store.insert(&pending("uid-7")).unwrap();
            store.set_inquiry_id(&uid("uid-7"), &InquiryId::new("inq_7")).unwrap();
            store.set_push_token(&uid("uid-7"), "fcm-token-7").unwrap();
            env.force_sync().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024).unwrap();
        let rec = env.verification_store().get(&uid("uid-7")).unwrap().unwrap();
        assert_eq!(rec.inquiry_id, Some(InquiryId::new("inq_7")));
        assert_eq!(rec.push_token.as_deref(), Some("fcm-token-7"));
        assert_eq!(rec.status, VerificationStatus::Pending);
    }

    #[test]
    fn set_inquiry_on_missing_record_is_not_found() {
        let (_dir, _env, store) = temp_store();
        assert!(matches!(
            store.set_inquiry_id(&uid("nobody"), &InquiryId::new("inq")),
            Err(StoreError::NotFound(_))
        ));
    }
}
