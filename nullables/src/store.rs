//! Nullable store: in-memory record storage with write counting and
//! failure injection.

use ltc_store::{MemoryRecordStore, StoreError, VerificationRecordStore};
use ltc_types::{Uid, VerificationRecord};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory record store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Counts writes so tests can assert that a code path left storage
/// untouched, and can be switched into a failing mode to exercise
/// storage-error handling.
pub struct NullRecordStore {
    inner: MemoryRecordStore,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl NullRecordStore {
    pub fn new() -> Self {
        Self::with_records([])
    }

    /// Seed a store with records, without counting them as writes.
    pub fn with_records(records: impl IntoIterator<Item = VerificationRecord>) -> Self {
        Self {
            inner: MemoryRecordStore::with_records(records),
            writes: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// When set, every operation fails with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null store set to fail".into()))
        } else {
            Ok(())
        }
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for NullRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationRecordStore for NullRecordStore {
    fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert(record)?;
        self.count_write();
        Ok(())
    }

    fn get(&self, uid: &Uid) -> Result<Option<VerificationRecord>, StoreError> {
        self.check()?;
        self.inner.get(uid)
    }

    fn update(
        &self,
        uid: &Uid,
        apply: &mut dyn FnMut(&mut VerificationRecord),
    ) -> Result<Option<VerificationRecord>, StoreError> {
        self.check()?;
        let written = self.inner.update(uid, apply)?;
        if written.is_some() {
            self.count_write();
        }
        Ok(written)
    }
}
