//! In-memory backend, for development runs and tests. Nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use ltc_types::{Uid, VerificationRecord};

use crate::{StoreError, VerificationRecordStore};

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uid, VerificationRecord>>,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("record map lock poisoned".into())
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = VerificationRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.uid.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VerificationRecordStore for MemoryRecordStore {
    fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.uid) {
            return Err(StoreError::Duplicate(record.uid.to_string()));
        }
        records.insert(record.uid.clone(), record.clone());
        Ok(())
    }

    fn get(&self, uid: &Uid) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.records.read().map_err(poisoned)?.get(uid).cloned())
    }

    fn update(
        &self,
        uid: &Uid,
        apply: &mut dyn FnMut(&mut VerificationRecord),
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.get_mut(uid).map(|record| {
            apply(record);
            record.clone()
        }))
    }
}
