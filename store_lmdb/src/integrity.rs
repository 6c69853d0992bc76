//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the API starts
//! accepting webhooks.

use std::path::Path;
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::Env;

use ltc_types::VerificationRecord;

use crate::environment::{META_DB, RECORDS_DB};
use crate::LmdbError;

/// Summary of an integrity check run.
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check LMDB database integrity on startup.
///
/// Counts the meta entries and decodes every record, checking that each row
/// is stored under its own uid. Problems are recorded in the report rather
/// than causing a hard error.
pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let rtxn = env.read_txn()?;

    match env.open_database::<Str, Bytes>(&rtxn, Some(META_DB)) {
        Ok(Some(db)) => {
            report.databases_checked += 1;
            match db.len(&rtxn) {
                Ok(count) => report.total_entries += count,
                Err(e) => report
                    .errors
                    .push(format!("failed to read database '{META_DB}': {e}")),
            }
        }
        Ok(None) => {}
        Err(e) => report
            .errors
            .push(format!("failed to open database '{META_DB}': {e}")),
    }

    match env.open_database::<Str, Bytes>(&rtxn, Some(RECORDS_DB)) {
        Ok(Some(db)) => {
            report.databases_checked += 1;
            let iter = db.iter(&rtxn)?;
            for entry in iter {
                report.total_entries += 1;
                let (key, raw) = match entry {
                    Ok(kv) => kv,
                    Err(e) => {
                        report.errors.push(format!("failed to read record: {e}"));
                        continue;
                    }
                };
                match bincode::deserialize::<VerificationRecord>(raw) {
                    Ok(record) if record.uid.as_str() == key => {}
                    Ok(record) => report.errors.push(format!(
                        "record stored under '{key}' belongs to '{}'",
                        record.uid
                    )),
                    Err(e) => report
                        .errors
                        .push(format!("undecodable record '{key}': {e}")),
                }
            }
        }
        Ok(None) => {
            // Database doesn't exist yet, acceptable for a fresh install
        }
        Err(e) => report
            .errors
            .push(format!("failed to open database '{RECORDS_DB}': {e}")),
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent or empty) directory. Returns an
/// error if the directory has content but `data.mdb` is missing, which
/// suggests corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let is_empty = std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .map_err(|e| format!("cannot read data directory {}: {e}", path.display()))?;
    if is_empty {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
