//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::verification::LmdbVerificationStore;
use crate::LmdbError;

/// Name of the database holding one bincode row per uid.
pub(crate) const RECORDS_DB: &str = "verification_records";
/// Name of the database holding schema metadata.
pub(crate) const META_DB: &str = "meta";

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    records_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, creates the named databases, and
    /// stamps the schema version on a fresh environment. Refuses to open an
    /// environment written by a newer schema.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process for this path
        // and never mapped twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let records_db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some(RECORDS_DB))?;
        let meta_db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;

        let stored: Option<u32> = meta_db
            .get(&wtxn, SCHEMA_VERSION_KEY)?
            .map(bincode::deserialize)
            .transpose()?;
        match stored {
            Some(found) if found > CURRENT_SCHEMA_VERSION => {
                return Err(LmdbError::SchemaTooNew {
                    found,
                    supported: CURRENT_SCHEMA_VERSION,
                });
            }
            Some(_) => {}
            None => {
                let raw = bincode::serialize(&CURRENT_SCHEMA_VERSION)?;
                meta_db.put(&mut wtxn, SCHEMA_VERSION_KEY, &raw)?;
                tracing::info!(version = CURRENT_SCHEMA_VERSION, "initialized fresh LMDB schema");
            }
        }
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            records_db,
        })
    }

    /// Shared handle to the underlying environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// A store handle over the records database. Handles are cheap and may
    /// be created as often as needed.
    pub fn verification_store(&self) -> LmdbVerificationStore {
        LmdbVerificationStore {
            env: Arc::clone(&self.env),
            records_db: self.records_db,
        }
    }

    /// Flush dirty pages to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}
