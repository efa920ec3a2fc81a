use fjall::{Config, PartitionCreateOptions, PersistMode, TxKeyspace, TxPartitionHandle};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::error::Result;

const LOCK_FILE: &str = "suite.lock";
const KEYSPACE_DIR: &str = "suite";
const PARTITION: &str = "suite";

/// Suite-scoped key/value store shared by every process of one app group.
///
/// Both operations are atomic over all the keys they touch: a `take` never
/// observes half of a `write`, and a `write` racing a `take` lands either
/// entirely before it (and is drained) or entirely after it (and survives).
pub trait SuiteStore: Send + Sync {
    /// Overwrite every entry in one atomic step
    fn write(&self, entries: &[(&str, Vec<u8>)]) -> Result<()>;

    /// Read and remove every key in one atomic step, in key order
    fn take(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>>;
}

/// FjallSuiteStore persists the suite in a transactional Fjall keyspace
///
/// Layout under the group directory:
/// - `suite.lock`: advisory lock file, held around every operation
/// - `suite/`: keyspace with a `suite` partition, UTF-8 key -> value bytes
///
/// The keyspace is opened under the lock for each `write` or `take` and
/// closed again before the lock is released. Several processes (and
/// several handles in one process) can therefore share one group: each
/// operation sees everything committed before it, and no two operations
/// touch the journal at the same time.
#[derive(Debug, Clone)]
pub struct FjallSuiteStore {
    path: PathBuf,
}

impl FjallSuiteStore {
    /// Open or create the store at the given group directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening suite store at: {}", path.display());

        fs::create_dir_all(&path)?;
        let store = Self { path };
        store.with_suite(|_, _| Ok(()))?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one operation on a freshly opened keyspace while holding the
    /// group lock; changes are synced to disk before the lock is released.
    fn with_suite<T>(
        &self,
        op: impl FnOnce(&TxKeyspace, &TxPartitionHandle) -> Result<T>,
    ) -> Result<T> {
        let lock = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.join(LOCK_FILE))?;
        lock.lock()?;

        let keyspace = Config::new(self.path.join(KEYSPACE_DIR)).open_transactional()?;
        let suite = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        let value = op(&keyspace, &suite)?;
        keyspace.persist(PersistMode::SyncAll)?;

        drop(suite);
        drop(keyspace);
        lock.unlock()?;

        Ok(value)
    }
}

impl SuiteStore for FjallSuiteStore {
    fn write(&self, entries: &[(&str, Vec<u8>)]) -> Result<()> {
        self.with_suite(|keyspace, suite| {
            let mut tx = keyspace.write_tx();
            for (key, value) in entries {
                tx.insert(suite, *key, value.as_slice());
            }
            tx.commit()?;
            Ok(())
        })?;

        debug!(keys = entries.len(), "Suite entries written");
        Ok(())
    }

    fn take(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        self.with_suite(|keyspace, suite| {
            let mut tx = keyspace.write_tx();
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                let value = tx.take(suite, *key)?;
                values.push(value.map(|bytes| bytes.to_vec()));
            }
            tx.commit()?;
            Ok(values)
        })
    }
}

/// In-memory suite for tests and single-process hosts
#[derive(Debug, Default)]
pub struct MemorySuiteStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySuiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at a raw entry without consuming it
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SuiteStore for MemorySuiteStore {
    fn write(&self, entries: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn take(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| map.remove(*key)).collect())
    }
}
