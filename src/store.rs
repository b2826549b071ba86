use crate::record::DbRecord;
use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use thiserror::Error;
use tracing::{debug, trace};

/// Counter keys are `auto_increment_<family>`
pub const AUTO_INCREMENT_PREFIX: &str = "auto_increment_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("auto-increment counter {0} is not an 8 byte big-endian integer")]
    CorruptCounter(String),
    #[error("store lock poisoned by a panicked writer")]
    LockPoisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One page of a prefix scan plus the number of keys under the prefix
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
}

#[derive(Debug)]
pub struct IndexerStore {
    pub db_path: PathBuf,
    pub database: DB,
    write_lock: Mutex<()>,
}

impl IndexerStore {
    pub fn new(path: &Path) -> StoreResult<Self> {
        let mut database_opts = rocksdb::Options::default();
        database_opts.create_if_missing(true);
        database_opts.set_max_write_buffer_number(16);
        let database = DB::open(&database_opts, path)?;
        debug!("Opened indexer store at {}", path.display());
        Ok(Self {
            db_path: PathBuf::from(path),
            database,
            write_lock: Mutex::new(()),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the record stored at `key`, `None` if absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        trace!("Getting record at {key}");
        match self.database.get_pinned(key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Pages through every record whose key starts with `prefix`.
    ///
    /// Keys are visited in ascending or descending byte order, the first
    /// `offset` are skipped and at most `limit` are decoded. `total` counts
    /// every key under the prefix regardless of paging.
    pub fn scan_by_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
        ascending: bool,
    ) -> StoreResult<Page<T>> {
        if limit <= 0 {
            return Err(StoreError::InvalidArgument(format!(
                "limit must be positive, got {limit}"
            )));
        }
        if offset < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "offset must not be negative, got {offset}"
            )));
        }
        trace!("Scanning {prefix} (limit {limit}, offset {offset}, ascending {ascending})");

        let prefix_bytes = prefix.as_bytes();
        let snapshot = self.database.snapshot();

        let mut total = 0;
        for entry in snapshot.iterator(IteratorMode::From(prefix_bytes, Direction::Forward)) {
            let (key, _) = entry?;
            if !key.starts_with(prefix_bytes) {
                break;
            }
            total += 1;
        }

        let upper = upper_bound(prefix_bytes);
        let mode = if ascending {
            IteratorMode::From(prefix_bytes, Direction::Forward)
        } else {
            IteratorMode::From(&upper, Direction::Reverse)
        };
        let entries = snapshot.iterator(mode).take_while(|entry| {
            entry
                .as_ref()
                .map_or(true, |(key, _)| key.starts_with(prefix_bytes))
        });

        let mut records = Vec::new();
        for entry in entries.skip(offset as usize).take(limit as usize) {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(Page { records, total })
    }

    /// Runs `f` against a fresh batch while holding the store's write lock.
    ///
    /// The batch is committed atomically iff `f` returns `Ok`; otherwise
    /// nothing `f` staged is written and the error is returned.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreBatch<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| E::from(StoreError::LockPoisoned))?;

        let mut batch = StoreBatch::new(self);
        let output = f(&mut batch)?;
        batch.commit()?;
        Ok(output)
    }

    fn read_counter(&self, counter_key: &str) -> StoreResult<u64> {
        match self.database.get_pinned(counter_key.as_bytes())? {
            None => Ok(0),
            Some(bytes) => decode_counter(counter_key, &bytes),
        }
    }
}

/// Writes staged inside [`IndexerStore::transaction`]. Reads through the
/// batch see its own staged writes, including auto-increment counters.
pub struct StoreBatch<'a> {
    store: &'a IndexerStore,
    staged: BTreeMap<String, Vec<u8>>,
    journal: Vec<(String, Option<Vec<u8>>)>,
}

impl<'a> StoreBatch<'a> {
    fn new(store: &'a IndexerStore) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Stage `record` under its key.
    ///
    /// Records of an auto-increment family are first assigned the family
    /// counter plus one, and the advanced counter is staged alongside.
    /// Returns the assigned id, if any.
    pub fn put<R: DbRecord>(&mut self, record: &mut R) -> StoreResult<Option<u64>> {
        let assigned = match record.auto_increment_family() {
            None => None,
            Some(family) => {
                let counter_key = format!("{AUTO_INCREMENT_PREFIX}{family}");
                let id = self.counter(&counter_key)? + 1;
                record.set_id(id);
                Some((counter_key, id))
            }
        };

        let key = record.key();
        let value = serde_json::to_vec(record)?;
        trace!("Staging record at {key}");

        if let Some((counter_key, id)) = &assigned {
            self.stage(counter_key.clone(), id.to_be_bytes().to_vec());
        }
        self.stage(key, value);
        Ok(assigned.map(|(_, id)| id))
    }

    /// Get the record at `key`, preferring a value staged in this batch
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.staged.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => self.store.get(key),
        }
    }

    /// Runs `f` against this batch; if it fails, everything it staged is
    /// rolled back while earlier writes in the batch are kept.
    pub fn isolated<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let savepoint = self.journal.len();
        let outcome = f(self);
        if outcome.is_err() {
            self.rollback(savepoint);
        }
        outcome
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn counter(&self, counter_key: &str) -> StoreResult<u64> {
        match self.staged.get(counter_key) {
            Some(bytes) => decode_counter(counter_key, bytes),
            None => self.store.read_counter(counter_key),
        }
    }

    fn stage(&mut self, key: String, value: Vec<u8>) {
        let previous = self.staged.insert(key.clone(), value);
        self.journal.push((key, previous));
    }

    fn rollback(&mut self, savepoint: usize) {
        while self.journal.len() > savepoint {
            if let Some((key, previous)) = self.journal.pop() {
                match previous {
                    Some(value) => self.staged.insert(key, value),
                    None => self.staged.remove(&key),
                };
            }
        }
    }

    fn commit(self) -> StoreResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        for (key, value) in &self.staged {
            batch.put(key.as_bytes(), value);
        }
        trace!("Committing {} staged writes", self.staged.len());
        self.store.database.write(batch)?;
        Ok(())
    }
}

fn decode_counter(counter_key: &str, bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::CorruptCounter(counter_key.to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

/// Smallest key sorting after every textual key that starts with `prefix`
fn upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut upper = prefix.to_vec();
    upper.push(0xff);
    upper
}
