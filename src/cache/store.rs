//! Cache Store Module
//!
//! Main cache engine combining an in-memory HashMap index with a size bound
//! and a flat backing file rewritten on persist.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::persist::{RecordPersister, ResponsePersister};
use crate::cache::record::ResponseRecord;
use crate::cache::stats::CacheStats;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Persistent record store with a byte-size bound and oldest-first eviction.
///
/// Owns the full record set in memory. The backing file is loaded once at
/// construction and rewritten in full on [`CacheStore::persist`]. Not
/// internally synchronized; callers serialize access (the facade holds the
/// store behind a single mutex).
#[derive(Debug)]
pub struct CacheStore {
    /// Key-to-record index
    records: HashMap<String, ResponseRecord>,
    /// Running sum of live payload sizes in bytes
    total_bytes: u64,
    /// Maximum total payload bytes
    size_limit: u64,
    /// In-memory state has diverged from the on-disk copy
    dirty: bool,
    /// Backing file location
    path: PathBuf,
    /// Wire codec for the backing file
    persister: ResponsePersister,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Load ==
    /// Creates a store backed by `path`, loading every record already on disk.
    ///
    /// A missing file yields an empty store. A record that fails to decode
    /// mid-stream truncates the load: every record read before it is kept,
    /// the condition is logged and counted, and no error reaches the caller.
    /// A corrupted cache degrades to a partial cache, never a crash.
    pub fn load(path: impl Into<PathBuf>, size_limit: u64) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            records: HashMap::new(),
            total_bytes: 0,
            size_limit,
            dirty: false,
            path,
            persister: ResponsePersister,
            stats: CacheStats::new(),
        };

        let file = match File::open(&store.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "No backing file, starting empty");
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        loop {
            match store.persister.read(&mut reader) {
                Ok(Some(record)) => {
                    store.total_bytes += record.size_bytes();
                    // Duplicate keys on disk: last record wins
                    if let Some(old) = store.records.insert(record.key.clone(), record) {
                        store.total_bytes -= old.size_bytes();
                    }
                }
                Ok(None) => break,
                Err(CacheError::CorruptRecord(detail)) => {
                    warn!(
                        path = %store.path.display(),
                        loaded = store.records.len(),
                        %detail,
                        "Corrupt record, truncating load"
                    );
                    store.stats.record_corruption();
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            path = %store.path.display(),
            records = store.records.len(),
            bytes = store.total_bytes,
            "Cache loaded"
        );

        // The limit may have been lowered since the file was written
        if store.total_bytes > store.size_limit {
            store.enforce_size_limit(None);
        }

        Ok(store)
    }

    // == Get ==
    /// Looks up a record by key.
    ///
    /// Pure index lookup: no freshness check (freshness is a caller policy
    /// applied to the record's creation time) and no record mutation.
    pub fn get(&mut self, key: &str) -> Option<&ResponseRecord> {
        if self.records.contains_key(key) {
            self.stats.record_hit();
            self.records.get(key)
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Set ==
    /// Inserts or replaces the record for its key.
    ///
    /// When replacing, the old record's size is released first. If the new
    /// total exceeds the size limit, records are evicted oldest creation
    /// time first, never the record just inserted, until the total is back
    /// within bound. Marks the store dirty.
    ///
    /// Rejects keys containing a newline (the on-disk key terminator) and
    /// payloads larger than the size limit itself, leaving the store
    /// unchanged in both cases.
    pub fn set(&mut self, record: ResponseRecord) -> Result<()> {
        if record.key.contains('\n') {
            return Err(CacheError::InvalidKey(
                "key must not contain a newline".to_string(),
            ));
        }
        if record.size_bytes() > self.size_limit {
            return Err(CacheError::PayloadTooLarge {
                size: record.size_bytes(),
                limit: self.size_limit,
            });
        }

        let key = record.key.clone();
        self.total_bytes += record.size_bytes();
        if let Some(old) = self.records.insert(key.clone(), record) {
            self.total_bytes -= old.size_bytes();
        }
        self.dirty = true;

        if self.total_bytes > self.size_limit {
            self.enforce_size_limit(Some(&key));
        }

        self.stats.set_total_entries(self.records.len());
        Ok(())
    }

    // == Remove ==
    /// Deletes the record for `key` if present.
    ///
    /// Returns whether a record was removed. Removing an absent key is a
    /// successful no-op that leaves the size counter and dirty flag alone.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.records.remove(key) {
            Some(old) => {
                self.total_bytes -= old.size_bytes();
                self.dirty = true;
                self.stats.set_total_entries(self.records.len());
                true
            }
            None => false,
        }
    }

    // == Flush All ==
    /// Clears every record and immediately persists the empty store.
    pub fn flush_all(&mut self) -> Result<()> {
        self.records.clear();
        self.total_bytes = 0;
        self.dirty = true;
        self.stats.set_total_entries(0);
        self.persist()
    }

    // == Persist ==
    /// Rewrites the entire backing file from the in-memory record set.
    ///
    /// On failure the in-memory state remains valid and usable; the on-disk
    /// copy is simply stale or missing until the next successful rewrite.
    pub fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);

        // Oldest first, so partially-written files favor the records a
        // truncating reload would keep evicting last
        let mut records: Vec<&ResponseRecord> = self.records.values().collect();
        records.sort_by(|a, b| (a.created_at, &a.key).cmp(&(b.created_at, &b.key)));
        for record in records {
            self.persister.write(&mut writer, record)?;
        }
        writer.flush()?;

        self.dirty = false;
        debug!(
            path = %self.path.display(),
            records = self.records.len(),
            bytes = self.total_bytes,
            "Cache persisted"
        );
        Ok(())
    }

    // == Eviction ==
    /// Evicts records, oldest creation time first, until the total size is
    /// within the limit.
    ///
    /// `protect` shields the record just inserted from its own eviction
    /// pass. Ties on creation time break by key so eviction order is
    /// deterministic. Stops as soon as the total is within bound.
    fn enforce_size_limit(&mut self, protect: Option<&str>) {
        while self.total_bytes > self.size_limit {
            let victim = self
                .records
                .values()
                .filter(|r| Some(r.key.as_str()) != protect)
                .min_by(|a, b| (a.created_at, &a.key).cmp(&(b.created_at, &b.key)))
                .map(|r| r.key.clone());

            let Some(victim) = victim else {
                break;
            };
            if let Some(old) = self.records.remove(&victim) {
                self.total_bytes -= old.size_bytes();
                self.dirty = true;
                self.stats.record_eviction();
                debug!(key = %victim, bytes = old.size_bytes(), "Evicted oldest record");
            }
        }
        self.stats.set_total_entries(self.records.len());
    }

    // == Accessors ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.records.len());
        stats.set_total_bytes(self.total_bytes);
        stats
    }

    /// Returns the running total of live payload bytes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Returns the configured size limit in bytes.
    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// Changes the size limit, evicting oldest records if the current total
    /// no longer fits.
    pub fn set_size_limit(&mut self, size_limit: u64) {
        self.size_limit = size_limit;
        if self.total_bytes > self.size_limit {
            self.enforce_size_limit(None);
        }
    }

    /// Returns whether in-memory state has unwritten changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
