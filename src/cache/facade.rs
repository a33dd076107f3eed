//! Cache Facade Module
//!
//! The application-facing access point. One `ResponseCache` is constructed
//! with its configuration and passed by reference to every collaborator
//! that needs caching; "one cache per process" is a caller convention, not
//! a language-level static.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::cache::record::ResponseRecord;
use crate::cache::stats::CacheStats;
use crate::cache::store::CacheStore;
use crate::cache::CACHE_FILE_NAME;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Response Cache ==
/// Persistent response cache with lazy, fallible store construction.
///
/// The backing store is built on the first cache operation, using the
/// configuration resolved at that moment (directory resolution and the
/// initial load can fail, so construction errors surface from that first
/// call rather than from `new`). Afterwards a single mutex serializes every
/// operation: a `get` that observes a key never observes a partially
/// applied `set`.
///
/// When disabled, lookups report absent and mutations succeed as no-ops, so
/// callers treat the cache as transparently absent without special-casing.
#[derive(Debug)]
pub struct ResponseCache {
    config: RwLock<CacheConfig>,
    store: OnceCell<Mutex<CacheStore>>,
}

impl ResponseCache {
    // == Constructors ==
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: RwLock::new(config),
            store: OnceCell::new(),
        }
    }

    /// Creates a cache configured from environment variables.
    pub fn from_env() -> Self {
        Self::new(CacheConfig::from_env())
    }

    // == Get ==
    /// Returns the cached payload for `key` while it is still fresh.
    ///
    /// Staleness and absence both report `Ok(None)`; a miss is never an
    /// error. Stale records are left in place (the store keeps age but does
    /// not enforce expiry), so a lowered timeout can be raised again without
    /// losing data.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if self.is_disabled() {
            return Ok(None);
        }
        let timeout = self.freshness_timeout();
        let mut store = lock(self.store()?);
        Ok(store
            .get(key)
            .filter(|record| record.is_fresh(timeout))
            .map(|record| record.payload.clone()))
    }

    /// Returns the raw record for `key` with no freshness judgment.
    ///
    /// For callers applying their own age policy against the record's
    /// creation time.
    pub fn get_record(&self, key: &str) -> Result<Option<ResponseRecord>> {
        if self.is_disabled() {
            return Ok(None);
        }
        let mut store = lock(self.store()?);
        Ok(store.get(key).cloned())
    }

    // == Set ==
    /// Stores `payload` under `key`, replacing any existing record, and
    /// persists the store.
    ///
    /// A persist failure is non-fatal to the cache: the in-memory record
    /// set stays valid, only the on-disk copy is stale until the next
    /// successful rewrite.
    pub fn set(&self, key: impl Into<String>, payload: impl Into<String>) -> Result<()> {
        if self.is_disabled() {
            return Ok(());
        }
        let mut store = lock(self.store()?);
        store.set(ResponseRecord::new(key, payload))?;
        store.persist()
    }

    // == Remove ==
    /// Deletes the record for `key`; a no-op for absent keys.
    pub fn remove(&self, key: &str) -> Result<()> {
        if self.is_disabled() {
            return Ok(());
        }
        let mut store = lock(self.store()?);
        if store.remove(key) {
            store.persist()?;
        }
        Ok(())
    }

    // == Flush All ==
    /// Clears every record and persists the empty store to disk.
    pub fn flush_all(&self) -> Result<()> {
        if self.is_disabled() {
            return Ok(());
        }
        let mut store = lock(self.store()?);
        store.flush_all()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> Result<CacheStats> {
        let store = lock(self.store()?);
        Ok(store.stats())
    }

    // == Configuration Surface ==
    /// Returns whether the cache is disabled.
    pub fn is_disabled(&self) -> bool {
        read_config(&self.config).is_disabled()
    }

    /// Enables or disables the cache for all subsequent operations.
    pub fn set_disabled(&self, disabled: bool) {
        write_config(&self.config).set_disabled(disabled);
    }

    /// Returns the resolved cache directory.
    pub fn directory(&self) -> Result<PathBuf> {
        read_config(&self.config).directory()
    }

    /// Overrides the cache directory.
    ///
    /// The store binds its backing file when the first cache operation
    /// constructs it; calling this afterwards changes only what
    /// [`ResponseCache::directory`] reports.
    pub fn set_directory(&self, directory: impl Into<PathBuf>) {
        write_config(&self.config).set_directory(directory);
    }

    /// Returns the size limit in bytes.
    pub fn size_limit(&self) -> u64 {
        read_config(&self.config).size_limit()
    }

    /// Changes the size limit for all subsequent operations.
    ///
    /// If the store is already constructed the new bound applies at once,
    /// evicting oldest records as needed; the shrunken set reaches disk
    /// with the next persisting operation.
    pub fn set_size_limit(&self, bytes: u64) {
        write_config(&self.config).set_size_limit(bytes);
        if let Some(store) = self.store.get() {
            lock(store).set_size_limit(bytes);
        }
    }

    /// Returns the freshness timeout applied by [`ResponseCache::get`].
    pub fn freshness_timeout(&self) -> Duration {
        read_config(&self.config).freshness_timeout()
    }

    /// Changes the freshness timeout for all subsequent lookups.
    pub fn set_freshness_timeout(&self, timeout: Duration) {
        write_config(&self.config).set_freshness_timeout(timeout);
    }

    // == Lazy Store Construction ==
    /// Returns the store, constructing it on first use.
    ///
    /// Resolves the directory, ensures it exists, and loads the backing
    /// file. An unresolvable or unwritable directory is a configuration
    /// error; callers may catch it and proceed without caching.
    fn store(&self) -> Result<&Mutex<CacheStore>> {
        self.store.get_or_try_init(|| {
            let (directory, size_limit) = {
                let config = read_config(&self.config);
                (config.directory()?, config.size_limit())
            };
            fs::create_dir_all(&directory).map_err(|e| {
                CacheError::Configuration(format!(
                    "cache directory {} is not writable: {e}",
                    directory.display()
                ))
            })?;
            let store = CacheStore::load(directory.join(CACHE_FILE_NAME), size_limit)?;
            debug!(directory = %directory.display(), "Cache store constructed");
            Ok(Mutex::new(store))
        })
    }
}

/// Locks a mutex, recovering the guard if a panicking thread poisoned it.
fn lock(mutex: &Mutex<CacheStore>) -> MutexGuard<'_, CacheStore> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_config(config: &RwLock<CacheConfig>) -> std::sync::RwLockReadGuard<'_, CacheConfig> {
    config.read().unwrap_or_else(|e| e.into_inner())
}

fn write_config(config: &RwLock<CacheConfig>) -> std::sync::RwLockWriteGuard<'_, CacheConfig> {
    config.write().unwrap_or_else(|e| e.into_inner())
}
