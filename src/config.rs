//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CACHE_DIR_NAME, DEFAULT_FRESHNESS_TIMEOUT, DEFAULT_SIZE_LIMIT};
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Each setting resolves in order: explicit programmatic override, then the
/// corresponding environment variable, then a computed default. Fields hold
/// `None` while unresolved so an override set later still wins over the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Disabled flag override; `None` means "resolve from the environment"
    disabled: Option<bool>,
    /// Cache directory override
    directory: Option<PathBuf>,
    /// Size limit override, in bytes
    size_limit: Option<u64>,
    /// Freshness timeout override
    freshness_timeout: Option<Duration>,
}

impl CacheConfig {
    /// Creates an empty configuration; every setting resolves lazily.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a CacheConfig with every setting resolved eagerly from
    /// environment variables.
    ///
    /// # Environment Variables
    /// - `RESPONSE_CACHE_DISABLED` - disable the cache entirely (default: false)
    /// - `RESPONSE_CACHE_DIR` - backing file directory (default: platform cache dir)
    /// - `RESPONSE_CACHE_SIZE_LIMIT` - size limit in bytes (default: 50 MiB)
    /// - `RESPONSE_CACHE_TIMEOUT_SECS` - freshness timeout in seconds (default: 3600)
    pub fn from_env() -> Self {
        Self {
            disabled: env::var("RESPONSE_CACHE_DISABLED")
                .ok()
                .and_then(|v| parse_bool(&v)),
            directory: env::var("RESPONSE_CACHE_DIR").ok().map(PathBuf::from),
            size_limit: env::var("RESPONSE_CACHE_SIZE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok()),
            freshness_timeout: env::var("RESPONSE_CACHE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
        }
    }

    // == Disabled Flag ==
    /// Returns whether the cache is disabled.
    ///
    /// Unresolved (`None`) means enabled: callers only see the resolved
    /// boolean, never the tristate.
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    /// Overrides the disabled flag for all subsequent reads.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = Some(disabled);
    }

    // == Cache Directory ==
    /// Resolves the cache directory.
    ///
    /// Falls back to `<platform cache dir>/response-cache` when no override
    /// is set. Fails with a configuration error when no location is
    /// resolvable at all, rather than silently disabling caching.
    pub fn directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.directory {
            return Ok(dir.clone());
        }
        platform_cache_dir().ok_or_else(|| {
            CacheError::Configuration(
                "no cache directory configured and no platform default available".to_string(),
            )
        })
    }

    /// Overrides the cache directory for all subsequent reads.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = Some(directory.into());
    }

    // == Size Limit ==
    /// Returns the size limit in bytes (default 50 MiB).
    pub fn size_limit(&self) -> u64 {
        self.size_limit.unwrap_or(DEFAULT_SIZE_LIMIT)
    }

    /// Overrides the size limit for all subsequent reads.
    pub fn set_size_limit(&mut self, bytes: u64) {
        self.size_limit = Some(bytes);
    }

    // == Freshness Timeout ==
    /// Returns the freshness timeout (default 1 hour).
    pub fn freshness_timeout(&self) -> Duration {
        self.freshness_timeout.unwrap_or(DEFAULT_FRESHNESS_TIMEOUT)
    }

    /// Overrides the freshness timeout for all subsequent reads.
    pub fn set_freshness_timeout(&mut self, timeout: Duration) {
        self.freshness_timeout = Some(timeout);
    }
}

/// Resolves the platform-standard cache directory for this crate.
///
/// Single capability covering every target platform; returns `None` on
/// platforms with no standard cache location.
fn platform_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|base| base.join(CACHE_DIR_NAME))
}

/// Parses common boolean spellings used in environment variables.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
