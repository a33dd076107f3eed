//! Cache Record Module
//!
//! Defines the structure for individual cached response records.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Response Record ==
/// Represents a single cached response with its key and creation time.
///
/// The creation time is set once and never mutated; the cache stores the
/// record's age but never enforces expiry on its own. Freshness is a
/// judgment applied by callers via [`ResponseRecord::is_fresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Unique identity of the cached request (e.g. canonicalized URL)
    pub key: String,
    /// Opaque cached content
    pub payload: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ResponseRecord {
    // == Constructor ==
    /// Creates a new record stamped with the current time.
    pub fn new(key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a record with an explicit creation time.
    ///
    /// Used when decoding records from disk, where the original stamp must
    /// survive the round trip.
    pub fn with_created_at(
        key: impl Into<String>,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            created_at,
        }
    }

    // == Size ==
    /// Returns the payload size in bytes, used for capacity accounting.
    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }

    // == Freshness ==
    /// Checks whether the record is still fresh under the given timeout.
    ///
    /// A record is fresh while `now - created_at <= timeout`. Records with
    /// a creation time in the future count as fresh.
    pub fn is_fresh(&self, timeout: Duration) -> bool {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        Utc::now().signed_duration_since(self.created_at) <= timeout
    }
}
