//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// A cache miss is not an error: lookups return `Ok(None)` for absent keys.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be resolved or created
    #[error("Cache configuration error: {0}")]
    Configuration(String),

    /// A single on-disk record failed to decode
    #[error("Corrupt cache record: {0}")]
    CorruptRecord(String),

    /// Key contains bytes the on-disk encoding cannot represent
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Payload larger than the configured size limit
    #[error("Payload of {size} bytes exceeds the size limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// I/O failure reading or rewriting the backing file
    #[error("Cache I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_detail() {
        let err = CacheError::Configuration("no cache directory".to_string());
        assert!(err.to_string().contains("no cache directory"));

        let err = CacheError::CorruptRecord("unterminated key".to_string());
        assert!(err.to_string().contains("unterminated key"));
    }

    #[test]
    fn test_payload_too_large_reports_both_sizes() {
        let err = CacheError::PayloadTooLarge {
            size: 200,
            limit: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
