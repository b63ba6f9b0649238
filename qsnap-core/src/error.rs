//! Error types for qsnap.
//!
//! Malformed snapshots are not errors: they degrade to an empty snapshot.
//! Everything here is either a cache-layer refusal that hydration passes
//! through, or a local validation/serialization failure.

use thiserror::Error;

/// Result type alias using `QsnapError`.
pub type Result<T> = std::result::Result<T, QsnapError>;

/// Main error type for all qsnap operations.
#[derive(Debug, Error)]
pub enum QsnapError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CACHE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The key cannot address an entry in the cache.
    #[error("Invalid query key: {0}")]
    InvalidQueryKey(String),

    /// The cache refused to build another entry.
    #[error("Cache full: capacity of {capacity} queries reached")]
    CacheFull { capacity: usize },

    /// Any other refusal reported by a cache implementation.
    #[error("Cache error: {0}")]
    CacheError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl QsnapError {
    /// Returns true if the error originated in the cache layer.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            QsnapError::InvalidQueryKey(_)
                | QsnapError::CacheFull { .. }
                | QsnapError::CacheError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            QsnapError::ValidationError(_)
                | QsnapError::ConfigError(_)
                | QsnapError::InvalidQueryKey(_)
        )
    }
}
