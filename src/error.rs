//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Every variant is a local, recoverable condition reported to the immediate
/// caller; none of them leaves the cache in an unusable state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Operation required an existing key that is absent
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Put found the key already present
    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// Insertion cannot make room because every resident item is immortal
    #[error("Capacity of {0} items exceeded and no mortal item can be evicted")]
    CapacityExceeded(usize),

    /// Configuration rejected before the cache was built
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background loops need a Tokio runtime to be spawned on
    #[error("No Tokio runtime available to spawn the background loops")]
    NoRuntime,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
