//! Memcache - An embeddable in-memory cache
//!
//! Provides a thread-safe key-value cache with a hard capacity bound,
//! per-item lifetimes, immortal items, tags, and background sweeping and
//! auditing.

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use audit::{Auditor, NoopAuditor, TracingAuditor};
pub use cache::{AuditStats, Cache, Item};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
