//! Cache Module
//!
//! Provides the in-memory item store, its insertion-order eviction policy
//! and the public cache engine.

mod engine;
mod item;
mod order;
mod stats;
mod store;


// Re-export public types
pub use engine::Cache;
pub use item::Item;
pub use stats::AuditStats;

pub(crate) use order::InsertionOrder;
pub(crate) use stats::Counters;
pub(crate) use store::Store;
