//! Cache Statistics Module
//!
//! Tracks the cumulative counters reported by the auditor loop.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Counters ==
/// Cumulative counters kept inside the store, under its lock.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Items created by Put or by Patch inserting a new key
    pub puts: u64,
    /// Items removed to make room for an insertion
    pub evictions: u64,
    /// Items removed by the sweeper after their lifetime elapsed
    pub expirations: u64,
}

impl Counters {
    // == Constructor ==
    /// Creates a new Counters with all values at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the put counter.
    pub fn record_put(&mut self) {
        self.puts += 1;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Adds `count` swept items to the expiration counter.
    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// Captures a stats record for the given resident item count.
    pub fn snapshot(&self, item_count: usize) -> AuditStats {
        AuditStats {
            item_count,
            total_puts: self.puts,
            total_evictions: self.evictions,
            total_expirations: self.expirations,
            captured_at: Utc::now(),
        }
    }
}

// == Audit Stats ==
/// Point-in-time statistics delivered to the audit sink.
///
/// The totals are cumulative since the cache was constructed; Clear does not
/// reset them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStats {
    /// Number of items resident when the record was captured
    pub item_count: usize,
    /// Cumulative item creations
    pub total_puts: u64,
    /// Cumulative capacity evictions
    pub total_evictions: u64,
    /// Cumulative sweep removals
    pub total_expirations: u64,
    /// Wall-clock capture time
    pub captured_at: DateTime<Utc>,
}
