//! Insertion Order Module
//!
//! Tracks mortal items by insertion sequence for capacity eviction.

use std::collections::BTreeMap;

// == Insertion Order ==
/// Orders mortal keys by the sequence number they were inserted with.
///
/// The first entry of the map is always the oldest surviving mortal
/// insertion, which is the next eviction candidate. Immortal items are not
/// tracked.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    by_sequence: BTreeMap<u64, String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Records a mortal key under its insertion sequence.
    pub fn track(&mut self, sequence: u64, key: &str) {
        self.by_sequence.insert(sequence, key.to_string());
    }

    // == Forget ==
    /// Stops tracking the key inserted with `sequence`.
    pub fn forget(&mut self, sequence: u64) {
        self.by_sequence.remove(&sequence);
    }

    // == Evict Oldest ==
    /// Returns and removes the key with the smallest sequence.
    ///
    /// Returns None if no mortal key is tracked.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.by_sequence.pop_first().map(|(_, key)| key)
    }

    /// Returns the oldest tracked key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.by_sequence.values().next().map(String::as_str)
    }

    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.by_sequence.clear();
    }

    /// Returns the number of tracked keys.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}
