//! Cache Item Module
//!
//! Defines the record stored for every key, with lifetime and expiry helpers.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

// == Item ==
/// A single cached record: the caller's value plus its metadata.
///
/// Items handed out by the cache are snapshots; mutating one never affects
/// the stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Item<V> {
    /// The stored value
    pub value: V,
    /// Tags used for grouping and filtering
    pub tags: BTreeSet<u16>,
    created_at: Instant,
    lifetime: Duration,
    immortal: bool,
    sequence: u64,
}

impl<V> Item<V> {
    // == Constructor ==
    /// Creates a mortal item stamped with the current time.
    ///
    /// A zero `lifetime` means the cache's default lifetime applies.
    pub fn new(value: V, tags: impl IntoIterator<Item = u16>, lifetime: Duration) -> Self {
        Self {
            value,
            tags: tags.into_iter().collect(),
            created_at: Instant::now(),
            lifetime,
            immortal: false,
            sequence: 0,
        }
    }

    /// Time of insertion or of the last value replacement.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The item's own lifetime; zero means "use the default".
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Whether the item is exempt from expiry and eviction.
    pub fn is_immortal(&self) -> bool {
        self.immortal
    }

    /// Insertion sequence assigned by the store; lower is older.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true if the item carries `tag`.
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tags.contains(&tag)
    }

    // == Lifetime ==
    /// Lifetime actually applied to the item.
    pub fn effective_lifetime(&self, default: Duration) -> Duration {
        if self.lifetime.is_zero() {
            default
        } else {
            self.lifetime
        }
    }

    /// Deadline after which a mortal item counts as expired.
    ///
    /// None when the deadline lies beyond what the clock can represent; such
    /// an item never expires.
    pub fn expires_at(&self, default: Duration) -> Option<Instant> {
        self.created_at.checked_add(self.effective_lifetime(default))
    }

    // == Is Expired ==
    /// Checks if the item has expired at `now`.
    ///
    /// Boundary condition: a mortal item is expired once `now` reaches its
    /// deadline. Immortal items never expire.
    pub fn is_expired(&self, now: Instant, default: Duration) -> bool {
        if self.immortal {
            return false;
        }
        self.expires_at(default).is_some_and(|deadline| now >= deadline)
    }

    /// Checks if the item is live at `now`.
    pub fn is_live(&self, now: Instant, default: Duration) -> bool {
        !self.is_expired(now, default)
    }

    /// Returns the time left before expiry, or None for items that never
    /// expire.
    ///
    /// Expired items report `Some(Duration::ZERO)`.
    pub fn remaining(&self, now: Instant, default: Duration) -> Option<Duration> {
        if self.immortal {
            None
        } else {
            self.expires_at(default)
                .map(|deadline| deadline.saturating_duration_since(now))
        }
    }

    // == Store-side mutators ==
    pub(crate) fn assign_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub(crate) fn touch(&mut self) {
        self.created_at = Instant::now();
    }

    pub(crate) fn extend(&mut self, extra: Duration, default: Duration) {
        self.lifetime = self.effective_lifetime(default).saturating_add(extra);
    }

    pub(crate) fn immortalize(&mut self) {
        self.immortal = true;
    }
}
