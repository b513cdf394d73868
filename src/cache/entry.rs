//! Cache Entry Module
//!
//! Defines the stored form of an item: the caller's value plus a per-entry
//! stamp. Plain LRU caches use `()`; expirable caches stamp each entry with
//! the instant it was last accessed.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cached item with its stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T, S = ()> {
    pub(crate) value: T,
    pub(crate) stamp: S,
    /// Position in index filing order
    pub(crate) filing: u64,
}

/// Entry of an expirable cache.
pub type Timestamped<T> = Entry<T, Instant>;

impl<T, S> Entry<T, S> {
    pub(crate) fn new(value: T, stamp: S, filing: u64) -> Self {
        Self {
            value,
            stamp,
            filing,
        }
    }

    /// The stored value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> Entry<T, Instant> {
    /// Instant of the last refreshing access (or insertion).
    pub fn last_accessed(&self) -> Instant {
        self.stamp
    }

    /// Time elapsed since the last refreshing access.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stamp)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl` at `now`.
    ///
    /// Boundary condition: an entry whose age equals the TTL exactly is still
    /// live; it expires once strictly more than `ttl` has elapsed.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) > ttl
    }

    /// Remaining lifetime at `now`, zero once expired.
    pub fn ttl_remaining(&self, ttl: Duration, now: Instant) -> Duration {
        ttl.saturating_sub(self.age(now))
    }

    /// Moves the access stamp forward; it never goes backwards.
    pub(crate) fn refresh(&mut self, now: Instant) {
        if now > self.stamp {
            self.stamp = now;
        }
    }
}
