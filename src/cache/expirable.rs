//! Expirable Cache Module
//!
//! TTL layer over [`LruCache`]. Each entry carries the instant it was last
//! accessed; lookups discard entries older than the TTL and refresh the rest.
//! Nothing runs in the background: expired entries are reaped when a lookup
//! touches them or when [`ExpirableCache::cleanup_expired`] is called.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheStats, Entry, Handle, IndexSet, LruCache, Select, Timestamped};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Expirable Cache ==
/// Multi-index LRU cache whose items expire `ttl` after their last access.
///
/// Every path that refreshes an entry's timestamp also moves it to the front
/// of the recency list, so the list tail is always the stalest entry.
pub struct ExpirableCache<T, I> {
    inner: LruCache<T, I, Instant>,
    ttl: Duration,
}

impl<T, I> fmt::Debug for ExpirableCache<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirableCache")
            .field("ttl", &self.ttl)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T, I: IndexSet<T>> ExpirableCache<T, I> {
    // == Constructor ==
    /// Creates an empty cache with the given capacity and TTL.
    ///
    /// Fails with [`CacheError::InvalidTtl`] if `ttl` is zero.
    pub fn new(capacity: usize, ttl: Duration, indices: I) -> Result<Self> {
        validate_ttl(ttl)?;
        Ok(Self {
            inner: LruCache::stamped(capacity, indices),
            ttl,
        })
    }

    /// Creates an empty cache sized and timed by `config`.
    pub fn from_config(config: &Config, indices: I) -> Result<Self> {
        config.validate()?;
        Self::new(config.capacity, config.ttl(), indices)
    }

    // == Emplace ==
    /// Stores an item stamped with the current instant.
    ///
    /// An item sharing a unique key is replaced, re-stamped and moved to the
    /// front instead of being duplicated. Returns the stored item (`None` only
    /// for a zero-capacity cache) and whether it was freshly inserted.
    pub fn emplace(&mut self, value: T) -> (Option<&T>, bool) {
        let (handle, inserted) = self.inner.emplace_with(value, Instant::now());
        (self.inner.entry(handle).map(Entry::value), inserted)
    }

    /// Returns `true` if the item was newly inserted.
    pub fn insert(&mut self, value: T) -> bool {
        self.emplace(value).1
    }

    // == Find ==
    /// Looks an item up through index `N`.
    ///
    /// An expired item is removed and reported as absent. A live item has its
    /// timestamp refreshed and becomes most recently used.
    pub fn find<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> Option<&T>
    where
        I: Select<T, N>,
    {
        let now = Instant::now();
        let live = self
            .inner
            .locate::<N>(key)
            .filter(|&handle| self.refresh_or_expire(handle, now));
        self.inner.stats_mut().record_lookup(live.is_some());
        self.inner.entry(live?).map(Entry::value)
    }

    /// Same as `find(..).is_some()`, with the same expiry and refresh effects.
    pub fn contains<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> bool
    where
        I: Select<T, N>,
    {
        self.find::<N>(key).is_some()
    }

    /// Looks an entry up without checking its TTL or refreshing it.
    ///
    /// May return an entry that is already logically expired.
    pub fn find_no_update<const N: usize>(
        &self,
        key: &<I as Select<T, N>>::Key,
    ) -> Option<&Timestamped<T>>
    where
        I: Select<T, N>,
    {
        self.inner.peek_entry::<N>(key)
    }

    // == Equal Range ==
    /// All live items filed under `key` in index `N`.
    ///
    /// Expired matches are removed as the range is walked; live ones are
    /// refreshed. If anything was removed the range is looked up again before
    /// it is returned.
    pub fn equal_range<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> Vec<&T>
    where
        I: Select<T, N>,
    {
        let now = Instant::now();
        let mut handles = self.inner.locate_all::<N>(key);
        let mut expired = false;
        for &handle in &handles {
            if !self.refresh_or_expire(handle, now) {
                expired = true;
            }
        }
        if expired {
            handles = self.inner.locate_all::<N>(key);
        }

        self.inner.stats_mut().record_lookup(!handles.is_empty());
        let inner = &self.inner;
        handles
            .iter()
            .filter_map(|&handle| inner.entry(handle).map(Entry::value))
            .collect()
    }

    /// All entries filed under `key` in index `N`, without expiry checks or refreshes.
    pub fn equal_range_no_update<const N: usize>(
        &self,
        key: &<I as Select<T, N>>::Key,
    ) -> Vec<&Timestamped<T>>
    where
        I: Select<T, N>,
    {
        self.inner.peek_range::<N>(key)
    }

    /// Removes every item filed under `key` in index `N`, expired or not.
    pub fn erase<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> bool
    where
        I: Select<T, N>,
    {
        self.inner.erase::<N>(key)
    }

    // == Cleanup Expired ==
    /// Removes expired entries starting from the least recently used one.
    ///
    /// Stops at the first live entry; since every refresh also moves the entry
    /// to the front, everything ahead of it was accessed more recently.
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        while let Some(handle) = self.inner.lru_handle() {
            let expired = self
                .inner
                .entry(handle)
                .is_some_and(|entry| entry.is_expired(self.ttl, now));
            if !expired {
                break;
            }
            self.inner.remove(handle);
            removed += 1;
        }

        if removed > 0 {
            self.inner.stats_mut().record_expirations(removed);
            debug!(removed, remaining = self.inner.len(), "expired entries cleaned up");
        }
        removed
    }

    // == TTL ==
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Changes the TTL used by future expiry checks.
    ///
    /// Existing timestamps are left alone, so a shorter TTL may expire items
    /// on their next access.
    pub fn set_ttl(&mut self, ttl: Duration) -> Result<()> {
        validate_ttl(ttl)?;
        self.ttl = ttl;
        Ok(())
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.inner.set_capacity(capacity);
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Entries from most to least recently used, expired ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Timestamped<T>> + '_ {
        self.inner.entries()
    }

    pub fn index_lens(&self) -> Vec<usize> {
        self.inner.index_lens()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// Expires the entry or refreshes it, keeping timestamp and recency paired.
    ///
    /// Returns whether the entry is still live.
    fn refresh_or_expire(&mut self, handle: Handle, now: Instant) -> bool {
        let Some(entry) = self.inner.entry_mut(handle) else {
            return false;
        };
        if entry.is_expired(self.ttl, now) {
            self.inner.remove(handle);
            self.inner.stats_mut().record_expirations(1);
            return false;
        }
        entry.refresh(now);
        self.inner.touch(handle);
        true
    }
}

fn validate_ttl(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(ttl));
    }
    Ok(())
}
