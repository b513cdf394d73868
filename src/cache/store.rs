//! Cache Store Module
//!
//! Main cache engine: a recency list holding every entry plus a set of indices
//! that point into it. All structural changes go through this type so the list
//! and every index always describe the same items.

use std::fmt;

use tracing::{debug, trace};

use crate::cache::{CacheStats, Entry, Handle, IndexSet, RecencyList, Select};

// == LRU Cache ==
/// Bounded multi-index cache with LRU eviction.
///
/// `T` is the stored item, `I` a tuple of [`Index`](crate::Index) values over
/// `T`, and `S` a per-entry stamp (`()` for a plain LRU cache).
///
/// Every successful lookup marks the item as most recently used, so even
/// "reads" take `&mut self`.
pub struct LruCache<T, I, S = ()> {
    /// Entry arena in recency order
    entries: RecencyList<Entry<T, S>>,
    indices: I,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Filing number handed to the next stored or replaced entry
    next_filing: u64,
    stats: CacheStats,
}

impl<T, I, S> fmt::Debug for LruCache<T, I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<T, I: IndexSet<T>> LruCache<T, I> {
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` items.
    ///
    /// A capacity of zero is accepted and keeps the cache permanently empty.
    pub fn new(capacity: usize, indices: I) -> Self {
        Self::stamped(capacity, indices)
    }

    // == Emplace ==
    /// Stores an item, refreshing any item that shares a unique key with it.
    ///
    /// If a unique index already holds the item's key, that item's value is
    /// replaced and it becomes most recently used. Otherwise the item is
    /// inserted at the front and, if the cache overflows, the least recently
    /// used item is evicted.
    ///
    /// Returns the stored item (`None` only for a zero-capacity cache) and
    /// whether it was freshly inserted.
    pub fn emplace(&mut self, value: T) -> (Option<&T>, bool) {
        let (handle, inserted) = self.emplace_with(value, ());
        (self.entries.get(handle).map(Entry::value), inserted)
    }

    /// Returns `true` if the item was newly inserted.
    pub fn insert(&mut self, value: T) -> bool {
        self.emplace(value).1
    }
}

impl<T, I: IndexSet<T>, S> LruCache<T, I, S> {
    /// Empty cache whose entries carry an `S` stamp.
    pub(crate) fn stamped(capacity: usize, indices: I) -> Self {
        Self {
            entries: RecencyList::new(),
            indices,
            capacity,
            next_filing: 0,
            stats: CacheStats::new(),
        }
    }

    // == Find ==
    /// Looks an item up through index `N` and marks it most recently used.
    pub fn find<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> Option<&T>
    where
        I: Select<T, N>,
    {
        let handle = self.locate::<N>(key);
        self.stats.record_lookup(handle.is_some());
        let handle = handle?;
        self.entries.move_to_front(handle);
        self.entries.get(handle).map(Entry::value)
    }

    /// Same as `find(..).is_some()`, including the recency refresh.
    pub fn contains<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> bool
    where
        I: Select<T, N>,
    {
        self.find::<N>(key).is_some()
    }

    /// Looks an item up without touching its recency.
    pub fn find_no_update<const N: usize>(&self, key: &<I as Select<T, N>>::Key) -> Option<&T>
    where
        I: Select<T, N>,
    {
        self.peek_entry::<N>(key).map(Entry::value)
    }

    // == Equal Range ==
    /// All items filed under `key` in index `N`; each is marked most recently used.
    pub fn equal_range<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> Vec<&T>
    where
        I: Select<T, N>,
    {
        let handles = self.locate_all::<N>(key);
        self.stats.record_lookup(!handles.is_empty());
        for &handle in &handles {
            self.entries.move_to_front(handle);
        }
        let entries = &self.entries;
        handles
            .iter()
            .filter_map(|&handle| entries.get(handle).map(Entry::value))
            .collect()
    }

    /// All items filed under `key` in index `N`, recency untouched.
    pub fn equal_range_no_update<const N: usize>(&self, key: &<I as Select<T, N>>::Key) -> Vec<&T>
    where
        I: Select<T, N>,
    {
        self.peek_range::<N>(key)
            .into_iter()
            .map(Entry::value)
            .collect()
    }

    // == Erase ==
    /// Removes every item filed under `key` in index `N` from all indices.
    ///
    /// Returns whether anything was removed.
    pub fn erase<const N: usize>(&mut self, key: &<I as Select<T, N>>::Key) -> bool
    where
        I: Select<T, N>,
    {
        let handles = self.locate_all::<N>(key);
        for &handle in &handles {
            self.remove(handle);
        }
        if handles.len() > 1 {
            debug!(count = handles.len(), "erased items sharing one key");
        }
        !handles.is_empty()
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the bound, evicting least recently used items until it holds.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            if self.evict_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        if evicted > 0 {
            debug!(capacity, evicted, "capacity reduced");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every item from the recency list and all indices.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.indices.clear();
    }

    /// Items from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(Entry::value)
    }

    /// Item count of every index in declaration order; each equals `len()`.
    pub fn index_lens(&self) -> Vec<usize> {
        self.indices.lens()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Entry-level access ==
    // Used by the expirable wrapper, which keeps its access stamp in `S`.

    /// Stores `value` stamped with `stamp`, returning its handle and whether
    /// it was freshly inserted.
    pub(crate) fn emplace_with(&mut self, value: T, stamp: S) -> (Handle, bool) {
        let conflicts = self.indices.conflicts(&value);
        match conflicts.split_first() {
            Some((&target, displaced)) => {
                for &other in displaced {
                    self.remove(other);
                }
                if !displaced.is_empty() {
                    self.stats.record_displacements(displaced.len());
                    debug!(
                        count = displaced.len(),
                        "removed items clashing with the replacement on another unique key"
                    );
                }
                self.replace(target, value, stamp);
                self.entries.move_to_front(target);
                self.stats.record_update();
                (target, false)
            }
            None => {
                let filing = self.take_filing();
                let handle = self.entries.push_front(Entry::new(value, stamp, filing));
                if let Some(entry) = self.entries.get(handle) {
                    self.indices.insert(&entry.value, handle, filing);
                }
                self.stats.record_insertion();
                if self.entries.len() > self.capacity {
                    self.evict_lru();
                }
                (handle, true)
            }
        }
    }

    pub(crate) fn locate<const N: usize>(&self, key: &<I as Select<T, N>>::Key) -> Option<Handle>
    where
        I: Select<T, N>,
    {
        <I as Select<T, N>>::index(&self.indices).find(key)
    }

    pub(crate) fn locate_all<const N: usize>(&self, key: &<I as Select<T, N>>::Key) -> Vec<Handle>
    where
        I: Select<T, N>,
    {
        <I as Select<T, N>>::index(&self.indices)
            .equal_range(key)
            .collect()
    }

    pub(crate) fn peek_entry<const N: usize>(
        &self,
        key: &<I as Select<T, N>>::Key,
    ) -> Option<&Entry<T, S>>
    where
        I: Select<T, N>,
    {
        self.locate::<N>(key)
            .and_then(|handle| self.entries.get(handle))
    }

    pub(crate) fn peek_range<const N: usize>(
        &self,
        key: &<I as Select<T, N>>::Key,
    ) -> Vec<&Entry<T, S>>
    where
        I: Select<T, N>,
    {
        <I as Select<T, N>>::index(&self.indices)
            .equal_range(key)
            .filter_map(|handle| self.entries.get(handle))
            .collect()
    }

    pub(crate) fn entry(&self, handle: Handle) -> Option<&Entry<T, S>> {
        self.entries.get(handle)
    }

    pub(crate) fn entry_mut(&mut self, handle: Handle) -> Option<&mut Entry<T, S>> {
        self.entries.get_mut(handle)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry<T, S>> + '_ {
        self.entries.iter()
    }

    /// Marks an entry most recently used.
    pub(crate) fn touch(&mut self, handle: Handle) {
        self.entries.move_to_front(handle);
    }

    /// Handle of the least recently used entry.
    pub(crate) fn lru_handle(&self) -> Option<Handle> {
        self.entries.back()
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Detaches an entry from the recency list and every index.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<Entry<T, S>> {
        let entry = self.entries.remove(handle)?;
        self.indices.remove(&entry.value, entry.filing);
        Some(entry)
    }

    /// Swaps in a new value and re-files it at the end of its buckets.
    fn replace(&mut self, handle: Handle, value: T, stamp: S) {
        let filing = self.take_filing();
        if let Some(entry) = self.entries.get_mut(handle) {
            self.indices.remove(&entry.value, entry.filing);
            entry.value = value;
            entry.stamp = stamp;
            entry.filing = filing;
            self.indices.insert(&entry.value, handle, filing);
        }
    }

    fn take_filing(&mut self) -> u64 {
        let filing = self.next_filing;
        self.next_filing += 1;
        filing
    }

    fn evict_lru(&mut self) -> Option<Entry<T, S>> {
        let handle = self.entries.back()?;
        let evicted = self.remove(handle)?;
        self.stats.record_eviction();
        trace!(
            len = self.entries.len(),
            capacity = self.capacity,
            "evicted least recently used item"
        );
        Some(evicted)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{HashedIndex, Index, OrderedIndex};

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: u32,
        email: String,
        name: String,
    }

    fn user(id: u32, email: &str, name: &str) -> User {
        User {
            id,
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    const BY_ID: usize = 0;
    const BY_EMAIL: usize = 1;
    const BY_NAME: usize = 2;

    type UserIndices = (
        OrderedIndex<User, u32>,
        HashedIndex<User, String>,
        OrderedIndex<User, String>,
    );

    fn user_cache(capacity: usize) -> LruCache<User, UserIndices> {
        LruCache::new(
            capacity,
            (
                Index::ordered_unique(|u: &User| u.id),
                Index::hashed_unique(|u: &User| u.email.clone()),
                Index::ordered_non_unique(|u: &User| u.name.clone()),
            ),
        )
    }

    fn ids(cache: &LruCache<User, UserIndices>) -> Vec<u32> {
        cache.iter().map(|u| u.id).collect()
    }

    fn assert_consistent(cache: &LruCache<User, UserIndices>) {
        assert_eq!(cache.index_lens(), vec![cache.len(); 3]);
        assert_eq!(cache.iter().count(), cache.len());
        assert!(cache.len() <= cache.capacity());
    }

    #[test]
    fn test_store_new() {
        let cache = user_cache(3);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_find_through_every_index() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "alice@test.com", "Alice"));
        cache.insert(user(2, "bob@test.com", "Bob"));
        cache.insert(user(3, "charlie@test.com", "Charlie"));

        assert_eq!(cache.find::<BY_ID>(&1).map(|u| u.name.as_str()), Some("Alice"));
        assert_eq!(
            cache.find::<BY_EMAIL>(&"bob@test.com".to_string()).map(|u| u.id),
            Some(2)
        );
        assert_eq!(
            cache.find::<BY_NAME>(&"Charlie".to_string()).map(|u| u.email.as_str()),
            Some("charlie@test.com")
        );
        assert!(cache.find::<BY_ID>(&99).is_none());
        assert_consistent(&cache);
    }

    #[test]
    fn test_lru_eviction_respects_access_order() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(2, "b@test.com", "B"));
        cache.insert(user(3, "c@test.com", "C"));

        cache.find::<BY_ID>(&1);
        cache.find::<BY_ID>(&3);
        assert_eq!(ids(&cache), vec![3, 1, 2]);

        assert!(cache.insert(user(4, "d@test.com", "D")));

        assert_eq!(ids(&cache), vec![4, 3, 1]);
        assert!(cache.find_no_update::<BY_EMAIL>(&"b@test.com".to_string()).is_none());
        assert_eq!(cache.stats().evictions, 1);
        assert_consistent(&cache);
    }

    #[test]
    fn test_emplace_existing_replaces_payload() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(2, "b@test.com", "B"));

        let (stored, inserted) = cache.emplace(user(1, "a2@test.com", "A2"));

        assert!(!inserted);
        assert_eq!(stored.map(|u| u.name.as_str()), Some("A2"));
        assert_eq!(cache.len(), 2);
        assert_eq!(ids(&cache), vec![1, 2]);
        // Secondary indices follow the new payload
        assert!(cache.find_no_update::<BY_EMAIL>(&"a@test.com".to_string()).is_none());
        assert!(cache.find_no_update::<BY_EMAIL>(&"a2@test.com".to_string()).is_some());
        assert_consistent(&cache);
    }

    #[test]
    fn test_emplace_displaces_other_unique_clash() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(2, "b@test.com", "B"));

        // Same id as 1, same email as 2
        assert!(!cache.insert(user(1, "b@test.com", "A")));

        assert_eq!(ids(&cache), vec![1]);
        assert_eq!(
            cache.find::<BY_EMAIL>(&"b@test.com".to_string()).map(|u| u.id),
            Some(1)
        );
        let stats = cache.stats();
        assert_eq!(stats.displacements, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.evictions, 0);
        assert_consistent(&cache);
    }

    #[test]
    fn test_erase() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(2, "b@test.com", "B"));

        assert!(cache.erase::<BY_ID>(&1));
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains::<BY_ID>(&1));
        assert!(cache.contains::<BY_ID>(&2));

        // Erase non-existent
        assert!(!cache.erase::<BY_ID>(&999));
        assert_consistent(&cache);
    }

    #[test]
    fn test_erase_non_unique_removes_whole_bucket() {
        let mut cache = user_cache(5);
        cache.insert(user(1, "a@test.com", "John"));
        cache.insert(user(2, "b@test.com", "John"));
        cache.insert(user(3, "c@test.com", "Jane"));

        assert!(cache.erase::<BY_NAME>(&"John".to_string()));

        assert_eq!(ids(&cache), vec![3]);
        assert_consistent(&cache);
    }

    #[test]
    fn test_equal_range_refreshes_each_match() {
        let mut cache = user_cache(4);
        cache.insert(user(1, "a@test.com", "John"));
        cache.insert(user(2, "b@test.com", "John"));
        cache.insert(user(3, "c@test.com", "Jane"));
        cache.insert(user(4, "d@test.com", "Jim"));

        let johns: Vec<u32> = cache
            .equal_range::<BY_NAME>(&"John".to_string())
            .iter()
            .map(|u| u.id)
            .collect();

        assert_eq!(johns, vec![1, 2]);
        assert_eq!(ids(&cache), vec![2, 1, 4, 3]);
        assert!(cache.equal_range::<BY_NAME>(&"Nobody".to_string()).is_empty());
    }

    #[test]
    fn test_no_update_lookups_keep_order() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "John"));
        cache.insert(user(2, "b@test.com", "John"));

        assert!(cache.find_no_update::<BY_ID>(&1).is_some());
        assert_eq!(cache.equal_range_no_update::<BY_NAME>(&"John".to_string()).len(), 2);

        assert_eq!(ids(&cache), vec![2, 1]);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_set_capacity_evicts_tail_first() {
        let mut cache = user_cache(5);
        for id in 1..=5 {
            cache.insert(user(id, &format!("{id}@test.com"), "X"));
        }

        cache.set_capacity(2);

        assert_eq!(cache.capacity(), 2);
        assert_eq!(ids(&cache), vec![5, 4]);
        assert_eq!(cache.stats().evictions, 3);
        assert_consistent(&cache);
    }

    #[test]
    fn test_eviction_from_shared_bucket_keeps_filing_order() {
        let mut cache = user_cache(1_000);
        for id in 0..3_000 {
            cache.insert(user(id, &format!("{id}@test.com"), "Same"));
        }

        let survivors: Vec<u32> = cache
            .equal_range_no_update::<BY_NAME>(&"Same".to_string())
            .iter()
            .map(|u| u.id)
            .collect();

        assert_eq!(survivors, (2_000..3_000u32).collect::<Vec<_>>());
        assert_eq!(cache.stats().evictions, 2_000);
        assert_consistent(&cache);
    }

    #[test]
    fn test_clear() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(2, "b@test.com", "B"));

        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_consistent(&cache);

        // Usable after clear
        assert!(cache.insert(user(1, "a@test.com", "A")));
        assert_consistent(&cache);
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut cache = user_cache(0);

        let (stored, inserted) = cache.emplace(user(1, "a@test.com", "A"));

        assert!(inserted);
        assert!(stored.is_none());
        assert!(cache.is_empty());
        assert_consistent(&cache);
    }

    #[test]
    fn test_stats_hits_and_misses() {
        let mut cache = user_cache(3);
        cache.insert(user(1, "a@test.com", "A"));
        cache.insert(user(1, "a@test.com", "A"));
        cache.find::<BY_ID>(&1);
        cache.find::<BY_ID>(&2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
