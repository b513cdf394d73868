//! Index Module
//!
//! Lookup structures that map a projected key onto entry handles. A cache holds
//! a tuple of [`Index`] values; each one is selected by its position at compile
//! time through [`Select`], so a wrong index or key type fails to build.
//!
//! ```
//! use multi_index_lru::{Index, LruCache};
//!
//! struct User {
//!     id: u32,
//!     email: String,
//!     name: String,
//! }
//!
//! const BY_ID: usize = 0;
//! const BY_NAME: usize = 2;
//!
//! let mut cache = LruCache::new(
//!     100,
//!     (
//!         Index::ordered_unique(|u: &User| u.id),
//!         Index::hashed_unique(|u: &User| u.email.clone()),
//!         Index::ordered_non_unique(|u: &User| u.name.clone()),
//!     ),
//! );
//!
//! cache.insert(User { id: 1, email: "a@test.com".into(), name: "Alice".into() });
//! assert!(cache.contains::<BY_ID>(&1));
//! assert_eq!(cache.equal_range::<BY_NAME>(&"Alice".to_string()).len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::cache::Handle;

/// How an index organises its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Hash table keyed by equality
    Hashed,
    /// Sorted tree keyed by comparison
    Ordered,
}

/// Whether an index admits several entries per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniqueness {
    Unique,
    NonUnique,
}

// == Bucket ==
/// Entries filed under one key, oldest filing first.
///
/// Entries are keyed by their filing number, so withdrawing one costs
/// O(log k) in the bucket size.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    filed: BTreeMap<u64, Handle>,
}

impl Bucket {
    pub fn len(&self) -> usize {
        self.filed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filed.is_empty()
    }

    /// Earliest filed entry.
    pub fn first(&self) -> Option<Handle> {
        self.filed.first_key_value().map(|(_, handle)| *handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.filed.values().copied()
    }

    fn file(&mut self, filing: u64, handle: Handle) {
        self.filed.insert(filing, handle);
    }

    fn withdraw(&mut self, filing: u64) -> bool {
        self.filed.remove(&filing).is_some()
    }
}

// == Key Maps ==
/// Storage that maps each key of an index onto its [`Bucket`].
///
/// The key bounds live on the implementations: hashing for [`HashedKeys`],
/// ordering for [`OrderedKeys`].
pub trait KeyMap<K>: Default {
    const KIND: IndexKind;

    fn bucket(&self, key: &K) -> Option<&Bucket>;

    fn bucket_mut(&mut self, key: &K) -> Option<&mut Bucket>;

    fn bucket_or_insert(&mut self, key: K) -> &mut Bucket;

    fn remove_bucket(&mut self, key: &K);

    fn key_count(&self) -> usize;

    fn clear(&mut self);
}

/// Hash table backing for hashed indices.
pub struct HashedKeys<K> {
    map: HashMap<K, Bucket>,
}

impl<K> Default for HashedKeys<K> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq> KeyMap<K> for HashedKeys<K> {
    const KIND: IndexKind = IndexKind::Hashed;

    fn bucket(&self, key: &K) -> Option<&Bucket> {
        self.map.get(key)
    }

    fn bucket_mut(&mut self, key: &K) -> Option<&mut Bucket> {
        self.map.get_mut(key)
    }

    fn bucket_or_insert(&mut self, key: K) -> &mut Bucket {
        self.map.entry(key).or_default()
    }

    fn remove_bucket(&mut self, key: &K) {
        self.map.remove(key);
    }

    fn key_count(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// Sorted tree backing for ordered indices.
pub struct OrderedKeys<K> {
    map: BTreeMap<K, Bucket>,
}

impl<K> Default for OrderedKeys<K> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord> KeyMap<K> for OrderedKeys<K> {
    const KIND: IndexKind = IndexKind::Ordered;

    fn bucket(&self, key: &K) -> Option<&Bucket> {
        self.map.get(key)
    }

    fn bucket_mut(&mut self, key: &K) -> Option<&mut Bucket> {
        self.map.get_mut(key)
    }

    fn bucket_or_insert(&mut self, key: K) -> &mut Bucket {
        self.map.entry(key).or_default()
    }

    fn remove_bucket(&mut self, key: &K) {
        self.map.remove(key);
    }

    fn key_count(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

// == Index ==
/// One lookup structure over the cached items.
///
/// The projection is fixed at construction; composite keys are tuples and
/// compare/hash field by field in declaration order. `M` is the key storage,
/// normally [`HashedKeys`] or [`OrderedKeys`].
pub struct Index<T, K, M> {
    uniqueness: Uniqueness,
    projection: fn(&T) -> K,
    keys: M,
    len: usize,
}

/// Index over a hash table; keys need `Hash + Eq`.
pub type HashedIndex<T, K> = Index<T, K, HashedKeys<K>>;

/// Index over a sorted tree; keys need `Ord`.
pub type OrderedIndex<T, K> = Index<T, K, OrderedKeys<K>>;

impl<T, K: Hash + Eq> Index<T, K, HashedKeys<K>> {
    pub fn hashed_unique(projection: fn(&T) -> K) -> Self {
        Self::with_uniqueness(Uniqueness::Unique, projection)
    }

    pub fn hashed_non_unique(projection: fn(&T) -> K) -> Self {
        Self::with_uniqueness(Uniqueness::NonUnique, projection)
    }
}

impl<T, K: Ord> Index<T, K, OrderedKeys<K>> {
    pub fn ordered_unique(projection: fn(&T) -> K) -> Self {
        Self::with_uniqueness(Uniqueness::Unique, projection)
    }

    pub fn ordered_non_unique(projection: fn(&T) -> K) -> Self {
        Self::with_uniqueness(Uniqueness::NonUnique, projection)
    }
}

impl<T, K, M: KeyMap<K>> Index<T, K, M> {
    pub fn with_uniqueness(uniqueness: Uniqueness, projection: fn(&T) -> K) -> Self {
        Self {
            uniqueness,
            projection,
            keys: M::default(),
            len: 0,
        }
    }

    pub fn kind(&self) -> IndexKind {
        M::KIND
    }

    pub fn uniqueness(&self) -> Uniqueness {
        self.uniqueness
    }

    pub fn is_unique(&self) -> bool {
        self.uniqueness == Uniqueness::Unique
    }

    /// Projects the key this index files `item` under.
    pub fn key_of(&self, item: &T) -> K {
        (self.projection)(item)
    }

    /// Number of entries reachable through this index.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.keys.key_count()
    }

    /// First entry filed under `key`.
    pub(crate) fn find(&self, key: &K) -> Option<Handle> {
        self.keys.bucket(key).and_then(Bucket::first)
    }

    /// Every entry filed under `key`, oldest filing first.
    pub(crate) fn equal_range(&self, key: &K) -> impl Iterator<Item = Handle> + '_ {
        self.keys
            .bucket(key)
            .into_iter()
            .flat_map(|bucket| bucket.handles())
    }

    /// Entry that would clash with `item` on a unique key.
    pub(crate) fn conflict(&self, item: &T) -> Option<Handle> {
        if self.is_unique() {
            self.find(&self.key_of(item))
        } else {
            None
        }
    }

    pub(crate) fn insert(&mut self, item: &T, handle: Handle, filing: u64) {
        let key = self.key_of(item);
        self.keys.bucket_or_insert(key).file(filing, handle);
        self.len += 1;
    }

    /// Withdraws the entry filed as `filing`, dropping its bucket once empty.
    pub(crate) fn remove(&mut self, item: &T, filing: u64) {
        let key = self.key_of(item);
        let Some(bucket) = self.keys.bucket_mut(&key) else {
            return;
        };
        if !bucket.withdraw(filing) {
            return;
        }
        let emptied = bucket.is_empty();
        self.len -= 1;
        if emptied {
            self.keys.remove_bucket(&key);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.len = 0;
    }
}

impl<T, K, M: KeyMap<K>> fmt::Debug for Index<T, K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("kind", &M::KIND)
            .field("uniqueness", &self.uniqueness)
            .field("len", &self.len)
            .finish()
    }
}

// == Index Set ==
/// The full set of indices a cache keeps in sync.
///
/// Implemented for tuples of one to six [`Index`] values over the same item
/// type. `filing` is the entry's filing number; buckets list entries by it.
pub trait IndexSet<T> {
    /// Files `item` under `handle` in every index.
    fn insert(&mut self, item: &T, handle: Handle, filing: u64);

    /// Withdraws `item` (filed as `filing`) from every index.
    fn remove(&mut self, item: &T, filing: u64);

    /// Distinct stored entries sharing a unique key with `item`, in index
    /// declaration order.
    fn conflicts(&self, item: &T) -> Vec<Handle>;

    fn clear(&mut self);

    /// Entry count of each index, in declaration order.
    fn lens(&self) -> Vec<usize>;
}

/// Compile-time access to the index at position `N`.
pub trait Select<T, const N: usize> {
    type Key;
    type Keys: KeyMap<Self::Key>;

    fn index(&self) -> &Index<T, Self::Key, Self::Keys>;
}

macro_rules! impl_index_set {
    ($($n:tt => $K:ident, $M:ident);+) => {
        impl<T, $($K, $M: KeyMap<$K>),+> IndexSet<T> for ($(Index<T, $K, $M>,)+) {
            fn insert(&mut self, item: &T, handle: Handle, filing: u64) {
                $(self.$n.insert(item, handle, filing);)+
            }

            fn remove(&mut self, item: &T, filing: u64) {
                $(self.$n.remove(item, filing);)+
            }

            fn conflicts(&self, item: &T) -> Vec<Handle> {
                let mut found = Vec::new();
                $(
                    if let Some(handle) = self.$n.conflict(item) {
                        if !found.contains(&handle) {
                            found.push(handle);
                        }
                    }
                )+
                found
            }

            fn clear(&mut self) {
                $(self.$n.clear();)+
            }

            fn lens(&self) -> Vec<usize> {
                vec![$(self.$n.len()),+]
            }
        }
    };
}

impl_index_set!(0 => K0, M0);
impl_index_set!(0 => K0, M0; 1 => K1, M1);
impl_index_set!(0 => K0, M0; 1 => K1, M1; 2 => K2, M2);
impl_index_set!(0 => K0, M0; 1 => K1, M1; 2 => K2, M2; 3 => K3, M3);
impl_index_set!(0 => K0, M0; 1 => K1, M1; 2 => K2, M2; 3 => K3, M3; 4 => K4, M4);
impl_index_set!(0 => K0, M0; 1 => K1, M1; 2 => K2, M2; 3 => K3, M3; 4 => K4, M4; 5 => K5, M5);

macro_rules! impl_select {
    ($n:tt => $SK:ident, $SM:ident; $($K:ident, $M:ident);+) => {
        impl<T, $($K, $M: KeyMap<$K>),+> Select<T, $n> for ($(Index<T, $K, $M>,)+) {
            type Key = $SK;
            type Keys = $SM;

            fn index(&self) -> &Index<T, $SK, $SM> {
                &self.$n
            }
        }
    };
}

impl_select!(0 => K0, M0; K0, M0);

impl_select!(0 => K0, M0; K0, M0; K1, M1);
impl_select!(1 => K1, M1; K0, M0; K1, M1);

impl_select!(0 => K0, M0; K0, M0; K1, M1; K2, M2);
impl_select!(1 => K1, M1; K0, M0; K1, M1; K2, M2);
impl_select!(2 => K2, M2; K0, M0; K1, M1; K2, M2);

impl_select!(0 => K0, M0; K0, M0; K1, M1; K2, M2; K3, M3);
impl_select!(1 => K1, M1; K0, M0; K1, M1; K2, M2; K3, M3);
impl_select!(2 => K2, M2; K0, M0; K1, M1; K2, M2; K3, M3);
impl_select!(3 => K3, M3; K0, M0; K1, M1; K2, M2; K3, M3);

impl_select!(0 => K0, M0; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4);
impl_select!(1 => K1, M1; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4);
impl_select!(2 => K2, M2; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4);
impl_select!(3 => K3, M3; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4);
impl_select!(4 => K4, M4; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4);

impl_select!(0 => K0, M0; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
impl_select!(1 => K1, M1; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
impl_select!(2 => K2, M2; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
impl_select!(3 => K3, M3; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
impl_select!(4 => K4, M4; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
impl_select!(5 => K5, M5; K0, M0; K1, M1; K2, M2; K3, M3; K4, M4; K5, M5);
