//! Cache Module
//!
//! Multi-index caching with LRU eviction and optional TTL expiration.

mod entry;
mod expirable;
mod index;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{Entry, Timestamped};
pub use expirable::ExpirableCache;
pub use index::{
    Bucket, HashedIndex, HashedKeys, Index, IndexKind, IndexSet, KeyMap, OrderedIndex, OrderedKeys,
    Select, Uniqueness,
};
pub use lru::{Handle, Iter, RecencyList};
pub use stats::CacheStats;
pub use store::LruCache;
