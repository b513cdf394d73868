//! Multi-Index LRU - an embeddable multi-index cache
//!
//! Keeps a bounded set of items reachable through several hashed or ordered,
//! unique or non-unique indices at once, evicting the least recently used item
//! on overflow. [`ExpirableCache`] adds time-to-live expiration with
//! refresh-on-access.
//!
//! The caches are single-threaded data structures; share them behind a lock
//! (as [`spawn_cleanup_task`] does) when several tasks need access.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    CacheStats, Entry, ExpirableCache, HashedIndex, Index, IndexKind, IndexSet, LruCache,
    OrderedIndex, Select, Timestamped, Uniqueness,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
