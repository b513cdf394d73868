//! Entry Builder Module
//!
//! Produces [`RawEntry`] values whose index keys were extracted from a
//! serialized JSON payload. The cache never parses payloads itself; index
//! projections only read the precomputed `keys`.
//!
//! ```
//! use multi_index_lru::builder::{int64_field, string_field, EntryBuilder, RawEntry};
//! use multi_index_lru::{Index, LruCache};
//!
//! type Keys = (i64, String);
//!
//! let builder = EntryBuilder::new((int64_field("id"), string_field("email")));
//! let mut cache = LruCache::new(
//!     10,
//!     (
//!         Index::hashed_unique(|e: &RawEntry<Keys>| e.keys.0),
//!         Index::hashed_unique(|e: &RawEntry<Keys>| e.keys.1.clone()),
//!     ),
//! );
//!
//! let entry = builder.build(br#"{"id": 1, "email": "a@test.com"}"#).unwrap();
//! cache.insert(entry);
//! assert!(cache.contains::<1>(&"a@test.com".to_string()));
//! ```

mod entry;
mod field;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub use entry::RawEntry;
pub use field::{
    bool_field, double_field, int32_field, int64_field, string_field, uint64_field, Field,
    FieldValue, KeyExtractor,
};

// == Entry Builder ==
/// Builds entries by running a [`KeyExtractor`] over each payload.
#[derive(Debug, Clone)]
pub struct EntryBuilder<X> {
    extractor: X,
}

impl<X: KeyExtractor> EntryBuilder<X> {
    pub fn new(extractor: X) -> Self {
        Self { extractor }
    }

    /// Decodes `data` and extracts its keys.
    pub fn build(&self, data: &[u8]) -> Result<RawEntry<X::Output>> {
        let doc: Value = serde_json::from_slice(data)?;
        self.build_from(&doc, data)
    }

    /// Extracts keys from an already decoded document; `data` is stored as-is.
    pub fn build_from(&self, doc: &Value, data: &[u8]) -> Result<RawEntry<X::Output>> {
        let keys = self.extractor.extract(doc)?;
        Ok(RawEntry::new(keys, data.to_vec()))
    }

    /// Serializes `value` to JSON and builds an entry from it.
    pub fn build_value<V: Serialize>(&self, value: &V) -> Result<RawEntry<X::Output>> {
        let doc = serde_json::to_value(value)?;
        let data = serde_json::to_vec(&doc)?;
        self.build_from(&doc, &data)
    }
}
