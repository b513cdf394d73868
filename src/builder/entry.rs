//! Raw Entry Module
//!
//! Serialized payload stored alongside the keys extracted from it.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Raw JSON bytes plus the index keys pulled out of them.
///
/// Index projections read `keys`; the payload is only decoded on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<K> {
    pub keys: K,
    pub data: Vec<u8>,
}

impl<K> RawEntry<K> {
    pub fn new(keys: K, data: Vec<u8>) -> Self {
        Self { keys, data }
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Decodes the payload into a typed value.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D> {
        Ok(serde_json::from_slice(&self.data)?)
    }

    /// Decodes the payload into a JSON document.
    pub fn document(&self) -> Result<Value> {
        self.deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: i64,
        total: f64,
    }

    #[test]
    fn test_deserialize_payload() {
        let entry = RawEntry::new(7_i64, br#"{"id":7,"total":12.5}"#.to_vec());

        assert_eq!(*entry.keys(), 7);
        assert_eq!(
            entry.deserialize::<Order>().unwrap(),
            Order { id: 7, total: 12.5 }
        );
        assert_eq!(entry.document().unwrap()["total"], 12.5);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        let entry = RawEntry::new((), b"not json".to_vec());
        assert!(entry.document().is_err());
        assert_eq!(entry.raw_data(), b"not json");
    }
}
