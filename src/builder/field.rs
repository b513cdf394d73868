//! Field Extraction Module
//!
//! Strategies for pulling typed keys out of a decoded JSON document.

use std::marker::PhantomData;

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Field Value ==
/// Scalar types a [`Field`] can produce.
pub trait FieldValue: Sized {
    /// Type name used in error messages
    const EXPECTED: &'static str;

    fn from_json(value: &Value) -> Option<Self>;
}

impl FieldValue for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FieldValue for i32 {
    const EXPECTED: &'static str = "i32";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }
}

impl FieldValue for u64 {
    const EXPECTED: &'static str = "u64";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl FieldValue for u32 {
    const EXPECTED: &'static str = "u32";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FieldValue for String {
    const EXPECTED: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FieldValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

// == Key Extractor ==
/// Produces a key (or a tuple of keys) from a document.
///
/// Tuples of extractors yield tuples of keys, which is how composite keys are
/// built.
pub trait KeyExtractor {
    type Output;

    fn extract(&self, doc: &Value) -> Result<Self::Output>;
}

/// Reads the value at a (possibly nested) object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<T> {
    path: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Field<T> {
    /// Top-level field `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::nested([name])
    }

    /// Field reached by descending through `path`, e.g. `["user", "address", "city"]`.
    pub fn nested<P, S>(path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            _marker: PhantomData,
        }
    }

    /// Dotted rendering of the path.
    pub fn path(&self) -> String {
        self.path.join(".")
    }
}

impl<T: FieldValue> KeyExtractor for Field<T> {
    type Output = T;

    fn extract(&self, doc: &Value) -> Result<T> {
        let mut current = doc;
        for name in &self.path {
            current = current
                .get(name)
                .ok_or_else(|| CacheError::MissingField(self.path()))?;
        }
        T::from_json(current).ok_or_else(|| CacheError::FieldType {
            field: self.path(),
            expected: T::EXPECTED,
        })
    }
}

macro_rules! impl_tuple_extractor {
    ($($n:tt => $X:ident),+) => {
        impl<$($X: KeyExtractor),+> KeyExtractor for ($($X,)+) {
            type Output = ($($X::Output,)+);

            fn extract(&self, doc: &Value) -> Result<Self::Output> {
                Ok(($(self.$n.extract(doc)?,)+))
            }
        }
    };
}

impl_tuple_extractor!(0 => A);
impl_tuple_extractor!(0 => A, 1 => B);
impl_tuple_extractor!(0 => A, 1 => B, 2 => C);
impl_tuple_extractor!(0 => A, 1 => B, 2 => C, 3 => D);
impl_tuple_extractor!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);

pub fn int64_field(name: impl Into<String>) -> Field<i64> {
    Field::new(name)
}

pub fn int32_field(name: impl Into<String>) -> Field<i32> {
    Field::new(name)
}

pub fn uint64_field(name: impl Into<String>) -> Field<u64> {
    Field::new(name)
}

pub fn string_field(name: impl Into<String>) -> Field<String> {
    Field::new(name)
}

pub fn double_field(name: impl Into<String>) -> Field<f64> {
    Field::new(name)
}

pub fn bool_field(name: impl Into<String>) -> Field<bool> {
    Field::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_fields() {
        let doc = json!({"id": 42, "name": "Alice", "score": 9.5, "active": true});

        assert_eq!(int64_field("id").extract(&doc).unwrap(), 42);
        assert_eq!(int32_field("id").extract(&doc).unwrap(), 42);
        assert_eq!(uint64_field("id").extract(&doc).unwrap(), 42);
        assert_eq!(string_field("name").extract(&doc).unwrap(), "Alice");
        assert_eq!(double_field("score").extract(&doc).unwrap(), 9.5);
        assert!(bool_field("active").extract(&doc).unwrap());
    }

    #[test]
    fn test_nested_field() {
        let doc = json!({"user": {"address": {"city": "Paris"}}});
        let city: Field<String> = Field::nested(["user", "address", "city"]);

        assert_eq!(city.path(), "user.address.city");
        assert_eq!(city.extract(&doc).unwrap(), "Paris");
    }

    #[test]
    fn test_missing_field() {
        let doc = json!({"user": {}});
        let city: Field<String> = Field::nested(["user", "city"]);

        let err = city.extract(&doc).unwrap_err();
        assert!(matches!(err, CacheError::MissingField(path) if path == "user.city"));
    }

    #[test]
    fn test_wrong_type() {
        let doc = json!({"id": "forty-two"});

        let err = int64_field("id").extract(&doc).unwrap_err();
        assert!(matches!(err, CacheError::FieldType { expected: "i64", .. }));
    }

    #[test]
    fn test_out_of_range_narrowing() {
        let doc = json!({"big": 5_000_000_000_i64, "neg": -1});

        assert!(int32_field("big").extract(&doc).is_err());
        assert!(Field::<u32>::new("neg").extract(&doc).is_err());
    }

    #[test]
    fn test_tuple_extractor_builds_composite_key() {
        let doc = json!({"tenant": 3, "user": 17, "email": "x@test.com"});
        let extractor = (int64_field("tenant"), int64_field("user"), string_field("email"));

        assert_eq!(
            extractor.extract(&doc).unwrap(),
            (3, 17, "x@test.com".to_string())
        );
    }
}
