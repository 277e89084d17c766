//! The `KeyValue` property bag.
//!
//! Properties travel as strings and are parsed on read, so a bag can be
//! handed to any driver without agreeing on a typed schema first. Keys are
//! kept ordered which makes snapshots comparable and output deterministic.
//!
//! # Example
//!
//! ```
//! use openmessaging_core::key_value::KeyValue;
//!
//! let mut props = KeyValue::new();
//! props.put("OPERATION_TIMEOUT", 500).put("REGION", "eu-west");
//!
//! assert_eq!(props.get_long("OPERATION_TIMEOUT").unwrap(), Some(500));
//! assert_eq!(props.get_string("REGION"), Some("eu-west"));
//! assert_eq!(props.get_string("missing"), None);
//! ```

use crate::error::{OmsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

/// An owned, string-keyed property bag.
///
/// A `KeyValue` is a value: cloning it produces an independent copy. This is
/// what lets `properties()` accessors hand out snapshots that callers may
/// freely mutate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValue {
    entries: BTreeMap<String, String>,
}

impl KeyValue {
    /// Create an empty property bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert, for constructing bags inline.
    ///
    /// ```
    /// use openmessaging_core::key_value::KeyValue;
    ///
    /// let props = KeyValue::new().with("a", 1).with("b", true);
    /// assert_eq!(props.len(), 2);
    /// ```
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.put(key, value);
        self
    }

    /// Insert or replace a property. Any `ToString` value is accepted.
    pub fn put(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries.insert(key.into(), value.to_string());
        self
    }

    /// Get the raw string value of a property.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a property parsed as `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidProperty`] if the value is present but not an `i32`.
    pub fn get_int(&self, key: &str) -> Result<Option<i32>> {
        self.parse(key, "an integer")
    }

    /// Get a property parsed as `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidProperty`] if the value is present but not an `i64`.
    pub fn get_long(&self, key: &str) -> Result<Option<i64>> {
        self.parse(key, "a long integer")
    }

    /// Get a property parsed as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidProperty`] if the value is present but not a number.
    pub fn get_double(&self, key: &str) -> Result<Option<f64>> {
        self.parse(key, "a floating point number")
    }

    /// Get a property parsed as `bool` (`"true"` / `"false"`).
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidProperty`] if the value is present but not a boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.parse(key, "a boolean")
    }

    fn parse<T: FromStr>(&self, key: &str, expected: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    OmsError::invalid_property(key, format!("expected {expected}, got '{raw}'"))
                })
            })
            .transpose()
    }

    /// Check whether a property is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a property, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Iterate over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `overrides` into `self`, replacing existing keys.
    pub fn overlay(&mut self, overrides: &Self) -> &mut Self {
        for (key, value) in &overrides.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self
    }

    /// Return a new bag holding `self` overlaid with `overrides`.
    ///
    /// ```
    /// use openmessaging_core::key_value::KeyValue;
    ///
    /// let defaults = KeyValue::new().with("a", 1).with("b", 2);
    /// let merged = defaults.merged(&KeyValue::new().with("b", 3));
    ///
    /// assert_eq!(merged.get_string("a"), Some("1"));
    /// assert_eq!(merged.get_string("b"), Some("3"));
    /// assert_eq!(defaults.get_string("b"), Some("2"));
    /// ```
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut merged = self.clone();
        merged.overlay(overrides);
        merged
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for KeyValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kv = Self::new();
        kv.extend(iter);
        kv
    }
}

impl<K: Into<String>, V: ToString> Extend<(K, V)> for KeyValue {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl IntoIterator for KeyValue {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn typed_accessors_parse_values() {
        let props = KeyValue::new()
            .with("int", -12)
            .with("long", 9_000_000_000_i64)
            .with("double", 2.5)
            .with("bool", true);

        assert_eq!(props.get_int("int").unwrap(), Some(-12));
        assert_eq!(props.get_long("long").unwrap(), Some(9_000_000_000));
        assert_eq!(props.get_double("double").unwrap(), Some(2.5));
        assert_eq!(props.get_bool("bool").unwrap(), Some(true));
        assert_eq!(props.get_int("absent").unwrap(), None);
    }

    #[test]
    fn malformed_value_is_invalid_property() {
        let props = KeyValue::new().with("timeout", "soon");
        let err = props.get_long("timeout").unwrap_err();
        assert!(matches!(err, OmsError::InvalidProperty { ref key, .. } if key == "timeout"));
    }

    #[test]
    fn int_overflow_is_rejected() {
        let props = KeyValue::new().with("n", i64::MAX);
        assert!(props.get_int("n").is_err());
        assert_eq!(props.get_long("n").unwrap(), Some(i64::MAX));
    }

    #[test]
    fn display_is_ordered() {
        let props = KeyValue::new().with("b", 2).with("a", 1);
        assert_eq!(props.to_string(), "{a=1, b=2}");
    }

    #[test]
    fn collects_from_pairs() {
        let props: KeyValue = vec![("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    proptest! {
        #[test]
        fn clone_is_detached(
            base in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8),
            key in "[a-z]{1,8}",
            value in "[A-Z]{1,8}",
        ) {
            let original: KeyValue = base.into_iter().collect();
            let before = original.clone();

            let mut snapshot = original.clone();
            snapshot.put(key.clone(), value);
            snapshot.remove(&key);
            snapshot.put("extra", 1);

            prop_assert_eq!(original, before);
        }

        #[test]
        fn overlay_prefers_overrides(
            base in proptest::collection::btree_map("[a-z]{1,4}", "[a-z]{1,4}", 0..6),
            overrides in proptest::collection::btree_map("[a-z]{1,4}", "[A-Z]{1,4}", 0..6),
        ) {
            let base_kv: KeyValue = base.clone().into_iter().collect();
            let override_kv: KeyValue = overrides.clone().into_iter().collect();
            let merged = base_kv.merged(&override_kv);

            for (key, value) in &overrides {
                prop_assert_eq!(merged.get_string(key), Some(value.as_str()));
            }
            for (key, value) in &base {
                if !overrides.contains_key(key) {
                    prop_assert_eq!(merged.get_string(key), Some(value.as_str()));
                }
            }
        }
    }
}
