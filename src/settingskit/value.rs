//! # Store Values
//!
//! [`Value`] is what a backend actually holds for a key: untyped as far as the schema is
//! concerned, but always one of a closed set of shapes. Typed access goes through
//! [`crate::codec::SettingValue`], which knows how to coerce each shape (a registry hive hands
//! back a `String` where a file store keeps a `Double`, and both must read as `f64`).
//!
//! `Bytes` only ever comes *out* of a backend (a binary registry value written by another
//! program). It cannot be written back and cannot be declared in a schema.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// The shape of a [`Value`], also used by schema descriptors to declare leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    StringArray,
    Int,
    IntArray,
    Double,
    DoubleArray,
    Decimal,
    DecimalArray,
    Bool,
    BoolArray,
    DateTime,
    DateTimeArray,
    Duration,
    DurationArray,
    Map,
    Bytes,
}

impl ValueKind {
    /// Whether values of this kind can be written to a store.
    pub fn is_supported(self) -> bool {
        !matches!(self, ValueKind::Bytes)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueKind::StringArray
                | ValueKind::IntArray
                | ValueKind::DoubleArray
                | ValueKind::DecimalArray
                | ValueKind::BoolArray
                | ValueKind::DateTimeArray
                | ValueKind::DurationArray
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::StringArray => "string-array",
            ValueKind::Int => "int",
            ValueKind::IntArray => "int-array",
            ValueKind::Double => "double",
            ValueKind::DoubleArray => "double-array",
            ValueKind::Decimal => "decimal",
            ValueKind::DecimalArray => "decimal-array",
            ValueKind::Bool => "bool",
            ValueKind::BoolArray => "bool-array",
            ValueKind::DateTime => "datetime",
            ValueKind::DateTimeArray => "datetime-array",
            ValueKind::Duration => "duration",
            ValueKind::DurationArray => "duration-array",
            ValueKind::Map => "map",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An untyped value as held by a settings backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    StringArray(Vec<String>),
    Int(i64),
    IntArray(Vec<i64>),
    Double(f64),
    DoubleArray(Vec<f64>),
    Decimal(Decimal),
    DecimalArray(Vec<Decimal>),
    Bool(bool),
    BoolArray(Vec<bool>),
    DateTime(DateTime<Utc>),
    DateTimeArray(Vec<DateTime<Utc>>),
    Duration(TimeDelta),
    DurationArray(Vec<TimeDelta>),
    Map(SettingsMap),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::StringArray(_) => ValueKind::StringArray,
            Value::Int(_) => ValueKind::Int,
            Value::IntArray(_) => ValueKind::IntArray,
            Value::Double(_) => ValueKind::Double,
            Value::DoubleArray(_) => ValueKind::DoubleArray,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::DecimalArray(_) => ValueKind::DecimalArray,
            Value::Bool(_) => ValueKind::Bool,
            Value::BoolArray(_) => ValueKind::BoolArray,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::DateTimeArray(_) => ValueKind::DateTimeArray,
            Value::Duration(_) => ValueKind::Duration,
            Value::DurationArray(_) => ValueKind::DurationArray,
            Value::Map(_) => ValueKind::Map,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::format_value(self))
    }
}

/// An insertion-ordered map of string keys to string values.
///
/// Inserting an existing key replaces its value in place, so the position of a key never
/// changes once added. Stores persist it as the flat sequence `[k0, v0, k1, v1, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsMap {
    entries: Vec<(String, String)>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SettingsMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SettingsMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_insertion_order() {
        let mut map = SettingsMap::new();
        map.insert("a", "va");
        map.insert("aa", "vaa");
        map.insert("B", "vB");

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["a", "aa", "B"]);
    }

    #[test]
    fn test_map_replace_keeps_position() {
        let mut map: SettingsMap = [("x", "1"), ("y", "2")].into_iter().collect();
        let old = map.insert("x", "3");

        assert_eq!(old, Some("1".to_string()));
        assert_eq!(map.iter().next(), Some(("x", "3")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_remove() {
        let mut map: SettingsMap = [("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(map.remove("x"), Some("1".to_string()));
        assert_eq!(map.remove("x"), None);
        assert!(!map.contains_key("x"));
        assert_eq!(map.get("y"), Some("2"));
    }

    #[test]
    fn test_kind_flags() {
        assert!(ValueKind::IntArray.is_array());
        assert!(!ValueKind::Map.is_array());
        assert!(!ValueKind::Bytes.is_supported());
        assert_eq!(Value::Double(1.5).kind(), ValueKind::Double);
        assert_eq!(ValueKind::DurationArray.to_string(), "duration-array");
    }
}
