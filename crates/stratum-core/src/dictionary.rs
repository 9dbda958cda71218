//! Ordered configuration dictionary and its value model.
//!
//! A [`Dictionary`] is the flattened input document that drives component
//! creation: name-keyed, order-preserving, with scalar leaves, lists, and
//! nested dictionaries. JSON is the on-disk form; [`Dictionary::from_json_str`]
//! maps objects onto [`Value::Dict`], arrays onto [`Value::List`], and
//! numbers onto [`Value::Int`] / [`Value::UInt`] / [`Value::Double`].
//!
//! Scalar access is coercing: an integer entry read through
//! [`Dictionary::get_double`] converts, and a numeric-looking string parses.
//! Non-numeric strings never coerce to numbers; the component factory treats
//! those as indirection keys instead.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::text::string_is_numeric;

// ── Value ──────────────────────────────────────────────────────────────────

/// A single dictionary entry value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean leaf.
    Bool(bool),
    /// Signed integer leaf.
    Int(i64),
    /// Unsigned integer leaf (JSON numbers too large for `i64`).
    UInt(u64),
    /// Floating-point leaf.
    Double(f64),
    /// String leaf.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Nested dictionary.
    Dict(Dictionary),
}

impl Value {
    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Coerce to `f64`. Numeric variants convert; numeric-looking strings
    /// parse; everything else is `None`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::String(s) if string_is_numeric(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Coerce to `i64`. Doubles truncate toward zero.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Double(d) => Some(*d as i64),
            Value::String(s) if string_is_numeric(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|d| d as i64)),
            _ => None,
        }
    }

    /// Coerce to `u64`. Negative values are `None`.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::Double(d) if *d >= 0.0 => Some(*d as u64),
            Value::String(s) if string_is_numeric(s) => s
                .parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|d| *d >= 0.0).map(|d| d as u64)),
            _ => None,
        }
    }

    /// Coerce to `bool`. Accepts the literals `true`/`false` (any case),
    /// `"1"`/`"0"`, and nonzero integers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::UInt(u) => Some(*u != 0),
            Value::String(s) => {
                if s.eq_ignore_ascii_case("true") || s == "1" {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") || s == "0" {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The string contents, if this is a string leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The list contents, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The nested dictionary, if this is one.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Convert a parsed JSON value into the dictionary value model.
    pub fn from_json(raw: serde_json::Value) -> Value {
        match raw {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut dict = Dictionary::new();
                for (key, value) in map {
                    dict.set(key, Value::from_json(value));
                }
                Value::Dict(dict)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Dictionary> for Value {
    fn from(d: Dictionary) -> Self {
        Value::Dict(d)
    }
}

// ── Dictionary ─────────────────────────────────────────────────────────────

/// Ordered, name-keyed map of [`Value`]s.
///
/// Iteration visits entries in insertion order. Re-setting an existing key
/// replaces the value but keeps the entry's position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dictionary {
    entries: IndexMap<String, Value>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set an entry, replacing any existing value under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether an entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry at `index` in insertion order.
    pub fn get_at(&self, index: usize) -> Option<(&str, &Value)> {
        self.entries.get_index(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Remove an entry, shifting later entries down to preserve order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    // ── Typed access ───────────────────────────────────────────────────────

    /// Double under `key`, or `default` when absent or not coercible.
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.try_double(key).unwrap_or(default)
    }

    /// Signed integer under `key`, or `default`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.try_int(key).unwrap_or(default)
    }

    /// Unsigned integer under `key`, or `default`.
    pub fn get_uint(&self, key: &str, default: u64) -> u64 {
        self.try_uint(key).unwrap_or(default)
    }

    /// Boolean under `key`, or `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.try_bool(key).unwrap_or(default)
    }

    /// String under `key`, or `default`.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.try_string(key)
            .unwrap_or_else(|| default.to_owned())
    }

    /// Double under `key`, if present and coercible.
    pub fn try_double(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_double)
    }

    /// Signed integer under `key`, if present and coercible.
    pub fn try_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// Unsigned integer under `key`, if present and coercible.
    pub fn try_uint(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_uint)
    }

    /// Boolean under `key`, if present and coercible.
    pub fn try_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Owned string under `key`, if present and a string leaf.
    pub fn try_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_owned)
    }

    /// Nested dictionary under `key`, if present and a dictionary.
    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(Value::as_dict)
    }

    /// List under `key`, if present and a list.
    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    // ── JSON ───────────────────────────────────────────────────────────────

    /// Parse a JSON document into a dictionary. The root must be an object.
    pub fn from_json_str(text: &str) -> Result<Dictionary, DictionaryLoadError> {
        let raw: serde_json::Value =
            serde_json::from_str(text).map_err(DictionaryLoadError::Parse)?;
        match Value::from_json(raw) {
            Value::Dict(dict) => Ok(dict),
            other => Err(DictionaryLoadError::NotAnObject {
                found: other.type_name(),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── Serde ──────────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Dict(dict) => dict.serialize(serializer),
        }
    }
}

impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(raw))
    }
}

impl<'de> Deserialize<'de> for Dictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut dict = Dictionary::new();
        for (key, value) in raw {
            dict.set(key, Value::from_json(value));
        }
        Ok(dict)
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Errors from loading a [`Dictionary`] out of JSON.
#[derive(Debug)]
pub enum DictionaryLoadError {
    /// The document is not valid JSON.
    Parse(serde_json::Error),
    /// The document parsed but its root is not an object.
    NotAnObject {
        /// Variant name of what the root actually was.
        found: &'static str,
    },
}

impl fmt::Display for DictionaryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid JSON: {err}"),
            Self::NotAnObject { found } => {
                write!(f, "dictionary root must be an object, found {found}")
            }
        }
    }
}

impl Error for DictionaryLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::NotAnObject { .. } => None,
        }
    }
}
