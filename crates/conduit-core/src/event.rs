//! Structured event records.
//!
//! An [`Event`] is an insertion-ordered mapping from string keys to JSON
//! values. Values are a closed set of variants (null, boolean, number,
//! string, array, object), so reading a field never involves an unchecked
//! downcast: the typed accessors return [`FieldError`] when the value at a
//! path is absent or has an unexpected shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, Result};

/// One structured record submitted for delivery.
///
/// Events are immutable once built; the output only reads and serializes
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Creates an event from an ordered field map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Creates an event from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::TypeMismatch` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(FieldError::type_mismatch("<root>", "object", type_name(&other))),
        }
    }

    /// Returns the top-level value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Walks nested objects along `path` and returns the value at its end.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::Missing` when a segment is absent and
    /// `FieldError::TypeMismatch` when an intermediate value is not an object.
    pub fn lookup(&self, path: &[&str]) -> Result<&Value> {
        let Some((first, rest)) = path.split_first() else {
            return Err(FieldError::missing(""));
        };

        let mut current = self.0.get(*first).ok_or_else(|| FieldError::missing(*first))?;

        for (depth, segment) in rest.iter().enumerate() {
            let parent_path = || path[..=depth].join(".");
            let Value::Object(map) = current else {
                return Err(FieldError::type_mismatch(parent_path(), "object", type_name(current)));
            };
            current = map
                .get(*segment)
                .ok_or_else(|| FieldError::missing(path[..=depth + 1].join(".")))?;
        }

        Ok(current)
    }

    /// Returns the string stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FieldError` if the path is absent or the value is not a
    /// string.
    pub fn get_str(&self, path: &[&str]) -> Result<&str> {
        match self.lookup(path)? {
            Value::String(s) => Ok(s),
            other => Err(FieldError::type_mismatch(path.join("."), "string", type_name(other))),
        }
    }

    /// Returns the object stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FieldError` if the path is absent or the value is not an
    /// object.
    pub fn get_object(&self, path: &[&str]) -> Result<&Map<String, Value>> {
        match self.lookup(path)? {
            Value::Object(map) => Ok(map),
            other => Err(FieldError::type_mismatch(path.join("."), "object", type_name(other))),
        }
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates top-level fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Serializes the event into its JSON wire payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the event cannot be encoded.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Event {
    type Error = FieldError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "<event with {} fields>", self.0.len()),
        }
    }
}

/// Human-readable name of a JSON value's variant.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
