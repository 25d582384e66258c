//! Error types for typed access into event fields.
//!
//! Events are loosely structured, so every lookup that expects a particular
//! shape is fallible. A failed lookup reports the dotted path it was walking
//! and what it found instead of the expected type.

use thiserror::Error;

/// Result type alias using `FieldError`.
pub type Result<T> = std::result::Result<T, FieldError>;

/// Failure to read a typed value out of an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No value is present at the path.
    #[error("field '{path}' is missing")]
    Missing {
        /// Dotted path that was looked up
        path: String,
    },

    /// A value is present but has the wrong type.
    #[error("field '{path}' is {found}, expected {expected}")]
    TypeMismatch {
        /// Dotted path that was looked up
        path: String,
        /// Name of the expected value type
        expected: &'static str,
        /// Name of the value type actually present
        found: &'static str,
    },
}

impl FieldError {
    /// Creates a missing field error.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::TypeMismatch { path: path.into(), expected, found }
    }

    /// Dotted path of the failed lookup.
    pub fn path(&self) -> &str {
        match self {
            Self::Missing { path } | Self::TypeMismatch { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(FieldError::missing("fields.topic").to_string(), "field 'fields.topic' is missing");
        assert_eq!(
            FieldError::type_mismatch("fields", "object", "string").to_string(),
            "field 'fields' is string, expected object"
        );
    }

    #[test]
    fn path_is_reported_for_every_variant() {
        assert_eq!(FieldError::missing("a.b").path(), "a.b");
        assert_eq!(FieldError::type_mismatch("a", "string", "number").path(), "a");
    }
}
