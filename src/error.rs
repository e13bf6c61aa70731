//! Error types shared across the crate.
//!
//! Three families, mirroring the boundaries of the system:
//!
//! - [`ValidationError`]: a raw document (or a merged update) violates the
//!   preference schema. Carries the offending field path.
//! - [`StorageError`]: an adapter's load or save failed. Propagated to the
//!   caller unchanged; the service never retries.
//! - [`ConfigError`]: environment-driven adapter configuration is invalid.
//!
//! A missing stored document is *not* an error anywhere in this crate: the
//! service normalizes absence to an empty raw document.

use thiserror::Error;

/// A field value violates the preference schema.
///
/// `path` is the dotted location of the offending field (e.g. `ui.theme`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed at '{path}': {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Storage adapter failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to obtain or initialize a backend connection.
    #[error("storage connection error: {0}")]
    Pool(String),

    /// A query or statement against the backend failed.
    #[error("storage query error: {0}")]
    Query(String),

    /// The stored bytes could not be decoded as a raw preference document.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Configuration errors for the storage factory.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value '{0}'")]
    MissingValue(String),

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors surfaced by the preferences service operations.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_reports_field_path() {
        let err = ValidationError::new("ui.theme", "unknown theme 'neon'");
        let text = err.to_string();
        assert!(text.contains("ui.theme"), "unexpected message: {text}");
        assert!(text.contains("neon"), "unexpected message: {text}");
    }

    #[test]
    fn storage_error_from_serde_json() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: StorageError = bad.unwrap_err().into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn preferences_error_wraps_both_families() {
        let v: PreferencesError = ValidationError::new("ui", "expected object").into();
        assert!(matches!(v, PreferencesError::Validation(_)));

        let s: PreferencesError = StorageError::Query("connection reset".to_string()).into();
        assert!(matches!(s, PreferencesError::Storage(_)));
        assert!(s.to_string().contains("connection reset"));
    }
}
