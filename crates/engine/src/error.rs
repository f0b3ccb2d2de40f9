//! Error types for adapter construction and lookup.

use modelwrap_types::WrapError;
use thiserror::Error;

/// Main error type for adapter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// A programming error inside the adapter family, e.g. a normalized version
    /// that has no registry slot. Callers must not recover from or retry it.
    #[error("internal invariant violated: {message}")]
    InvariantViolation { message: String },

    /// The requested configuration is not supported by this adapter family.
    #[error("configuration rejected: {reason}")]
    ConfigurationRejected { reason: String },

    #[error(transparent)]
    Wrap(#[from] WrapError),
}

impl AdapterError {
    pub fn invariant(message: impl Into<String>) -> Self {
        AdapterError::InvariantViolation { message: message.into() }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        AdapterError::ConfigurationRejected { reason: reason.into() }
    }
}

/// Errors surfaced while loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
