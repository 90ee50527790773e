//! Error types for collview.
//!
//! Per-cell failures never reach these variants: they are isolated at the row
//! level and rendered as placeholders. What ends up here aborts exactly one
//! adapter, proxy or provider operation and leaves prior state in place.

use thiserror::Error;

use crate::value::Key;

#[derive(Debug, Error)]
pub enum Error {
    /// Row index past the loaded rows (or proxy rows)
    #[error("Index {index} out of range [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Key is not part of the collection
    #[error("Key {key} not found")]
    KeyNotFound { key: Key },

    /// Reading a single entry failed
    #[error("Value for {key} is inaccessible: {reason}")]
    ValueInaccessible { key: Key, reason: String },

    /// The backing container refused a write for a non-fatal reason
    #[error("Value for {key} cannot be set: {reason}")]
    ValueNotSettable { key: Key, reason: String },

    /// Provider call failed or timed out; nothing was applied
    #[error("Remote context unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// Rename or duplicate attempted on a key kind that cannot be renamed
    #[error("Invalid key type for {operation}: {key} is not a string")]
    InvalidKeyType { operation: &'static str, key: Key },

    /// Working copy changed its top-level type
    #[error("Type mismatch on commit: expected {expected}, found {found}")]
    TypeMismatchOnCommit { expected: String, found: String },

    /// Operation not available for this collection kind
    #[error("{operation} is not supported for {kind}")]
    Unsupported { operation: &'static str, kind: String },

    /// Mutation attempted on a read-only adapter or session
    #[error("{what} is read-only")]
    ReadOnly { what: String },

    /// Attribute access failed for a reason that must propagate
    #[error("Attribute error on '{name}': {message}")]
    Attribute { name: String, message: String },

    /// The edited variable disappeared from its owning context
    #[error("The variable no longer exists.")]
    VariableGone,

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// JSON (de)serialization failure on the wire or in config files
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration or input documents
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn remote(message: impl Into<String>) -> Self {
        Error::RemoteUnavailable {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: &'static str, kind: impl ToString) -> Self {
        Error::Unsupported {
            operation,
            kind: kind.to_string(),
        }
    }

    /// Returns true for errors that mean the remote side could not be reached
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Error::RemoteUnavailable { .. })
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
