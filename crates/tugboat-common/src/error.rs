//! Unified error types for the Tugboat workspace.
//!
//! Lint failures carry their message verbatim so callers can surface the
//! violated rule exactly as the policy engine reported it.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TugboatError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The pipeline document is not valid YAML or has the wrong shape.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The pipeline violates a structural lint rule.
    #[error("{message}")]
    Lint {
        /// Description of the violated rule.
        message: String,
    },

    /// The pipeline requests a capability reserved for trusted repositories.
    #[error("Insufficient privileges to {action}")]
    Untrusted {
        /// The restricted action, e.g. `use privileged mode`.
        action: &'static str,
    },

    /// An internal compiler invariant was violated.
    #[error("compile error: {message}")]
    Compile {
        /// Description of the violated invariant.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl TugboatError {
    /// Creates a lint error with the given message.
    #[must_use]
    pub fn lint(message: impl Into<String>) -> Self {
        Self::Lint {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TugboatError>;
