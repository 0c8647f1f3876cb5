//! Errors raised while loading or validating configuration.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors returned by [`ServerConfig`](crate::ServerConfig) loading and
/// validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The configuration text was not valid JSON for the schema.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// No partitions were configured.
    #[error("at least one partition must be configured")]
    NoPartitions,

    /// Two partitions share an identifier.
    #[error("duplicate partition id '{id}'")]
    DuplicatePartitionId {
        /// The repeated identifier.
        id: String,
    },

    /// Two interceptors share a name.
    #[error("duplicate interceptor name '{name}'")]
    DuplicateInterceptorName {
        /// The repeated name.
        name: String,
    },

    /// A required field was blank.
    #[error("configuration field '{field}' must not be empty")]
    EmptyField {
        /// Dotted path of the blank field.
        field: String,
    },
}

impl ConfigError {
    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(source: serde_json::Error) -> Self {
        Self::Parse {
            source: Arc::new(source),
        }
    }

    /// Creates an empty field error.
    #[must_use]
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }
}
