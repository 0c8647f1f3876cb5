//! The top-level service configuration.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;
use crate::logging::LogFormat;

/// Configuration for one mounted partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Unique partition identifier.
    pub id: String,
    /// Suffix at which the partition is mounted.
    pub suffix: String,
    /// Factory tag selecting the partition implementation.
    #[serde(default = "defaults::partition_kind")]
    pub kind: String,
    /// Attribute types that receive a user-declared value index.
    #[serde(default)]
    pub indexed_attributes: Vec<String>,
    /// Attributes of the context entry created at the suffix.
    #[serde(default)]
    pub context_entry: BTreeMap<String, Vec<String>>,
}

/// One stage of the interceptor pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// Unique stage name.
    pub name: String,
    /// Factory tag selecting the interceptor implementation.
    pub kind: String,
}

impl InterceptorConfig {
    /// Builds a stage description.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Resolved configuration for the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `tracing` filter expression.
    #[serde(default = "defaults::log_filter")]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Whether unauthenticated sessions may mutate entries.
    #[serde(default)]
    pub allow_anonymous_writes: bool,
    /// Name of the administrative principal.
    #[serde(default = "defaults::admin_principal")]
    pub admin_principal: String,
    /// Subtree that only the administrator may modify.
    #[serde(default = "defaults::protected_suffix")]
    pub protected_suffix: String,
    /// Partitions mounted at start-up, in registration order.
    #[serde(default = "defaults::default_partitions")]
    pub partitions: Vec<PartitionConfig>,
    /// Interceptor stages, outermost first.
    #[serde(default = "defaults::default_interceptors")]
    pub interceptors: Vec<InterceptorConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_filter: defaults::log_filter(),
            log_format: LogFormat::default(),
            allow_anonymous_writes: false,
            admin_principal: defaults::admin_principal(),
            protected_suffix: defaults::protected_suffix(),
            partitions: defaults::default_partitions(),
            interceptors: defaults::default_interceptors(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error reported by [`ServerConfig::validate`].
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`ServerConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::read(path, source))?;
        Self::from_json_str(&text)
    }

    /// Checks structural constraints that do not depend on name parsing.
    ///
    /// Suffix uniqueness is checked when partitions are registered, since it
    /// depends on normalized names.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions.is_empty() {
            return Err(ConfigError::NoPartitions);
        }

        let mut ids = HashSet::new();
        for (position, partition) in self.partitions.iter().enumerate() {
            if partition.id.trim().is_empty() {
                return Err(ConfigError::empty_field(format!("partitions[{position}].id")));
            }
            if !ids.insert(partition.id.as_str()) {
                return Err(ConfigError::DuplicatePartitionId {
                    id: partition.id.clone(),
                });
            }
        }

        let mut names = HashSet::new();
        for (position, interceptor) in self.interceptors.iter().enumerate() {
            if interceptor.name.trim().is_empty() {
                return Err(ConfigError::empty_field(format!(
                    "interceptors[{position}].name"
                )));
            }
            if !names.insert(interceptor.name.as_str()) {
                return Err(ConfigError::DuplicateInterceptorName {
                    name: interceptor.name.clone(),
                });
            }
        }
        Ok(())
    }
}
