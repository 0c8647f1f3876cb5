//! Service bootstrap orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use arbor_config::{ConfigError, ServerConfig};
use thiserror::Error;

use crate::error::DirectoryError;
use crate::health::HealthReporter;
use crate::service::{DirectoryService, ServiceComponents};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Loads the service configuration.
pub trait ConfigLoader: Send + Sync {
    /// Produces the configuration to assemble.
    ///
    /// # Errors
    ///
    /// Returns the loader's read or parse failure.
    fn load(&self) -> Result<ServerConfig, ConfigError>;
}

/// Loader returning a fixed configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    config: ServerConfig,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Loader reading a JSON file through [`ServerConfig::from_path`].
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: PathBuf,
}

impl FileConfigLoader {
    /// Reads from `path` on each load.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_path(&self.path)
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The service could not be assembled from the configuration.
    #[error("failed to assemble directory service: {source}")]
    Assembly {
        /// Underlying factory or registration error.
        #[source]
        source: DirectoryError,
    },
}

/// Result of a successful bootstrap.
pub struct Directory {
    config: ServerConfig,
    service: DirectoryService,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Directory {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The assembled service.
    #[must_use]
    pub const fn service(&self) -> &DirectoryService {
        &self.service
    }

    /// The log subscriber in force for this process.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// The reporter bootstrap ran with, for later lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

    /// Consumes the bootstrap result, keeping only the service.
    #[must_use]
    pub fn into_service(self) -> DirectoryService {
        self.service
    }
}

/// Bootstraps with the stock schema, clock and factories.
///
/// # Errors
///
/// See [`bootstrap_with_components`].
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Directory, BootstrapError> {
    bootstrap_with_components(loader, reporter, &ServiceComponents::default())
}

/// Loads configuration, installs telemetry and assembles the service,
/// reporting each step to `reporter`.
///
/// # Errors
///
/// Returns the first failing step wrapped in a [`BootstrapError`]; the
/// reporter has already been told.
pub fn bootstrap_with_components(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    components: &ServiceComponents,
) -> Result<Directory, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let service = match DirectoryService::from_config(&config, components) {
        Ok(service) => service,
        Err(source) => {
            let error = BootstrapError::Assembly { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    for partition in &config.partitions {
        if let Ok(suffix) = arbor_name::Name::parse(&partition.suffix) {
            reporter.partition_mounted(&partition.id, &suffix);
        }
    }
    reporter.bootstrap_succeeded(&config);

    Ok(Directory {
        config,
        service,
        telemetry,
        reporter,
    })
}
