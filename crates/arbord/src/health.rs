//! Structured health reporting for service lifecycle events.

use std::sync::Arc;

use arbor_config::ServerConfig;
use arbor_name::Name;

use crate::bootstrap::BootstrapError;

/// Observer for lifecycle events, so tests can record what operators see.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after a partition is mounted.
    fn partition_mounted(&self, id: &str, suffix: &Name);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &ServerConfig);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn partition_mounted(&self, id: &str, suffix: &Name) {
        (**self).partition_mounted(id, suffix);
    }

    fn bootstrap_succeeded(&self, config: &ServerConfig) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "arbord::health",
            event = "bootstrap_starting",
            "starting directory bootstrap"
        );
    }

    fn partition_mounted(&self, id: &str, suffix: &Name) {
        tracing::info!(
            target: "arbord::health",
            event = "partition_mounted",
            partition = id,
            suffix = %suffix,
            "partition mounted"
        );
    }

    fn bootstrap_succeeded(&self, config: &ServerConfig) {
        tracing::info!(
            target: "arbord::health",
            event = "bootstrap_succeeded",
            partitions = config.partitions.len(),
            interceptors = config.interceptors.len(),
            log_filter = %config.log_filter,
            log_format = ?config.log_format,
            "directory bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "arbord::health",
            event = "bootstrap_failed",
            error = %error,
            "directory bootstrap failed"
        );
    }
}
