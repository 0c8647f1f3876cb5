//! Log output for the directory service.
//!
//! Every module logs under its own `arbord::<module>` target, so a filter
//! such as `arbord::nexus=debug,info` follows routing decisions without the
//! per-operation chatter of the stages. Output goes to standard error as
//! either flattened JSON lines or compact text.

use std::io::{self, IsTerminal};

use arbor_config::{LogFormat, ServerConfig};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Filter applied when the configuration leaves `log_filter` blank.
pub const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

/// Describes the subscriber that owns the process's log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    filter: String,
    format: LogFormat,
}

impl TelemetryHandle {
    /// The filter directives in force.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// The output format in force.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter '{directives}': {reason}")]
    Filter {
        /// The rejected directives.
        directives: String,
        /// Why the parser refused them.
        reason: String,
    },
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

fn directives(config: &ServerConfig) -> &str {
    match config.log_filter.trim() {
        "" => DEFAULT_FILTER,
        directives => directives,
    }
}

/// Builds the subscriber described by `config` without installing it.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for a malformed `log_filter`.
pub fn subscriber(
    config: &ServerConfig,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let directives = directives(config);
    let filter = EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter {
        directives: directives.to_owned(),
        reason: error.to_string(),
    })?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    Ok(match config.log_format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}

/// Installs the process-wide subscriber for the directory.
///
/// Only the first successful call installs anything. Later calls return the
/// handle describing that first subscriber, even when their configuration
/// differs, because the global default cannot be replaced.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for a malformed `log_filter` and
/// [`TelemetryError::Subscriber`] when a subscriber from outside this module
/// is already installed.
///
/// ```rust
/// use arbor_config::ServerConfig;
/// use arbord::telemetry;
///
/// # fn main() -> Result<(), arbord::telemetry::TelemetryError> {
/// let handle = telemetry::initialise(&ServerConfig::default())?;
/// assert!(!handle.filter().is_empty());
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &ServerConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            tracing::subscriber::set_global_default(subscriber(config)?)
                .map_err(TelemetryError::Subscriber)?;
            Ok(TelemetryHandle {
                filter: directives(config).to_owned(),
                format: config.log_format,
            })
        })
        .cloned()
}
