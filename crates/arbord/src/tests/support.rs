//! Test doubles shared by the unit and behaviour suites.

use std::sync::Mutex;

use arbor_config::ServerConfig;
use arbor_name::Name;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::interceptors::{Clock, DirectoryEvent, EventListener};

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// A partition was mounted at the suffix.
    PartitionMounted { id: String, suffix: String },
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn partition_mounted(&self, id: &str, suffix: &Name) {
        self.record(HealthEvent::PartitionMounted {
            id: id.to_owned(),
            suffix: suffix.to_string(),
        });
    }

    fn bootstrap_succeeded(&self, _config: &ServerConfig) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }
}

/// The instant [`FixedClock`] always reports.
pub const FIXED_INSTANT: OffsetDateTime = datetime!(2024-01-31 23:59:59 UTC);

/// Clock frozen at [`FIXED_INSTANT`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        FIXED_INSTANT
    }
}

/// Listener that keeps every event it hears.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<DirectoryEvent>>,
}

impl RecordingListener {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DirectoryEvent> {
        self.events
            .lock()
            .expect("listener mutex poisoned")
            .clone()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &DirectoryEvent) {
        self.events
            .lock()
            .expect("listener mutex poisoned")
            .push(event.clone());
    }
}
