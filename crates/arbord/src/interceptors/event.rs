//! Change notifications for successful writes.

use std::sync::{Arc, RwLock};

use arbor_name::Name;
use tracing::{debug, warn};

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{OperationContext, OperationKind, OperationResult, Principal};

/// A completed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEvent {
    /// What kind of write completed.
    pub kind: OperationKind,
    /// The entry's name before the change.
    pub name: Name,
    /// The entry's name after a rename or move.
    pub new_name: Option<Name>,
    /// Who made the change.
    pub principal: Principal,
}

/// Receives [`DirectoryEvent`]s.
///
/// Listeners run synchronously on the writing thread after the change is
/// committed and cannot veto it.
pub trait EventListener: Send + Sync {
    /// Called once per successful write.
    fn on_event(&self, event: &DirectoryEvent);
}

/// Fan-out point for listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    /// A bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Internal`] if the listener list is
    /// poisoned.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> Result<(), DirectoryError> {
        self.listeners
            .write()
            .map_err(|_| DirectoryError::internal("event listener list poisoned"))?
            .push(listener);
        Ok(())
    }

    /// Number of subscribed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().map_or(0, |listeners| listeners.len())
    }

    /// Delivers `event` to every listener in subscription order.
    pub fn publish(&self, event: &DirectoryEvent) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => {
                warn!(target: STAGE_TARGET, "event listener list poisoned; dropping event");
                return;
            }
        };
        debug!(
            target: STAGE_TARGET,
            kind = %event.kind,
            name = %event.name,
            listeners = listeners.len(),
            "publishing directory event"
        );
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

/// Publishes an event on the bus after each successful write.
pub struct EventInterceptor {
    bus: Arc<EventBus>,
}

impl EventInterceptor {
    /// Builds the stage over `bus`.
    #[must_use]
    pub const fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl Interceptor for EventInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        let kind = context.kind();
        let name = context.name().clone();
        let result = next.proceed(context)?;
        if kind.is_write() {
            let new_name = match &result {
                OperationResult::Relocated(new_name) => Some(new_name.clone()),
                _ => None,
            };
            self.bus.publish(&DirectoryEvent {
                kind,
                name,
                new_name,
                principal: context.principal.clone(),
            });
        }
        Ok(result)
    }
}
