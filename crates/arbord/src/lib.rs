//! Operation dispatch core of the Arbor directory service.
//!
//! Every directory operation is wrapped in an [`OperationContext`] and run
//! through an ordered [`InterceptorChain`]. Each stage sees the context and
//! a [`Next`] continuation; the continuation past the last stage hands the
//! operation to the [`PartitionNexus`], which routes it to the partition
//! whose suffix is the longest ancestor of the target name.
//!
//! [`DirectoryService`] owns the nexus, the chain and the [`EventBus`]. It is
//! assembled from an [`arbor_config::ServerConfig`] through the
//! [`InterceptorFactory`] and [`PartitionFactory`], which resolve the
//! configured `kind` tags. [`bootstrap_with`] wraps that assembly with
//! configuration loading, telemetry and health reporting.
//!
//! The stock stages, in their default order:
//!
//! 1. **normalization** rewrites attribute types to their canonical names;
//! 2. **authentication** refuses anonymous writes;
//! 3. **authorization** reserves the protected subtree to the administrator;
//! 4. **exception** reports missing and occupied names precisely;
//! 5. **operational** maintains creator and modifier metadata;
//! 6. **schema** enforces object-class and single-value rules;
//! 7. **event** notifies listeners of completed writes.

mod bootstrap;
mod chain;
mod error;
mod factory;
mod health;
pub mod interceptors;
mod nexus;
mod operation;
mod service;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Directory, FileConfigLoader, StaticConfigLoader,
    bootstrap_with, bootstrap_with_components,
};
pub use chain::{Interceptor, InterceptorChain, Next};
pub use error::DirectoryError;
pub use factory::{
    InterceptorConstructor, InterceptorFactory, PartitionConstructor, PartitionFactory,
    StageResources, context_attributes,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use interceptors::{DirectoryEvent, EventBus, EventListener};
pub use nexus::PartitionNexus;
pub use operation::{Operation, OperationContext, OperationKind, OperationResult, Principal};
pub use service::{DirectoryService, ServiceComponents, Session};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
