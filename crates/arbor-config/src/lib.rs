//! Shared configuration for the Arbor directory service.
//!
//! [`ServerConfig`] describes everything the service assembles at start-up:
//! logging, the partitions to mount and the ordered interceptor pipeline.
//! Partitions and interceptors are referenced by a `kind` tag that the
//! service resolves through its factories; this crate never interprets the
//! tags beyond checking that names and identifiers are unique.
//!
//! Configuration is JSON. Every field has a default, so an empty object
//! yields a service with a single `ou=system` partition and the standard
//! interceptor order.

mod defaults;
mod error;
mod logging;
mod server;

pub use defaults::{
    DEFAULT_ADMIN_PRINCIPAL, DEFAULT_LOG_FILTER, DEFAULT_PROTECTED_SUFFIX,
    DEFAULT_SYSTEM_PARTITION_ID, DEFAULT_SYSTEM_SUFFIX, default_interceptors,
    default_partitions,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};
pub use server::{InterceptorConfig, PartitionConfig, ServerConfig};

#[cfg(test)]
mod tests;
