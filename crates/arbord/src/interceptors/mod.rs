//! The stock interceptor stages.
//!
//! The default chain runs them in this order: normalization,
//! authentication, authorization, exception, operational, schema, event.
//! Normalization runs first so every later stage sees canonical attribute
//! types. The event stage runs last so listeners only hear about
//! operations that reached the nexus and succeeded.

mod authentication;
mod authorization;
mod event;
mod exception;
mod normalization;
mod operational;
mod schema;

pub use authentication::AuthenticationInterceptor;
pub use authorization::AuthorizationInterceptor;
pub use event::{DirectoryEvent, EventBus, EventInterceptor, EventListener};
pub use exception::ExceptionInterceptor;
pub use normalization::NormalizationInterceptor;
pub use operational::{
    Clock, OperationalAttributeInterceptor, SystemClock, generalized_time,
};
pub use schema::SchemaInterceptor;

const STAGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::interceptors");
