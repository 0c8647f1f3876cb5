//! Refuses writes from unauthenticated principals.

use tracing::debug;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{OperationContext, OperationResult};

/// Rejects anonymous writes unless the directory is configured to allow
/// them. Reads always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationInterceptor {
    allow_anonymous_writes: bool,
}

impl AuthenticationInterceptor {
    /// Builds the stage.
    #[must_use]
    pub const fn new(allow_anonymous_writes: bool) -> Self {
        Self {
            allow_anonymous_writes,
        }
    }
}

impl Interceptor for AuthenticationInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        let operation = context.kind();
        if operation.is_write() && context.principal.is_anonymous() && !self.allow_anonymous_writes
        {
            debug!(
                target: STAGE_TARGET,
                %operation,
                name = %context.name(),
                "refused anonymous write"
            );
            return Err(DirectoryError::Unauthenticated { operation });
        }
        next.proceed(context)
    }
}
