//! Guards the protected system subtree.

use arbor_name::Name;
use tracing::debug;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{OperationContext, OperationResult};

/// Only the administrator may change entries at or below the protected
/// suffix. A rename or move is checked at both its source and its
/// destination, so entries can neither leave nor enter the subtree
/// behind the administrator's back.
#[derive(Debug, Clone)]
pub struct AuthorizationInterceptor {
    admin: Name,
    protected: Name,
}

impl AuthorizationInterceptor {
    /// Builds the stage.
    #[must_use]
    pub const fn new(admin: Name, protected: Name) -> Self {
        Self { admin, protected }
    }

    fn is_admin(&self, context: &OperationContext) -> bool {
        context
            .principal
            .name()
            .is_some_and(|name| *name == self.admin)
    }

    fn touches_protected(&self, context: &OperationContext) -> Option<Name> {
        if context.name().is_within(&self.protected) {
            return Some(context.name().clone());
        }
        context
            .operation
            .destination()
            .filter(|destination| destination.is_within(&self.protected))
    }
}

impl Interceptor for AuthorizationInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        let operation = context.kind();
        if operation.is_write()
            && !self.is_admin(context)
            && let Some(name) = self.touches_protected(context)
        {
            debug!(
                target: STAGE_TARGET,
                principal = %context.principal,
                %operation,
                %name,
                "refused write to protected subtree"
            );
            return Err(DirectoryError::InsufficientAccess {
                principal: context.principal.to_string(),
                operation,
                name: name.to_string(),
            });
        }
        next.proceed(context)
    }
}
