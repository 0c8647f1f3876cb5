//! The ordered interceptor pipeline around the partition nexus.
//!
//! Each stage receives the mutable [`OperationContext`] and a [`Next`]
//! continuation. A stage may pass straight through, rewrite the context
//! before proceeding, refuse by returning an error without proceeding, or
//! post-process whatever the rest of the chain returned. The continuation
//! past the last stage executes the operation on the nexus.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::DirectoryError;
use crate::nexus::PartitionNexus;
use crate::operation::{OperationContext, OperationResult};

const CHAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::chain");

/// One stage of the pipeline.
pub trait Interceptor: Send + Sync {
    /// Handles `context`, normally by calling [`Next::proceed`] once.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining stages and is returned to the caller
    /// unchanged by the stages before this one, unless they map it.
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError>;
}

struct ChainLink {
    name: String,
    stage: Arc<dyn Interceptor>,
}

/// The remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    links: &'a [ChainLink],
    nexus: &'a PartitionNexus,
}

impl<'a> Next<'a> {
    /// Runs the remaining stages and then the nexus.
    ///
    /// # Errors
    ///
    /// The first error raised further down the chain.
    pub fn proceed(self, context: &mut OperationContext) -> Result<OperationResult, DirectoryError> {
        match self.links.split_first() {
            Some((link, rest)) => {
                trace!(
                    target: CHAIN_TARGET,
                    stage = %link.name,
                    operation = %context.kind(),
                    "entering stage"
                );
                link.stage.process(
                    context,
                    Next {
                        links: rest,
                        nexus: self.nexus,
                    },
                )
            }
            None => self.nexus.execute(context),
        }
    }

    /// Direct access to the nexus, bypassing the remaining stages. Stages
    /// use this for the existence and schema lookups their checks need.
    #[must_use]
    pub const fn nexus(&self) -> &'a PartitionNexus {
        self.nexus
    }

    /// Names of the stages still to run.
    pub fn remaining(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.links.iter().map(|link| link.name.as_str())
    }
}

/// An immutable, ordered list of named stages.
pub struct InterceptorChain {
    links: Vec<ChainLink>,
}

impl InterceptorChain {
    /// Builds a chain, outermost stage first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::DuplicateInterceptorName`] when two stages
    /// share a name.
    pub fn new<I>(stages: I) -> Result<Self, DirectoryError>
    where
        I: IntoIterator<Item = (String, Arc<dyn Interceptor>)>,
    {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for (name, stage) in stages {
            if !seen.insert(name.clone()) {
                return Err(DirectoryError::DuplicateInterceptorName { name });
            }
            links.push(ChainLink { name, stage });
        }
        debug!(
            target: CHAIN_TARGET,
            stages = ?links.iter().map(|link| link.name.as_str()).collect::<Vec<_>>(),
            "built interceptor chain"
        );
        Ok(Self { links })
    }

    /// A chain with no stages, which executes operations directly.
    #[must_use]
    pub const fn empty() -> Self {
        Self { links: Vec::new() }
    }

    /// Stage names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.name.as_str())
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` when the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Runs `context` through every stage and then `nexus`.
    ///
    /// # Errors
    ///
    /// The first error raised by a stage or the nexus.
    pub fn execute(
        &self,
        nexus: &PartitionNexus,
        context: &mut OperationContext,
    ) -> Result<OperationResult, DirectoryError> {
        Next {
            links: &self.links,
            nexus,
        }
        .proceed(context)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
