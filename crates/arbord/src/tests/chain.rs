//! Interceptor chain composition.

use std::sync::{Arc, Mutex};

use arbor_partition::Attributes;

use super::{name, nexus_with, person};
use crate::{
    DirectoryError, Interceptor, InterceptorChain, Next, Operation, OperationContext,
    OperationResult, Principal,
};

const DESCRIPTION: &str = "description";

fn description(context: &OperationContext) -> Option<String> {
    match &context.operation {
        Operation::Add { attributes, .. } => attributes.first_value(DESCRIPTION).map(str::to_owned),
        _ => None,
    }
}

fn add_context(value: &str) -> OperationContext {
    OperationContext::new(
        Principal::Anonymous,
        Operation::Add {
            name: name("cn=test,ou=system"),
            attributes: person("test", "tester").with(DESCRIPTION, [value]),
        },
    )
}

/// Replaces a `draft` description with `final`.
struct Rewrite;

impl Interceptor for Rewrite {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        if let Operation::Add { attributes, .. } = &mut context.operation
            && attributes.contains_value(DESCRIPTION, "draft")
        {
            attributes.put(arbor_partition::Attribute::new(DESCRIPTION, ["final"]));
        }
        next.proceed(context)
    }
}

/// Records the description each call carries.
#[derive(Default)]
struct Inspect {
    seen: Mutex<Vec<Option<String>>>,
}

impl Interceptor for Inspect {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        self.seen
            .lock()
            .expect("inspect mutex poisoned")
            .push(description(context));
        next.proceed(context)
    }
}

/// Refuses any add still carrying the `draft` description.
struct RejectDraft;

impl Interceptor for RejectDraft {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        if description(context).as_deref() == Some("draft") {
            return Err(DirectoryError::schema_violation(
                context.name(),
                "drafts are not accepted",
            ));
        }
        next.proceed(context)
    }
}

/// Counts calls and passes through.
#[derive(Default)]
struct Count {
    calls: Mutex<usize>,
}

impl Count {
    fn calls(&self) -> usize {
        *self.calls.lock().expect("count mutex poisoned")
    }
}

impl Interceptor for Count {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        *self.calls.lock().expect("count mutex poisoned") += 1;
        next.proceed(context)
    }
}

/// Records the stages still ahead of it.
#[derive(Default)]
struct Remaining {
    names: Mutex<Vec<String>>,
}

impl Interceptor for Remaining {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        *self.names.lock().expect("remaining mutex poisoned") =
            next.remaining().map(str::to_owned).collect();
        next.proceed(context)
    }
}

/// Turns every successful add into an existence result.
struct Summarise;

impl Interceptor for Summarise {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        match next.proceed(context)? {
            OperationResult::Added(_) => Ok(OperationResult::Exists(true)),
            other => Ok(other),
        }
    }
}

fn stage(name: &str, stage: Arc<dyn Interceptor>) -> (String, Arc<dyn Interceptor>) {
    (name.to_owned(), stage)
}

#[test]
fn downstream_stages_see_upstream_rewrites() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let inspect = Arc::new(Inspect::default());
    let chain = InterceptorChain::new([
        stage("a", Arc::new(Rewrite)),
        stage("b", inspect.clone()),
        stage("c", Arc::new(RejectDraft)),
    ])
    .expect("chain");

    let result = chain.execute(&nexus, &mut add_context("draft"));

    assert!(matches!(result, Ok(OperationResult::Added(_))));
    assert_eq!(
        *inspect.seen.lock().expect("inspect mutex poisoned"),
        [Some("final".to_owned())]
    );
    let stored = nexus
        .lookup(&name("cn=test,ou=system"))
        .expect("lookup")
        .expect("entry stored");
    assert_eq!(stored.attributes().values(DESCRIPTION), ["final"]);
}

#[test]
fn without_the_rewrite_the_original_value_is_refused() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let chain = InterceptorChain::new([
        stage("b", Arc::new(Inspect::default())),
        stage("c", Arc::new(RejectDraft)),
    ])
    .expect("chain");

    let result = chain.execute(&nexus, &mut add_context("draft"));

    assert!(matches!(result, Err(DirectoryError::SchemaViolation { .. })));
    assert!(!nexus.has_entry(&name("cn=test,ou=system")).expect("has_entry"));
}

#[test]
fn a_refusal_skips_every_later_stage() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let before = Arc::new(Count::default());
    let after = Arc::new(Count::default());
    let chain = InterceptorChain::new([
        stage("before", before.clone()),
        stage("reject", Arc::new(RejectDraft)),
        stage("after", after.clone()),
    ])
    .expect("chain");

    chain
        .execute(&nexus, &mut add_context("draft"))
        .expect_err("refused");

    assert_eq!(before.calls(), 1);
    assert_eq!(after.calls(), 0);
}

#[test]
fn stages_may_replace_the_result() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let chain = InterceptorChain::new([stage("summarise", Arc::new(Summarise))]).expect("chain");

    let result = chain
        .execute(&nexus, &mut add_context("kept"))
        .expect("add");

    assert!(matches!(result, OperationResult::Exists(true)));
    assert!(nexus.has_entry(&name("cn=test,ou=system")).expect("has_entry"));
}

#[test]
fn each_stage_sees_only_the_stages_after_it() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let remaining = Arc::new(Remaining::default());
    let chain = InterceptorChain::new([
        stage("first", Arc::new(Count::default())),
        stage("probe", remaining.clone()),
        stage("second", Arc::new(Count::default())),
        stage("third", Arc::new(Count::default())),
    ])
    .expect("chain");

    chain
        .execute(&nexus, &mut add_context("kept"))
        .expect("add");

    assert_eq!(
        *remaining.names.lock().expect("remaining mutex poisoned"),
        ["second", "third"]
    );
    assert_eq!(
        chain.names().collect::<Vec<_>>(),
        ["first", "probe", "second", "third"]
    );
}

#[test]
fn empty_chain_goes_straight_to_the_nexus() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let chain = InterceptorChain::empty();
    assert!(chain.is_empty());

    chain
        .execute(&nexus, &mut add_context("kept"))
        .expect("add");

    assert!(nexus.has_entry(&name("cn=test,ou=system")).expect("has_entry"));
}

#[test]
fn duplicate_stage_names_are_rejected() {
    let error = InterceptorChain::new([
        stage("audit", Arc::new(Count::default())),
        stage("audit", Arc::new(Count::default())),
    ])
    .expect_err("duplicate name");
    assert!(matches!(
        error,
        DirectoryError::DuplicateInterceptorName { ref name } if name == "audit"
    ));
}

#[test]
fn errors_from_the_nexus_reach_the_caller_unchanged() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let chain = InterceptorChain::new([stage("count", Arc::new(Count::default()))]).expect("chain");
    let mut context = OperationContext::new(
        Principal::Anonymous,
        Operation::Add {
            name: name("cn=orphan,ou=missing,ou=system"),
            attributes: Attributes::new().with("objectClass", ["person"]),
        },
    );

    let error = chain.execute(&nexus, &mut context).expect_err("no parent");

    assert!(matches!(error, DirectoryError::NameNotFound { .. }));
}
