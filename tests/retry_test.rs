mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{host_ref, FakeHost};
use fleetrun::error::{FleetError, Result};
use fleetrun::{
    Command, DispatchOptions, ExecutionResult, Fleet, HostHelpers, HostRef, HostSpecifier, Logger,
    NullLogger, OneOrMany, RetryPolicy,
};

/// Counts every call that reaches `on`.
struct CountingFleet {
    fleet: Fleet,
    calls: AtomicUsize,
}

impl CountingFleet {
    fn new(host: &Arc<FakeHost>) -> Self {
        Self {
            fleet: Fleet::with_logger(vec![host_ref(host)], Arc::new(NullLogger)),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HostHelpers for CountingFleet {
    fn hosts(&self) -> &[HostRef] {
        self.fleet.hosts()
    }

    fn logger(&self) -> &dyn Logger {
        self.fleet.logger()
    }

    fn on<S, C>(&self, spec: S, command: C, opts: &DispatchOptions) -> Result<OneOrMany<ExecutionResult>>
    where
        S: Into<HostSpecifier>,
        C: Into<Command>,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fleet.on(spec, command, opts)
    }
}

fn quick(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, 0.0)
}

#[test]
fn test_never_acceptable_makes_max_retries_plus_two_calls() {
    let host = FakeHost::new("master").failing_on("check", 1).into_ref();
    let ctx = CountingFleet::new(&host);

    let err = ctx
        .retry_on(host_ref(&host), "check", &quick(5))
        .unwrap_err();

    assert_eq!(ctx.calls(), 7);
    assert_eq!(host.executed().len(), 7);
    match err {
        FleetError::RetryExhausted { attempts, result } => {
            assert_eq!(attempts, 7);
            assert_eq!(result.exit_code, 1);
            assert_eq!(result.host, "master");
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[test]
fn test_default_policy_allows_seven_calls() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.max_attempts(), 7);
}

#[test]
fn test_immediate_success_makes_one_call() {
    let host = FakeHost::new("master").into_ref();
    let ctx = CountingFleet::new(&host);

    let result = ctx.retry_on(host_ref(&host), "check", &quick(5)).unwrap();

    assert_eq!(ctx.calls(), 1);
    assert!(result.success);
}

#[test]
fn test_success_after_failures_stops_retrying() {
    let host = FakeHost::new("master").with_exit_codes(&[1, 1, 0]).into_ref();
    let ctx = CountingFleet::new(&host);

    let result = ctx.retry_on(host_ref(&host), "check", &quick(5)).unwrap();

    assert_eq!(ctx.calls(), 3);
    assert_eq!(result.exit_code, 0);
}

#[test]
fn test_custom_retry_count() {
    let host = FakeHost::new("master").failing_on("check", 1).into_ref();
    let ctx = CountingFleet::new(&host);

    let err = ctx.retry_on(host_ref(&host), "check", &quick(2)).unwrap_err();

    assert!(matches!(err, FleetError::RetryExhausted { attempts: 4, .. }));
    assert_eq!(ctx.calls(), 4);
}

#[test]
fn test_custom_acceptable_exit_codes() {
    let host = FakeHost::new("master").with_exit_codes(&[1, 3]).into_ref();
    let ctx = CountingFleet::new(&host);
    let policy = quick(5).with_acceptable_exit_codes([0, 3]);

    let result = ctx.retry_on(host_ref(&host), "check", &policy).unwrap();

    assert_eq!(ctx.calls(), 2);
    assert_eq!(result.exit_code, 3);
    assert!(result.success);
}

#[test]
fn test_retry_needs_exactly_one_host() {
    let a = FakeHost::new("a").with_roles(&["agent"]).into_ref();
    let b = FakeHost::new("b").with_roles(&["agent"]).into_ref();
    let fleet = Fleet::new(vec![host_ref(&a), host_ref(&b)]);

    let err = fleet.retry_on("agent", "check", &quick(1)).unwrap_err();

    assert!(matches!(err, FleetError::InvalidArgument(_)));
    assert!(a.executed().is_empty());
    assert!(b.executed().is_empty());
}

#[test]
fn test_retry_through_role_with_one_match() {
    let host = FakeHost::new("master")
        .with_roles(&["master"])
        .with_exit_codes(&[2, 0])
        .into_ref();
    let fleet = Fleet::new(vec![host_ref(&host)]);

    let result = fleet.retry_on(":master", "check", &quick(0)).unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(host.executed().len(), 2);
}
