//! Tests for the bounded polling primitive.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rstest::rstest;

use super::{ExponentialBackoff, FixedInterval, PollPolicy, Waiter};
use crate::error::DriverError;
use crate::state::State;

/// Pops scripted probe results in FIFO order, counting invocations.
struct ScriptedProbe {
    script: VecDeque<Result<bool, DriverError>>,
    calls: u32,
}

impl ScriptedProbe {
    fn new(script: Vec<Result<bool, DriverError>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }

    fn next(&mut self) -> Result<bool, DriverError> {
        self.calls += 1;
        self.script.pop_front().unwrap_or(Ok(false))
    }
}

#[tokio::test]
async fn immediate_success_does_not_sleep() {
    let waiter = Waiter::new(Duration::from_millis(50), Duration::from_secs(1));
    let mut probe = ScriptedProbe::new(vec![Ok(true)]);

    let started = Instant::now();
    waiter
        .wait_for("ready", || {
            let result = probe.next();
            async move { result }
        })
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    assert_eq!(probe.calls, 1);
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn converges_after_false_probes() {
    let waiter = Waiter::new(Duration::from_millis(10), Duration::from_secs(1));
    let mut probe = ScriptedProbe::new(vec![Ok(false), Ok(false), Ok(true)]);

    let started = Instant::now();
    waiter
        .wait_for("ready", || {
            let result = probe.next();
            async move { result }
        })
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    let elapsed = started.elapsed();
    assert_eq!(probe.calls, 3);
    assert!(elapsed >= Duration::from_millis(20), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn never_converging_probe_times_out() {
    let waiter = Waiter::new(Duration::from_millis(10), Duration::from_millis(50));
    let mut probe = ScriptedProbe::new(Vec::new());

    let started = Instant::now();
    let err = waiter
        .wait_for("create", || {
            let result = probe.next();
            async move { result }
        })
        .await
        .expect_err("wait should time out");

    assert_eq!(
        err,
        DriverError::Timeout {
            action: "create".to_owned()
        }
    );
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn probe_error_is_returned_verbatim_without_retry() {
    let waiter = Waiter::new(Duration::from_millis(10), Duration::from_secs(1));
    let rejection = DriverError::rejected("quota exceeded");
    let mut probe = ScriptedProbe::new(vec![Err(rejection.clone())]);

    let err = waiter
        .wait_for("create", || {
            let result = probe.next();
            async move { result }
        })
        .await
        .expect_err("wait should fail");

    assert_eq!(err, rejection);
    assert_eq!(probe.calls, 1, "no probe calls after the first error");
}

#[tokio::test]
async fn wait_for_state_converges_on_target() {
    let waiter = Waiter::new(Duration::from_millis(1), Duration::from_secs(1));
    let mut states = VecDeque::from(vec![State::Starting, State::Starting, State::Running]);

    waiter
        .wait_for_state("start", State::Running, || {
            let observed = states.pop_front().unwrap_or(State::Running);
            async move { Ok(observed) }
        })
        .await
        .unwrap_or_else(|err| panic!("state wait should succeed: {err}"));

    assert!(states.is_empty());
}

#[tokio::test]
async fn wait_for_state_times_out_when_target_never_reached() {
    let waiter = Waiter::new(Duration::from_millis(1), Duration::from_millis(10));

    let err = waiter
        .wait_for_state("stop", State::Stopped, || async { Ok(State::Running) })
        .await
        .expect_err("state wait should time out");

    assert!(matches!(err, DriverError::Timeout { action } if action == "stop"));
}

#[rstest]
#[case(1, Duration::from_millis(10))]
#[case(2, Duration::from_millis(20))]
#[case(3, Duration::from_millis(40))]
#[case(4, Duration::from_millis(80))]
#[case(10, Duration::from_millis(100))]
fn exponential_backoff_doubles_until_cap(#[case] attempt: u32, #[case] expected: Duration) {
    let policy = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(100));
    assert_eq!(policy.interval(attempt), expected);
}

#[rstest]
fn fixed_interval_ignores_attempt_number() {
    let policy = FixedInterval::new(Duration::from_secs(3));
    assert_eq!(policy.interval(1), policy.interval(60));
}

#[tokio::test]
async fn backoff_policy_waiter_still_times_out() {
    let waiter = Waiter::with_policy(
        ExponentialBackoff::new(Duration::from_millis(1), Duration::from_millis(4)),
        Duration::from_millis(30),
    );

    let err = waiter
        .wait_for("create", || async { Ok(false) })
        .await
        .expect_err("wait should time out");

    assert!(matches!(err, DriverError::Timeout { .. }));
}
