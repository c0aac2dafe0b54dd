//! Tests for the shared create flow.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{converge, CreateFlow, CreateSteps};
use crate::error::DriverError;
use crate::state::State;
use crate::waiter::Waiter;

/// Records the order of steps taken and plays back a scripted readiness
/// sequence. Interior mutability because the readiness probe runs against a
/// shared borrow.
#[derive(Default)]
struct ScriptedSteps {
    validation: Option<DriverError>,
    precheck: Option<DriverError>,
    allocation: Option<DriverError>,
    inner: Mutex<ScriptedInner>,
}

#[derive(Default)]
struct ScriptedInner {
    readiness: VecDeque<Result<bool, DriverError>>,
    trace: Vec<&'static str>,
}

impl ScriptedSteps {
    fn ready_after(probes: usize) -> Self {
        let mut readiness: VecDeque<Result<bool, DriverError>> =
            std::iter::repeat_with(|| Ok(false)).take(probes).collect();
        readiness.push_back(Ok(true));
        let steps = Self::default();
        steps.lock().readiness = readiness;
        steps
    }

    fn with_readiness(readiness: Vec<Result<bool, DriverError>>) -> Self {
        let steps = Self::default();
        steps.lock().readiness = readiness.into();
        steps
    }

    fn trace(&self) -> Vec<&'static str> {
        self.lock().trace.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CreateSteps for ScriptedSteps {
    fn machine_name(&self) -> &str {
        "scripted"
    }

    fn validate_config(&self) -> Result<(), DriverError> {
        self.validation.clone().map_or(Ok(()), Err)
    }

    async fn pre_create_check(&self) -> Result<(), DriverError> {
        self.precheck.clone().map_or(Ok(()), Err)
    }

    async fn allocate(&mut self) -> Result<(), DriverError> {
        self.lock().trace.push("allocate");
        self.allocation.clone().map_or(Ok(()), Err)
    }

    async fn probe_ready(&self) -> Result<bool, DriverError> {
        let mut inner = self.lock();
        inner.trace.push("probe");
        inner.readiness.pop_front().unwrap_or(Ok(false))
    }

    async fn post_provision(&mut self) -> Result<(), DriverError> {
        self.lock().trace.push("post_provision");
        Ok(())
    }
}

const fn fast_flow() -> CreateFlow {
    CreateFlow::new(Waiter::new(Duration::from_millis(1), Duration::from_secs(1)))
}

#[tokio::test]
async fn create_runs_steps_in_order() {
    let mut steps = ScriptedSteps::ready_after(2);

    fast_flow()
        .run(&mut steps)
        .await
        .unwrap_or_else(|err| panic!("create should succeed: {err}"));

    assert_eq!(
        steps.trace(),
        vec!["allocate", "probe", "probe", "probe", "post_provision"]
    );
}

#[tokio::test]
async fn validation_failure_stops_before_allocation() {
    let mut steps = ScriptedSteps {
        validation: Some(DriverError::MissingOption("image".to_owned())),
        ..ScriptedSteps::default()
    };

    let err = fast_flow()
        .run(&mut steps)
        .await
        .expect_err("validation should fail the flow");

    assert_eq!(err, DriverError::MissingOption("image".to_owned()));
    assert!(steps.trace().is_empty(), "no backend calls were recorded");
}

#[tokio::test]
async fn precheck_failure_stops_before_allocation() {
    let mut steps = ScriptedSteps {
        precheck: Some(DriverError::rejected("quota exceeded")),
        ..ScriptedSteps::default()
    };

    let err = fast_flow()
        .run(&mut steps)
        .await
        .expect_err("pre-flight should fail the flow");

    assert_eq!(err, DriverError::rejected("quota exceeded"));
    assert!(steps.trace().is_empty());
}

#[tokio::test]
async fn probe_error_aborts_without_further_probes() {
    let mut steps =
        ScriptedSteps::with_readiness(vec![Err(DriverError::rejected("quota exceeded"))]);

    let err = fast_flow()
        .run(&mut steps)
        .await
        .expect_err("probe error should fail the flow");

    assert_eq!(err, DriverError::rejected("quota exceeded"));
    assert_eq!(steps.trace(), vec!["allocate", "probe"]);
}

#[tokio::test]
async fn readiness_timeout_skips_post_provision() {
    let flow = CreateFlow::new(Waiter::new(
        Duration::from_millis(1),
        Duration::from_millis(10),
    ));
    let mut steps = ScriptedSteps::default();

    let err = flow
        .run(&mut steps)
        .await
        .expect_err("flow should time out");

    assert!(matches!(err, DriverError::Timeout { action } if action == "create"));
    assert!(!steps.trace().contains(&"post_provision"));
}

#[tokio::test]
async fn converge_issues_request_once_then_polls() {
    let waiter = Waiter::new(Duration::from_millis(1), Duration::from_secs(1));
    let mut issued = 0u32;
    let mut states = VecDeque::from(vec![State::Stopping, State::Stopped]);

    converge(
        &waiter,
        "stop",
        State::Stopped,
        || {
            issued += 1;
            async { Ok(()) }
        },
        || {
            let observed = states.pop_front().unwrap_or(State::Stopped);
            async move { Ok(observed) }
        },
    )
    .await
    .unwrap_or_else(|err| panic!("convergence should succeed: {err}"));

    assert_eq!(issued, 1);
}

#[tokio::test]
async fn converge_surfaces_request_failure_without_polling() {
    let waiter = Waiter::new(Duration::from_millis(1), Duration::from_secs(1));
    let mut observations = 0u32;

    let err = converge(
        &waiter,
        "start",
        State::Running,
        || async { Err(DriverError::unavailable("connection refused")) },
        || {
            observations += 1;
            async { Ok(State::Running) }
        },
    )
    .await
    .expect_err("request failure should surface");

    assert_eq!(err, DriverError::unavailable("connection refused"));
    assert_eq!(observations, 0);
}
