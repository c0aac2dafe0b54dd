//! Bounded polling against a backend that only exposes "check current
//! status".
//!
//! Every driver shares the same convergence shape: fire a request, then poll
//! the backend until it reports the condition the caller needs or a deadline
//! elapses. The [`Waiter`] keeps that mechanism in one place; what "done"
//! means stays with the caller-supplied probe.

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::error::DriverError;
use crate::state::State;

/// Supplies the pause between consecutive probe calls.
pub trait PollPolicy {
    /// Returns the interval to sleep after probe call number `attempt`
    /// (1-based).
    fn interval(&self, attempt: u32) -> Duration;
}

/// Constant interval between probes, matching the fixed-interval polling of
/// the backends this crate grew out of.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Creates a policy with the given constant interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl PollPolicy for FixedInterval {
    fn interval(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Doubles the interval after each probe, saturating at `cap`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    cap: Duration,
}

impl ExponentialBackoff {
    /// Creates a policy starting at `initial` and never exceeding `cap`.
    #[must_use]
    pub const fn new(initial: Duration, cap: Duration) -> Self {
        Self { initial, cap }
    }
}

impl PollPolicy for ExponentialBackoff {
    fn interval(&self, attempt: u32) -> Duration {
        // attempt is 1-based; cap the shift so the multiplier cannot wrap.
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial.saturating_mul(multiplier).min(self.cap)
    }
}

/// Bounded-time polling primitive.
///
/// A wait probes first and sleeps after, so a condition that already holds
/// returns without pausing. A probe error is fatal to the wait and is
/// returned verbatim; the probe is never retried past its first error. When
/// the deadline elapses the wait fails with [`DriverError::Timeout`] and the
/// in-flight backend operation is left untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Waiter<P: PollPolicy = FixedInterval> {
    policy: P,
    timeout: Duration,
}

impl Waiter<FixedInterval> {
    /// Creates a fixed-interval waiter.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            policy: FixedInterval::new(interval),
            timeout,
        }
    }
}

impl<P: PollPolicy> Waiter<P> {
    /// Creates a waiter with an explicit polling policy.
    #[must_use]
    pub const fn with_policy(policy: P, timeout: Duration) -> Self {
        Self { policy, timeout }
    }

    /// Returns the total timeout for one wait call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Polls `probe` until it reports done, fails, or the deadline elapses.
    ///
    /// `action` names the condition being waited on and is carried into the
    /// timeout error so callers can tell waits apart.
    ///
    /// # Errors
    ///
    /// Returns the probe's error unchanged on the first failure, or
    /// [`DriverError::Timeout`] when the deadline elapses without
    /// convergence.
    pub async fn wait_for<F, Fut>(&self, action: &str, mut probe: F) -> Result<(), DriverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, DriverError>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 0;

        while Instant::now() <= deadline {
            if probe().await? {
                return Ok(());
            }
            attempt = attempt.saturating_add(1);
            log::debug!("{action}: not converged after probe {attempt}");
            sleep(self.policy.interval(attempt)).await;
        }

        Err(DriverError::Timeout {
            action: action.to_owned(),
        })
    }

    /// Polls `observe` until the backend reports `target`.
    ///
    /// # Errors
    ///
    /// Returns the observation error unchanged on the first failure, or
    /// [`DriverError::Timeout`] when the deadline elapses before the backend
    /// reaches `target`.
    pub async fn wait_for_state<F, Fut>(
        &self,
        action: &str,
        target: State,
        mut observe: F,
    ) -> Result<(), DriverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<State, DriverError>>,
    {
        self.wait_for(action, move || {
            let observation = observe();
            async move { Ok(observation.await? == target) }
        })
        .await
    }
}
