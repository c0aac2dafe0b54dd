//! Shared provisioning flow, parameterized by backend-specific steps.
//!
//! Every backend follows the same shape when creating a host: validate local
//! configuration, run a cheap pre-flight check, issue the allocation call,
//! poll until the backend reports the host usable, then perform post-boot
//! provisioning. [`CreateFlow`] implements that sequence once; a driver
//! supplies the backend-specific pieces through [`CreateSteps`] instead of
//! repeating the loop.

#[cfg(test)]
mod tests;

use crate::error::DriverError;
use crate::state::State;
use crate::waiter::{PollPolicy, Waiter};

/// Backend-specific steps plugged into the shared create flow.
pub trait CreateSteps {
    /// Machine name used in log output.
    fn machine_name(&self) -> &str;

    /// Validates locally-known configuration. Runs before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingOption`] or
    /// [`DriverError::InvalidOption`] on validation failure.
    fn validate_config(&self) -> Result<(), DriverError>;

    /// Cheap pre-flight check against the backend, run before any billable
    /// allocation call.
    fn pre_create_check(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Issues the allocation or boot request. Expected to return while the
    /// backend is still converging.
    fn allocate(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Reports whether the backend considers the host usable yet. Read-only
    /// so the readiness poll can run against a shared borrow; scripted test
    /// doubles use interior mutability.
    fn probe_ready(&self) -> impl Future<Output = Result<bool, DriverError>> + Send;

    /// Post-convergence provisioning: address discovery, key injection,
    /// engine checks.
    fn post_provision(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// Runs the shared create sequence with one waiter per flow.
#[derive(Clone, Copy, Debug)]
pub struct CreateFlow<P: PollPolicy = crate::waiter::FixedInterval> {
    waiter: Waiter<P>,
}

impl<P: PollPolicy> CreateFlow<P> {
    /// Creates a flow polling readiness through `waiter`.
    #[must_use]
    pub const fn new(waiter: Waiter<P>) -> Self {
        Self { waiter }
    }

    /// Executes validate → pre-flight → allocate → wait → post-provision.
    ///
    /// A failure after `allocate` leaves the partially-created host in
    /// place: cleanup stays the caller's decision, through an explicit
    /// `remove`.
    ///
    /// # Errors
    ///
    /// Returns the first step error unchanged, or [`DriverError::Timeout`]
    /// when readiness does not converge within the waiter's deadline.
    pub async fn run<S: CreateSteps>(&self, steps: &mut S) -> Result<(), DriverError> {
        steps.validate_config()?;
        steps.pre_create_check().await?;

        log::info!("Creating machine {}...", steps.machine_name());
        steps.allocate().await?;

        log::info!(
            "Waiting for machine {} to become ready...",
            steps.machine_name()
        );
        self.waiter
            .wait_for("create", || steps.probe_ready())
            .await?;

        log::info!("Provisioning machine {}...", steps.machine_name());
        steps.post_provision().await
    }
}

/// Drives one lifecycle transition: issue the backend request, then poll
/// until the reported state converges on `target`.
///
/// # Errors
///
/// Returns the request or observation error unchanged, or
/// [`DriverError::Timeout`] when the state does not converge within the
/// waiter's deadline.
pub async fn converge<P, I, Fi, O, Fo>(
    waiter: &Waiter<P>,
    action: &str,
    target: State,
    issue: I,
    observe: O,
) -> Result<(), DriverError>
where
    P: PollPolicy,
    I: FnOnce() -> Fi,
    Fi: Future<Output = Result<(), DriverError>>,
    O: FnMut() -> Fo,
    Fo: Future<Output = Result<State, DriverError>>,
{
    issue().await?;
    waiter.wait_for_state(action, target, observe).await
}
