//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use camino::Utf8PathBuf;

use crate::driver::{BaseDriver, Driver, DriverFuture};
use crate::error::DriverError;
use crate::options::ConfigMap;
use crate::state::State;

/// Scripted driver double: plays back pre-seeded states and records every
/// lifecycle call, without touching any backend.
///
/// The backend it pretends to talk to "forgets" the host after the first
/// `remove`, so repeated removals exercise the idempotence contract.
#[derive(Clone, Debug)]
pub struct FakeDriver {
    name: &'static str,
    base: BaseDriver,
    inner: Arc<Mutex<FakeInner>>,
}

#[derive(Debug, Default)]
struct FakeInner {
    states: VecDeque<State>,
    operations: Vec<String>,
    create_error: Option<DriverError>,
    host_exists: bool,
    remove_calls: u32,
}

impl FakeDriver {
    /// Creates a fake registered under `name`.
    #[must_use]
    pub fn new(name: &'static str, base: BaseDriver) -> Self {
        Self {
            name,
            base,
            inner: Arc::new(Mutex::new(FakeInner::default())),
        }
    }

    /// Queues states returned by successive `state()` calls; the last one
    /// repeats once the script is exhausted.
    pub fn script_states(&self, states: impl IntoIterator<Item = State>) {
        self.lock().states.extend(states);
    }

    /// Makes the next `create` call fail with `error`.
    pub fn fail_create_with(&self, error: DriverError) {
        self.lock().create_error = Some(error);
    }

    /// Returns every lifecycle call recorded so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    /// Number of `remove` calls observed.
    #[must_use]
    pub fn remove_calls(&self) -> u32 {
        self.lock().remove_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: &str) {
        self.lock().operations.push(operation.to_owned());
    }
}

impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn set_config_from_flags(&mut self, _options: &ConfigMap) -> Result<(), DriverError> {
        self.record("set_config_from_flags");
        Ok(())
    }

    fn create(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.record("create");
            let mut inner = self.lock();
            if let Some(error) = inner.create_error.take() {
                return Err(error);
            }
            inner.host_exists = true;
            Ok(())
        })
    }

    fn start(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.record("start");
            Ok(())
        })
    }

    fn stop(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.record("stop");
            Ok(())
        })
    }

    fn kill(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.record("kill");
            Ok(())
        })
    }

    fn remove(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.record("remove");
            let mut inner = self.lock();
            inner.remove_calls += 1;
            if inner.host_exists {
                inner.host_exists = false;
            }
            // A host the backend no longer knows counts as removed.
            Ok(())
        })
    }

    fn state(&self) -> DriverFuture<'_, State> {
        Box::pin(async move {
            self.record("state");
            let mut inner = self.lock();
            let next = if inner.states.len() > 1 {
                inner.states.pop_front()
            } else {
                inner.states.front().copied()
            };
            Ok(next.unwrap_or(State::None))
        })
    }

    fn ip(&self) -> DriverFuture<'_, String> {
        Box::pin(async move {
            self.record("ip");
            Ok("192.0.2.10".to_owned())
        })
    }

    fn ssh_username(&self) -> String {
        self.base.ssh_user.clone()
    }

    fn ssh_key_path(&self) -> Option<Utf8PathBuf> {
        self.base.ssh_key_path.clone()
    }
}
