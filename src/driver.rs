//! The driver capability contract every backend implements.

use std::future::Future;
use std::pin::Pin;

use camino::{Utf8Path, Utf8PathBuf};
use uuid::Uuid;

use crate::error::DriverError;
use crate::options::ConfigMap;
use crate::state::State;

/// Default TCP port of the container engine API on a provisioned host.
pub const DEFAULT_ENGINE_PORT: u16 = 2376;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH user for freshly provisioned hosts.
pub const DEFAULT_SSH_USER: &str = "root";

/// Future returned by driver operations.
///
/// Boxing keeps the trait usable through `Box<dyn Driver>`, which the
/// registry requires for dispatch by name.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + Send + 'a>>;

/// Uniform lifecycle contract over one managed host.
///
/// A driver instance owns its backend credentials, the backend-assigned
/// identifier, and locally cached connection parameters. Instances are
/// driven sequentially by a single caller; there is no internal locking.
///
/// Side effects are backend-specific, with two obligations: `create` must
/// not return success until the host has converged to a usable state
/// (typically [`State::Running`] with a resolvable address), and `remove`
/// must treat a host the backend no longer knows about as already removed.
pub trait Driver: Send + Sync {
    /// Driver name as registered (for example `generic`).
    fn name(&self) -> &'static str;

    /// Applies resolved configuration options.
    ///
    /// Required options missing from `options` fail with
    /// [`DriverError::MissingOption`] before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingOption`] or
    /// [`DriverError::InvalidOption`] on local validation failure.
    fn set_config_from_flags(&mut self, options: &ConfigMap) -> Result<(), DriverError>;

    /// Cheap pre-flight check against the backend, run before any billable
    /// allocation call.
    fn pre_create_check(&self) -> DriverFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    /// Allocates the host and blocks until it converges to a usable state.
    fn create(&mut self) -> DriverFuture<'_, ()>;

    /// Starts a stopped host and waits for convergence.
    fn start(&mut self) -> DriverFuture<'_, ()>;

    /// Stops the host gracefully and waits for convergence.
    fn stop(&mut self) -> DriverFuture<'_, ()>;

    /// Restarts the host. Drivers without special restart behaviour get
    /// stop-then-start.
    fn restart(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            self.stop().await?;
            self.start().await
        })
    }

    /// Stops the host forcefully.
    fn kill(&mut self) -> DriverFuture<'_, ()>;

    /// Removes the host from the backend. Idempotent: a backend that no
    /// longer knows the host is success, not an error.
    fn remove(&mut self) -> DriverFuture<'_, ()>;

    /// Queries the backend for the host's current state. The result is a
    /// snapshot; it is never cached by the caller-facing machinery.
    fn state(&self) -> DriverFuture<'_, State>;

    /// Returns the IP address or hostname the host is reachable at.
    fn ip(&self) -> DriverFuture<'_, String>;

    /// Returns the engine endpoint URL, for example `tcp://1.2.3.4:2376`.
    fn url(&self) -> DriverFuture<'_, String> {
        Box::pin(async move {
            let ip = self.ip().await?;
            Ok(format!("tcp://{ip}:{DEFAULT_ENGINE_PORT}"))
        })
    }

    /// Hostname to use for SSH; defaults to the host's address.
    fn ssh_hostname(&self) -> DriverFuture<'_, String> {
        self.ip()
    }

    /// TCP port to use for SSH.
    fn ssh_port(&self) -> u16 {
        DEFAULT_SSH_PORT
    }

    /// Username to use for SSH.
    fn ssh_username(&self) -> String;

    /// Path to the private key used for SSH, when one is configured.
    fn ssh_key_path(&self) -> Option<Utf8PathBuf>;

    /// Opens a TCP port on the host's firewall, where the backend has one.
    fn authorize_port(&mut self, _port: u16) -> DriverFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    /// Closes a previously authorized TCP port.
    fn deauthorize_port(&mut self, _port: u16) -> DriverFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// Fields every driver shares, regardless of backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseDriver {
    /// Name of the managed machine; generated when the caller does not
    /// supply one.
    pub machine_name: String,
    /// Local directory for per-machine artefacts (keys, certificates).
    pub storage_path: Utf8PathBuf,
    /// SSH user; drivers override per image conventions.
    pub ssh_user: String,
    /// SSH port.
    pub ssh_port: u16,
    /// Private key path, when configured.
    pub ssh_key_path: Option<Utf8PathBuf>,
}

impl BaseDriver {
    /// Creates base fields for a machine, generating a unique name when
    /// `machine_name` is empty.
    #[must_use]
    pub fn new(machine_name: &str, storage_path: &Utf8Path) -> Self {
        let machine_name = if machine_name.trim().is_empty() {
            format!("machina-{}", Uuid::new_v4().simple())
        } else {
            machine_name.trim().to_owned()
        };
        Self {
            machine_name,
            storage_path: storage_path.to_owned(),
            ssh_user: DEFAULT_SSH_USER.to_owned(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_key_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use rstest::rstest;

    use super::BaseDriver;

    #[rstest]
    fn blank_machine_name_is_generated() {
        let base = BaseDriver::new("  ", Utf8Path::new("/tmp/machina"));
        assert!(base.machine_name.starts_with("machina-"));
    }

    #[rstest]
    fn explicit_machine_name_is_trimmed() {
        let base = BaseDriver::new(" build-host ", Utf8Path::new("/tmp/machina"));
        assert_eq!(base.machine_name, "build-host");
    }
}
