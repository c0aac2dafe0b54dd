//! Driver that adopts a pre-existing host reachable over SSH.
//!
//! Nothing is allocated: `create` proves the access path instead, waiting
//! for the SSH port to accept connections and the engine endpoint to answer
//! its ping. Power management goes through SSH (`shutdown`), so `start` and
//! `stop` of a powered-off host are not possible and are rejected.

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::driver::{BaseDriver, Driver, DriverFuture, DEFAULT_ENGINE_PORT, DEFAULT_SSH_PORT};
use crate::error::DriverError;
use crate::options::{ConfigMap, CreateFlag, FlagValue};
use crate::orchestrator::{converge, CreateFlow, CreateSteps};
use crate::provision;
use crate::registry::DriverDescriptor;
use crate::ssh::{CommandOutput, SshClient};
use crate::state::State;
use crate::waiter::Waiter;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "generic";

const FLAG_IP_ADDRESS: &str = "generic-ip-address";
const FLAG_SSH_USER: &str = "generic-ssh-user";
const FLAG_SSH_KEY: &str = "generic-ssh-key";
const FLAG_SSH_PORT: &str = "generic-ssh-port";
const FLAG_ENGINE_PORT: &str = "generic-engine-port";
const FLAG_PUBLIC_KEY: &str = "generic-public-key";

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const WAIT_TIMEOUT: Duration = Duration::from_secs(180);

/// Returns the registry descriptor for the `generic` driver.
#[must_use]
pub fn descriptor() -> DriverDescriptor {
    DriverDescriptor::new(
        DRIVER_NAME,
        Box::new(|base| Box::new(GenericDriver::new(base))),
        create_flags,
    )
}

/// Options accepted by the `generic` driver.
#[must_use]
pub fn create_flags() -> Vec<CreateFlag> {
    vec![
        CreateFlag::string(FLAG_IP_ADDRESS, Some("GENERIC_IP_ADDRESS"), "IP address of the machine")
            .required(),
        CreateFlag::string(FLAG_SSH_USER, Some("GENERIC_SSH_USER"), "SSH user")
            .with_default(FlagValue::String("root".to_owned())),
        CreateFlag::string(FLAG_SSH_KEY, Some("GENERIC_SSH_KEY"), "SSH private key path"),
        CreateFlag::string(FLAG_SSH_PORT, Some("GENERIC_SSH_PORT"), "SSH port")
            .with_default(FlagValue::Int(i64::from(DEFAULT_SSH_PORT))),
        CreateFlag::string(
            FLAG_ENGINE_PORT,
            Some("GENERIC_ENGINE_PORT"),
            "engine API port",
        )
        .with_default(FlagValue::Int(i64::from(DEFAULT_ENGINE_PORT))),
        CreateFlag::string(
            FLAG_PUBLIC_KEY,
            Some("GENERIC_PUBLIC_KEY"),
            "public key to install into authorized_keys during provisioning",
        ),
    ]
}

/// Driver over a host that already exists outside any backend's control.
#[derive(Clone, Debug)]
pub struct GenericDriver {
    base: BaseDriver,
    ip_address: Option<String>,
    engine_port: u16,
    public_key: Option<Utf8PathBuf>,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl GenericDriver {
    /// Creates an unconfigured driver.
    #[must_use]
    pub const fn new(base: BaseDriver) -> Self {
        Self {
            base,
            ip_address: None,
            engine_port: DEFAULT_ENGINE_PORT,
            public_key: None,
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Overrides the polling interval; used by tests to keep waits fast.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the wait timeout; used by tests to keep timeout scenarios
    /// fast.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    const fn waiter(&self) -> Waiter {
        Waiter::new(self.poll_interval, self.wait_timeout)
    }

    fn require_ip(&self) -> Result<String, DriverError> {
        self.ip_address
            .clone()
            .ok_or_else(|| DriverError::MissingOption(FLAG_IP_ADDRESS.to_owned()))
    }

    fn ssh_client(&self) -> Result<SshClient, DriverError> {
        Ok(SshClient::new(
            &self.require_ip()?,
            self.base.ssh_port,
            &self.base.ssh_user,
            self.base.ssh_key_path.clone(),
        ))
    }

    fn unsupported(&self, operation: &str) -> DriverError {
        DriverError::Unsupported {
            operation: operation.to_owned(),
            driver: DRIVER_NAME.to_owned(),
        }
    }

    async fn observe_state(&self) -> Result<State, DriverError> {
        let ip = self.require_ip()?;
        if provision::tcp_reachable(&ip, self.base.ssh_port).await {
            Ok(State::Running)
        } else {
            Ok(State::Stopped)
        }
    }

    /// Issues a shutdown command, tolerating the connection dropping as the
    /// host goes down.
    async fn shutdown(&self, args: &str) -> Result<(), DriverError> {
        let ssh = self.ssh_client()?;
        let output = ssh.run(&format!("sudo shutdown {args}")).await?;
        shutdown_result(&output)
    }
}

/// Interprets a remote shutdown's exit status. The host may cut the session
/// as it goes down, which ssh reports as exit 255 (or no exit code at all);
/// both count as success. Any other non-zero exit means the remote command
/// itself failed, for example a denied sudo.
fn shutdown_result(output: &CommandOutput) -> Result<(), DriverError> {
    match output.exit_code {
        None | Some(0 | 255) => Ok(()),
        Some(code) => Err(DriverError::rejected(format!(
            "shutdown exited {code}: {}",
            output.stderr.trim()
        ))),
    }
}

impl CreateSteps for GenericDriver {
    fn machine_name(&self) -> &str {
        &self.base.machine_name
    }

    fn validate_config(&self) -> Result<(), DriverError> {
        self.require_ip().map(|_| ())
    }

    async fn pre_create_check(&self) -> Result<(), DriverError> {
        if let Some(key) = &self.base.ssh_key_path {
            tokio::fs::metadata(key)
                .await
                .map_err(|err| DriverError::InvalidOption {
                    name: FLAG_SSH_KEY.to_owned(),
                    reason: format!("cannot read {key}: {err}"),
                })?;
        }
        Ok(())
    }

    async fn allocate(&mut self) -> Result<(), DriverError> {
        // The host already exists; there is nothing to allocate.
        log::debug!("adopting existing host at {:?}", self.ip_address);
        Ok(())
    }

    async fn probe_ready(&self) -> Result<bool, DriverError> {
        let ip = self.require_ip()?;
        Ok(provision::tcp_reachable(&ip, self.base.ssh_port).await)
    }

    async fn post_provision(&mut self) -> Result<(), DriverError> {
        if let Some(public_key) = self.public_key.clone() {
            let ssh = self.ssh_client()?;
            provision::authorize_key(&ssh, &public_key).await?;
        }

        let url = format!("tcp://{}:{}", self.require_ip()?, self.engine_port);
        provision::wait_for_engine(&self.waiter(), &url).await
    }
}

impl Driver for GenericDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn set_config_from_flags(&mut self, options: &ConfigMap) -> Result<(), DriverError> {
        self.ip_address = Some(options.require_string(FLAG_IP_ADDRESS)?);
        if let Some(user) = options.string(FLAG_SSH_USER) {
            self.base.ssh_user = user;
        }
        self.base.ssh_port = options.port(FLAG_SSH_PORT, DEFAULT_SSH_PORT)?;
        self.engine_port = options.port(FLAG_ENGINE_PORT, DEFAULT_ENGINE_PORT)?;
        self.base.ssh_key_path = options.string(FLAG_SSH_KEY).map(Utf8PathBuf::from);
        self.public_key = options.string(FLAG_PUBLIC_KEY).map(Utf8PathBuf::from);
        Ok(())
    }

    fn create(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            let flow = CreateFlow::new(self.waiter());
            flow.run(self).await
        })
    }

    fn start(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("start")) })
    }

    fn stop(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("stop")) })
    }

    fn restart(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            log::info!("Restarting {}...", self.base.machine_name);
            self.shutdown("-r now").await?;
            let ip = self.require_ip()?;
            provision::wait_for_tcp(&self.waiter(), "restart", &ip, self.base.ssh_port).await
        })
    }

    fn kill(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            log::info!("Powering off {}...", self.base.machine_name);
            converge(
                &self.waiter(),
                "kill",
                State::Stopped,
                || self.shutdown("-P now"),
                || self.observe_state(),
            )
            .await
        })
    }

    fn remove(&mut self) -> DriverFuture<'_, ()> {
        // Nothing was allocated, so removal never has anything to undo.
        Box::pin(async { Ok(()) })
    }

    fn state(&self) -> DriverFuture<'_, State> {
        Box::pin(async move { self.observe_state().await })
    }

    fn ip(&self) -> DriverFuture<'_, String> {
        Box::pin(async move { self.require_ip() })
    }

    fn url(&self) -> DriverFuture<'_, String> {
        Box::pin(async move {
            let ip = self.require_ip()?;
            Ok(format!("tcp://{ip}:{}", self.engine_port))
        })
    }

    fn ssh_port(&self) -> u16 {
        self.base.ssh_port
    }

    fn ssh_username(&self) -> String {
        self.base.ssh_user.clone()
    }

    fn ssh_key_path(&self) -> Option<Utf8PathBuf> {
        self.base.ssh_key_path.clone()
    }
}
