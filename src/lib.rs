//! Core library for the Machina host-provisioning tool.
//!
//! The crate exposes a driver abstraction for managing container-ready
//! hosts across backends: a uniform lifecycle contract ([`Driver`]), a
//! registry that dispatches to drivers by name, and an orchestrator that
//! runs the backend-independent create flow (validate → pre-check →
//! allocate → wait for readiness → provision).

pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod provision;
pub mod registry;
pub mod ssh;
pub mod state;
pub mod test_support;
pub mod waiter;

pub use config::{ConfigError, MachineConfig};
pub use driver::{BaseDriver, Driver, DriverFuture};
pub use error::DriverError;
pub use options::{ConfigMap, CreateFlag, FlagValue};
pub use orchestrator::{converge, CreateFlow, CreateSteps};
pub use registry::{DriverDescriptor, Registry, RegistryError};
pub use ssh::SshClient;
pub use state::State;
pub use waiter::{ExponentialBackoff, FixedInterval, PollPolicy, Waiter};
