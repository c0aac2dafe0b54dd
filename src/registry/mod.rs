//! Table of known drivers, keyed by name.
//!
//! The registry decouples "which backend to use" (a configuration-time
//! string) from "how to construct and drive it" (compiled-in factory code).
//! It is append-only: registration happens once at startup and nothing is
//! ever unregistered. Lookups are safe from concurrent callers after the
//! registration phase.


use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::driver::{BaseDriver, Driver};
use crate::options::CreateFlag;

/// Constructor producing a driver instance from shared base fields.
pub type DriverFactory = Box<dyn Fn(BaseDriver) -> Box<dyn Driver> + Send + Sync>;

/// Function producing the configuration options a driver accepts.
pub type FlagSpec = fn() -> Vec<CreateFlag>;

/// Registration record for one driver.
pub struct DriverDescriptor {
    name: &'static str,
    factory: DriverFactory,
    flag_spec: FlagSpec,
}

impl DriverDescriptor {
    /// Creates a descriptor from a factory and flag-spec function.
    #[must_use]
    pub fn new(name: &'static str, factory: DriverFactory, flag_spec: FlagSpec) -> Self {
        Self {
            name,
            factory,
            flag_spec,
        }
    }

    /// Name the driver is registered under.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the options this driver accepts, with their defaults.
    #[must_use]
    pub fn create_flags(&self) -> Vec<CreateFlag> {
        (self.flag_spec)()
    }

    /// Invokes the factory to build a fresh driver instance.
    #[must_use]
    pub fn instantiate(&self, base: BaseDriver) -> Box<dyn Driver> {
        (self.factory)(base)
    }
}

impl std::fmt::Debug for DriverDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Errors raised by registry operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RegistryError {
    /// A driver with this name is already registered; the existing
    /// descriptor is left untouched.
    #[error("driver name already registered: {name}")]
    Duplicate {
        /// Conflicting driver name.
        name: String,
    },
    /// No driver is registered under this name.
    #[error("unknown driver: {name}")]
    Unknown {
        /// Name that was looked up.
        name: String,
    },
}

/// Registry of driver factories keyed by name.
#[derive(Debug, Default)]
pub struct Registry {
    drivers: RwLock<HashMap<&'static str, Arc<DriverDescriptor>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in drivers registered.
    #[must_use]
    pub fn with_default_drivers() -> Self {
        let registry = Self::new();
        crate::drivers::register_builtin(&registry);
        registry
    }

    /// Registers a driver descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the name is taken; the
    /// original descriptor is not replaced.
    pub fn register(&self, descriptor: DriverDescriptor) -> Result<(), RegistryError> {
        let mut drivers = self
            .drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if drivers.contains_key(descriptor.name) {
            return Err(RegistryError::Duplicate {
                name: descriptor.name.to_owned(),
            });
        }
        drivers.insert(descriptor.name, Arc::new(descriptor));
        Ok(())
    }

    /// Looks up a driver descriptor by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] when no driver carries the name.
    pub fn lookup(&self, name: &str) -> Result<Arc<DriverDescriptor>, RegistryError> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_owned(),
            })
    }

    /// Instantiates a driver by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] when no driver carries the name.
    pub fn create(&self, name: &str, base: BaseDriver) -> Result<Box<dyn Driver>, RegistryError> {
        Ok(self.lookup(name)?.instantiate(base))
    }

    /// Returns all registered driver names, sorted.
    #[must_use]
    pub fn driver_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|name| (*name).to_owned())
            .collect();
        names.sort();
        names
    }

    /// Aggregates every registered driver's create flags, sorted by flag
    /// name.
    #[must_use]
    pub fn create_flags(&self) -> Vec<CreateFlag> {
        let mut flags: Vec<CreateFlag> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flat_map(|descriptor| descriptor.create_flags())
            .collect();
        flags.sort_by_key(|flag| flag.name);
        flags
    }
}
