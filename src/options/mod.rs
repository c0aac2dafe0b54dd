//! Driver configuration options and their resolution.
//!
//! Each driver declares the options it accepts as a list of [`CreateFlag`]
//! entries with defaults and environment-variable fallbacks. Callers supply
//! explicit values as `key=value` pairs; [`ConfigMap::resolve`] merges the
//! three sources with precedence explicit > environment > default and fails
//! with [`DriverError::MissingOption`] before any network call when a
//! required option has no value from any source.


use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// A single typed option value.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean switch.
    Bool(bool),
    /// Integer value (ports, counts, sizes).
    Int(i64),
    /// Free-form string value.
    String(String),
}

impl FlagValue {
    /// Parses a raw string the way explicit `key=value` pairs and
    /// environment fallbacks are interpreted: booleans and integers are
    /// recognised, everything else stays a string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Ok(flag) = raw.parse::<bool>() {
            return Self::Bool(flag);
        }
        if let Ok(number) = raw.parse::<i64>() {
            return Self::Int(number);
        }
        Self::String(raw.to_owned())
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(number) => write!(f, "{number}"),
            Self::String(text) => f.write_str(text),
        }
    }
}

/// Declaration of one option a driver accepts.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateFlag {
    /// Option name, unique within a driver (for example
    /// `generic-ip-address`).
    pub name: &'static str,
    /// Environment variable consulted when no explicit value is supplied.
    pub env_var: Option<&'static str>,
    /// One-line usage text.
    pub usage: &'static str,
    /// Default applied when neither an explicit value nor the environment
    /// provides one.
    pub default: Option<FlagValue>,
    /// Whether resolution fails when no source provides a value.
    pub required: bool,
}

impl CreateFlag {
    /// Declares an optional string flag.
    #[must_use]
    pub const fn string(name: &'static str, env_var: Option<&'static str>, usage: &'static str) -> Self {
        Self {
            name,
            env_var,
            usage,
            default: None,
            required: false,
        }
    }

    /// Marks the flag as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attaches a default value.
    #[must_use]
    pub fn with_default(mut self, value: FlagValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// Resolved option values handed to a driver.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConfigMap {
    values: BTreeMap<String, FlagValue>,
}

impl ConfigMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Parses explicit `key=value` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidOption`] for a pair without `=` or with
    /// an empty key.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, DriverError> {
        let mut map = Self::new();
        for pair in pairs {
            let raw = pair.as_ref();
            let Some((key, value)) = raw.split_once('=') else {
                return Err(DriverError::InvalidOption {
                    name: raw.to_owned(),
                    reason: "expected key=value".to_owned(),
                });
            };
            if key.trim().is_empty() {
                return Err(DriverError::InvalidOption {
                    name: raw.to_owned(),
                    reason: "empty option name".to_owned(),
                });
            }
            map.insert(key.trim(), FlagValue::parse(value));
        }
        Ok(map)
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: &str, value: FlagValue) {
        self.values.insert(key.to_owned(), value);
    }

    /// Returns the string form of a value, if present.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(FlagValue::to_string)
    }

    /// Returns an integer value, if present and integral.
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(FlagValue::Int(number)) => Some(*number),
            Some(FlagValue::String(text)) => text.parse().ok(),
            _ => None,
        }
    }

    /// Returns a boolean value; absent keys read as `false`.
    #[must_use]
    pub fn bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FlagValue::Bool(true)))
    }

    /// Returns the string form of a value or fails with
    /// [`DriverError::MissingOption`].
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingOption`] when the key is absent or its
    /// string form is empty.
    pub fn require_string(&self, key: &str) -> Result<String, DriverError> {
        self.string(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DriverError::MissingOption(key.to_owned()))
    }

    /// Returns a TCP port value, or `fallback` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidOption`] when the value is present but
    /// is not a number or lies outside the valid port range.
    pub fn port(&self, key: &str, fallback: u16) -> Result<u16, DriverError> {
        let Some(value) = self.values.get(key) else {
            return Ok(fallback);
        };
        let number = match value {
            FlagValue::Int(number) => *number,
            FlagValue::String(text) => {
                text.parse::<i64>()
                    .map_err(|_| DriverError::InvalidOption {
                        name: key.to_owned(),
                        reason: format!("{text} is not a number"),
                    })?
            }
            FlagValue::Bool(_) => {
                return Err(DriverError::InvalidOption {
                    name: key.to_owned(),
                    reason: "expected a TCP port number".to_owned(),
                });
            }
        };
        u16::try_from(number).map_err(|_| DriverError::InvalidOption {
            name: key.to_owned(),
            reason: format!("{number} is not a valid TCP port"),
        })
    }

    /// Resolves a flag spec against explicit values and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingOption`] when a required flag has no
    /// value from any source.
    pub fn resolve(flags: &[CreateFlag], explicit: &Self) -> Result<Self, DriverError> {
        Self::resolve_with_env(flags, explicit, |name| std::env::var(name).ok())
    }

    /// Resolution with an injected environment lookup, used by tests to
    /// avoid mutating process state.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingOption`] when a required flag has no
    /// value from any source.
    pub fn resolve_with_env<E>(
        flags: &[CreateFlag],
        explicit: &Self,
        env: E,
    ) -> Result<Self, DriverError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut resolved = Self::new();
        for flag in flags {
            let value = explicit
                .values
                .get(flag.name)
                .cloned()
                .or_else(|| {
                    flag.env_var
                        .and_then(&env)
                        .map(|raw| FlagValue::parse(&raw))
                })
                .or_else(|| flag.default.clone());

            match value {
                Some(merged) => resolved.insert(flag.name, merged),
                None if flag.required => {
                    return Err(DriverError::MissingOption(flag.name.to_owned()));
                }
                None => {}
            }
        }
        Ok(resolved)
    }
}
