//! Error taxonomy shared by every driver.

use thiserror::Error;

/// Errors surfaced by driver operations.
///
/// Every variant maps to one failure class: local validation problems are
/// raised before any network call, transport and provider failures are never
/// retried by the core primitives, and `NotFound` is the idempotent no-op
/// signal that `remove` converts to success.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DriverError {
    /// A required configuration option was not supplied.
    #[error("missing required option: {0}")]
    MissingOption(String),
    /// An option was supplied with a value the driver cannot use.
    #[error("invalid value for option {name}: {reason}")]
    InvalidOption {
        /// Option name as declared in the driver's flag spec.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The network call to the provider could not complete (DNS, connection
    /// refused, TLS failure).
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// Transport-level failure description.
        message: String,
    },
    /// The provider returned a well-formed error response (bad credentials,
    /// quota, invalid parameter). The provider's message is carried verbatim.
    #[error("backend rejected request: {message}")]
    BackendRejected {
        /// Message returned by the provider.
        message: String,
    },
    /// A bounded wait elapsed before the probed condition converged. The
    /// underlying backend operation is left running; callers clean up with
    /// an explicit `remove`.
    #[error("timeout waiting for {action}")]
    Timeout {
        /// Action that was being waited on (for example `create`).
        action: String,
    },
    /// The backend no longer knows the resource.
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },
    /// The driver cannot perform the requested lifecycle operation.
    #[error("{driver} driver does not support {operation}")]
    Unsupported {
        /// Lifecycle operation that was requested.
        operation: String,
        /// Name of the driver rejecting it.
        driver: String,
    },
}

impl DriverError {
    /// Builds a [`DriverError::BackendUnavailable`] from any transport error.
    #[must_use]
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable {
            message: err.to_string(),
        }
    }

    /// Builds a [`DriverError::BackendRejected`] carrying the provider's
    /// message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::BackendRejected {
            message: message.into(),
        }
    }
}
