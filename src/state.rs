//! Host lifecycle states as reported by a backend.

use std::fmt;

/// Snapshot of where a host is in its lifecycle.
///
/// The value is derived on demand from the backend, which remains the source
/// of truth; nothing in the crate caches it authoritatively. No transitions
/// are encoded here: a backend may legitimately report `Running` after
/// `Error` once an operator intervenes, so the enum carries no notion of
/// terminal states.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum State {
    /// The backend reports no state for the host (for example before the
    /// first allocation call has completed).
    #[default]
    None,
    /// The host is booting or otherwise coming up.
    Starting,
    /// The host is up and reachable.
    Running,
    /// The host is paused by the hypervisor.
    Paused,
    /// The host state has been saved to disk (suspend-to-disk).
    Saved,
    /// A stop request is in progress.
    Stopping,
    /// The host is powered off.
    Stopped,
    /// The backend reports a fault for the host.
    Error,
}

impl State {
    /// Returns the lowercase display name for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Saved => "saved",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::State;

    #[rstest]
    #[case(State::None, "none")]
    #[case(State::Starting, "starting")]
    #[case(State::Running, "running")]
    #[case(State::Paused, "paused")]
    #[case(State::Saved, "saved")]
    #[case(State::Stopping, "stopping")]
    #[case(State::Stopped, "stopped")]
    #[case(State::Error, "error")]
    fn display_matches_name(#[case] state: State, #[case] expected: &str) {
        assert_eq!(state.to_string(), expected);
    }
}
