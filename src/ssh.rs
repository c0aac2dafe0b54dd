//! Remote command execution through the system `ssh` client.
//!
//! Drivers shell out for post-boot provisioning (key injection, reboots)
//! rather than embedding an SSH implementation. Command strings are always
//! shell-escaped before they cross the wire.

use std::process::Stdio;

use camino::Utf8PathBuf;
use shell_escape::unix::escape;

use crate::error::DriverError;

/// Captured output of one remote command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Remote exit code, when the process terminated normally.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the remote command exited zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Connection parameters for one host, used to build `ssh` invocations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshClient {
    host: String,
    port: u16,
    user: String,
    key_path: Option<Utf8PathBuf>,
}

impl SshClient {
    /// Creates a client for `user@host:port`.
    #[must_use]
    pub fn new(host: &str, port: u16, user: &str, key_path: Option<Utf8PathBuf>) -> Self {
        Self {
            host: host.to_owned(),
            port,
            user: user.to_owned(),
            key_path,
        }
    }

    /// Renders the argument vector for one remote command, suitable for the
    /// system `ssh` binary.
    #[must_use]
    pub fn command_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_owned(),
            "StrictHostKeyChecking=no".to_owned(),
            "-o".to_owned(),
            "UserKnownHostsFile=/dev/null".to_owned(),
            "-o".to_owned(),
            "LogLevel=ERROR".to_owned(),
            "-p".to_owned(),
            self.port.to_string(),
        ];
        if let Some(key) = &self.key_path {
            args.push("-i".to_owned());
            args.push(key.to_string());
        }
        args.push(format!("{}@{}", self.user, self.host));
        args.push(remote_command.to_owned());
        args
    }

    /// Runs a remote command and captures its output.
    ///
    /// A non-zero remote exit code is not an error here; callers inspect
    /// [`CommandOutput::exit_code`] and decide.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::BackendUnavailable`] when the `ssh` process
    /// cannot be spawned or its output cannot be collected.
    pub async fn run(&self, remote_command: &str) -> Result<CommandOutput, DriverError> {
        log::debug!("ssh {}@{}: {remote_command}", self.user, self.host);
        let output = tokio::process::Command::new("ssh")
            .args(self.command_args(remote_command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(DriverError::unavailable)?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Builds the remote command that appends a public key to the SSH user's
/// `authorized_keys`, escaping the key material.
#[must_use]
pub fn authorize_key_command(public_key: &str) -> String {
    let escaped = escape(public_key.trim().into());
    format!(
        "mkdir -p ~/.ssh && chmod 700 ~/.ssh && printf '%s\\n' {escaped} >> ~/.ssh/authorized_keys && chmod 600 ~/.ssh/authorized_keys"
    )
}
