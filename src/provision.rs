//! Post-boot provisioning probes shared by drivers.
//!
//! A host that has converged at the backend still needs its access path
//! proven: the SSH port must accept connections, the container engine must
//! answer its ping endpoint, and the caller's public key may need to be
//! installed. Each check reuses the [`Waiter`] so the convergence semantics
//! stay uniform across drivers.

use std::sync::LazyLock;
use std::time::Duration;

use camino::Utf8Path;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::DriverError;
use crate::ssh::{authorize_key_command, SshClient};
use crate::waiter::{PollPolicy, Waiter};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Waits until `host:port` accepts TCP connections.
///
/// Connection failures count as "not ready yet" rather than probe errors:
/// a booting host refuses connections until its services come up.
///
/// # Errors
///
/// Returns [`DriverError::Timeout`] when the port never opens within the
/// waiter's deadline.
pub async fn wait_for_tcp<P: PollPolicy>(
    waiter: &Waiter<P>,
    action: &str,
    host: &str,
    port: u16,
) -> Result<(), DriverError> {
    waiter
        .wait_for(action, || {
            let connect = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)));
            async move { Ok(matches!(connect.await, Ok(Ok(_)))) }
        })
        .await
}

/// Reports whether `host:port` currently accepts TCP connections.
#[must_use]
pub async fn tcp_reachable(host: &str, port: u16) -> bool {
    matches!(
        timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Converts an engine endpoint URL (`tcp://host:port`) into the HTTP base
/// used for the ping check.
#[must_use]
pub fn engine_http_url(url: &str) -> String {
    url.strip_prefix("tcp://")
        .map_or_else(|| url.to_owned(), |rest| format!("http://{rest}"))
}

/// Waits until the container engine behind `url` answers `GET /_ping`.
///
/// Transport failures count as "not ready yet"; only a completed response
/// with a non-success status fails the wait, since that means something
/// other than the engine answered.
///
/// # Errors
///
/// Returns [`DriverError::BackendRejected`] on a non-success ping response
/// or [`DriverError::Timeout`] when the engine never answers within the
/// waiter's deadline.
pub async fn wait_for_engine<P: PollPolicy>(
    waiter: &Waiter<P>,
    url: &str,
) -> Result<(), DriverError> {
    let ping_url = format!("{}/_ping", engine_http_url(url));
    waiter
        .wait_for("engine ping", || {
            let request = HTTP_CLIENT.get(&ping_url).send();
            async move {
                match request.await {
                    Ok(response) if response.status().is_success() => Ok(true),
                    Ok(response) => Err(DriverError::rejected(format!(
                        "engine ping returned {}",
                        response.status()
                    ))),
                    Err(err) => {
                        log::debug!("engine not answering yet: {err}");
                        Ok(false)
                    }
                }
            }
        })
        .await
}

/// Installs the caller's public key into the remote user's
/// `authorized_keys`.
///
/// This is the bootstrap-trust step of post-provisioning: the connection
/// uses whatever credential the image boots with, and the injected key
/// takes over from there.
///
/// # Errors
///
/// Returns [`DriverError::InvalidOption`] when the key file cannot be read,
/// [`DriverError::BackendUnavailable`] when SSH cannot run, or
/// [`DriverError::BackendRejected`] when the remote command exits non-zero.
pub async fn authorize_key(ssh: &SshClient, public_key: &Utf8Path) -> Result<(), DriverError> {
    let key_material =
        tokio::fs::read_to_string(public_key)
            .await
            .map_err(|err| DriverError::InvalidOption {
                name: "public-key".to_owned(),
                reason: format!("cannot read {public_key}: {err}"),
            })?;

    log::info!("Installing public key from {public_key}...");
    let output = ssh.run(&authorize_key_command(&key_material)).await?;
    if output.success() {
        Ok(())
    } else {
        Err(DriverError::rejected(format!(
            "authorized_keys installation failed: {}",
            output.stderr.trim()
        )))
    }
}
