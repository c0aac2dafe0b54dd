//! Driver for hosts that are not managed by any backend.
//!
//! Points at an existing engine URL and answers the read-only parts of the
//! contract; lifecycle operations that would require a backend are
//! rejected. Useful for wiring tests and for registering hosts provisioned
//! elsewhere.

use camino::Utf8PathBuf;

use crate::driver::{BaseDriver, Driver, DriverFuture};
use crate::error::DriverError;
use crate::options::{ConfigMap, CreateFlag};
use crate::registry::DriverDescriptor;
use crate::state::State;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "none";

/// Returns the registry descriptor for the `none` driver.
#[must_use]
pub fn descriptor() -> DriverDescriptor {
    DriverDescriptor::new(
        DRIVER_NAME,
        Box::new(|base| Box::new(NoneDriver::new(base))),
        create_flags,
    )
}

/// Options accepted by the `none` driver.
#[must_use]
pub fn create_flags() -> Vec<CreateFlag> {
    vec![CreateFlag::string("url", Some("NONE_URL"), "URL of the existing engine endpoint").required()]
}

/// Driver over an unmanaged, already-running host.
#[derive(Clone, Debug)]
pub struct NoneDriver {
    base: BaseDriver,
    url: Option<String>,
}

impl NoneDriver {
    /// Creates an unconfigured driver.
    #[must_use]
    pub const fn new(base: BaseDriver) -> Self {
        Self { base, url: None }
    }

    fn require_url(&self) -> Result<String, DriverError> {
        self.url
            .clone()
            .ok_or_else(|| DriverError::MissingOption("url".to_owned()))
    }

    fn unsupported(&self, operation: &str) -> DriverError {
        DriverError::Unsupported {
            operation: operation.to_owned(),
            driver: DRIVER_NAME.to_owned(),
        }
    }
}

/// Extracts the host portion of an engine URL such as `tcp://1.2.3.4:2376`.
///
/// Bracketed IPv6 authorities (`tcp://[::1]:2376`) yield the address inside
/// the brackets.
fn host_from_url(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = without_scheme
        .split_once('/')
        .map_or(without_scheme, |(front, _)| front);
    let host = authority.strip_prefix('[').map_or_else(
        || authority.split_once(':').map_or(authority, |(name, _)| name),
        |bracketed| bracketed.split_once(']').map_or(bracketed, |(inside, _)| inside),
    );
    if host.is_empty() {
        None
    } else {
        Some(host.to_owned())
    }
}

impl Driver for NoneDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn set_config_from_flags(&mut self, options: &ConfigMap) -> Result<(), DriverError> {
        self.url = Some(options.require_string("url")?);
        Ok(())
    }

    fn create(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.require_url().map(|_| ()) })
    }

    fn start(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("start")) })
    }

    fn stop(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("stop")) })
    }

    fn restart(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("restart")) })
    }

    fn kill(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { Err(self.unsupported("kill")) })
    }

    fn remove(&mut self) -> DriverFuture<'_, ()> {
        // Nothing was allocated, so there is never anything to tear down.
        Box::pin(async { Ok(()) })
    }

    fn state(&self) -> DriverFuture<'_, State> {
        Box::pin(async { Ok(State::Running) })
    }

    fn ip(&self) -> DriverFuture<'_, String> {
        Box::pin(async move {
            let url = self.require_url()?;
            host_from_url(&url).ok_or_else(|| DriverError::InvalidOption {
                name: "url".to_owned(),
                reason: format!("no host in {url}"),
            })
        })
    }

    fn url(&self) -> DriverFuture<'_, String> {
        Box::pin(async move { self.require_url() })
    }

    fn ssh_username(&self) -> String {
        self.base.ssh_user.clone()
    }

    fn ssh_key_path(&self) -> Option<Utf8PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use rstest::rstest;

    use super::{host_from_url, NoneDriver};
    use crate::driver::{BaseDriver, Driver};
    use crate::error::DriverError;
    use crate::options::ConfigMap;
    use crate::state::State;

    fn driver() -> NoneDriver {
        NoneDriver::new(BaseDriver::new("machine", Utf8Path::new("/tmp/machina")))
    }

    #[rstest]
    #[case("tcp://192.0.2.1:2376", Some("192.0.2.1"))]
    #[case("tcp://host.example.net", Some("host.example.net"))]
    #[case("192.0.2.1:2376", Some("192.0.2.1"))]
    #[case("tcp://[::1]:2376", Some("::1"))]
    #[case("tcp://[fe80::aa:1]", Some("fe80::aa:1"))]
    #[case("tcp://", None)]
    fn host_extraction(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(host_from_url(url), expected.map(str::to_owned));
    }

    #[tokio::test]
    async fn missing_url_fails_before_create() {
        let mut none = driver();
        let err = none
            .set_config_from_flags(&ConfigMap::new())
            .expect_err("url should be required");
        assert_eq!(err, DriverError::MissingOption("url".to_owned()));
    }

    #[tokio::test]
    async fn configured_driver_reports_running_and_echoes_url() {
        let mut none = driver();
        let options = ConfigMap::from_pairs(&["url=tcp://192.0.2.1:2376"])
            .unwrap_or_else(|err| panic!("pairs: {err}"));
        none.set_config_from_flags(&options)
            .unwrap_or_else(|err| panic!("configure: {err}"));

        none.create()
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        assert_eq!(none.state().await.ok(), Some(State::Running));
        assert_eq!(none.url().await.ok(), Some("tcp://192.0.2.1:2376".to_owned()));
        assert_eq!(none.ip().await.ok(), Some("192.0.2.1".to_owned()));
    }

    #[tokio::test]
    async fn lifecycle_operations_are_unsupported() {
        let mut none = driver();
        assert!(matches!(
            none.start().await,
            Err(DriverError::Unsupported { .. })
        ));
        assert!(matches!(
            none.stop().await,
            Err(DriverError::Unsupported { .. })
        ));
        assert!(matches!(
            none.kill().await,
            Err(DriverError::Unsupported { .. })
        ));
        assert!(matches!(
            none.restart().await,
            Err(DriverError::Unsupported { ref operation, .. }) if operation == "restart"
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let mut none = driver();
        none.remove()
            .await
            .unwrap_or_else(|err| panic!("first remove: {err}"));
        none.remove()
            .await
            .unwrap_or_else(|err| panic!("second remove: {err}"));
    }
}
