//! Behavioural tests for the `machina` CLI.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_without_arguments_shows_usage() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn cli_drivers_lists_builtins_sorted() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.arg("drivers");
    cmd.assert()
        .success()
        .stdout(contains("generic\nnone\n"));
}

#[test]
fn cli_flags_shows_required_driver_options() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.args(["flags", "--driver", "generic"]);
    cmd.assert()
        .success()
        .stdout(contains("--generic-ip-address (required)"))
        .stdout(contains("[env: GENERIC_IP_ADDRESS]"));
}

#[test]
fn cli_status_rejects_unknown_driver() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.args(["status", "--driver", "no-such-driver"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("unknown driver: no-such-driver"));
}

#[test]
fn cli_ip_resolves_host_from_none_driver_url() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.args([
        "ip",
        "--driver",
        "none",
        "-o",
        "url=tcp://192.0.2.9:2376",
    ]);
    cmd.assert().success().stdout(contains("192.0.2.9"));
}

#[test]
fn cli_create_fails_fast_on_missing_required_option() {
    let mut cmd = cargo_bin_cmd!("machina");
    cmd.env_remove("NONE_URL");
    cmd.args(["create", "--driver", "none"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("missing required option: url"));
}
