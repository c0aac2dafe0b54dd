//! Command-line interface definitions for the `machina` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `machina` binary.
#[derive(Debug, Parser)]
#[command(
    name = "machina",
    about = "Provision and manage container-ready hosts through pluggable drivers",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// List the registered drivers.
    #[command(name = "drivers", about = "List the registered drivers")]
    Drivers,
    /// Show the options a driver accepts.
    #[command(name = "flags", about = "Show the options a driver accepts")]
    Flags(FlagsCommand),
    /// Create a machine and wait until it is usable.
    #[command(name = "create", about = "Create a machine and wait until it is usable")]
    Create(MachineCommand),
    /// Remove a machine from its backend.
    #[command(name = "rm", about = "Remove a machine from its backend")]
    Rm(MachineCommand),
    /// Report a machine's current state.
    #[command(name = "status", about = "Report a machine's current state")]
    Status(MachineCommand),
    /// Print a machine's IP address.
    #[command(name = "ip", about = "Print a machine's IP address")]
    Ip(MachineCommand),
    /// Print a machine's engine endpoint URL.
    #[command(name = "url", about = "Print a machine's engine endpoint URL")]
    Url(MachineCommand),
}

/// Arguments for the `machina flags` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct FlagsCommand {
    /// Restrict the listing to one driver; all drivers are shown otherwise.
    #[arg(long, short = 'd', value_name = "DRIVER")]
    pub(crate) driver: Option<String>,
}

/// Arguments shared by the machine lifecycle subcommands.
#[derive(Debug, Parser)]
pub(crate) struct MachineCommand {
    /// Driver to operate through.
    #[arg(long, short = 'd', value_name = "DRIVER")]
    pub(crate) driver: String,
    /// Machine name; a unique one is generated when omitted.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: Option<String>,
    /// Driver option as key=value; repeatable.
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
    pub(crate) options: Vec<String>,
}
