//! Binary entry point for the Machina CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use machina::{
    BaseDriver, ConfigMap, Driver, DriverError, MachineConfig, Registry, RegistryError,
};

mod cli;

use cli::{Cli, FlagsCommand, MachineCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("could not write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Drivers => list_drivers(),
        Cli::Flags(command) => list_flags(&command),
        Cli::Create(command) => {
            let mut driver = configure_driver(&command)?;
            driver.create().await?;
            writeln!(io::stdout(), "{}", driver.url().await?)?;
            Ok(0)
        }
        Cli::Rm(command) => {
            let mut driver = configure_driver(&command)?;
            driver.remove().await?;
            Ok(0)
        }
        Cli::Status(command) => {
            let driver = configure_driver(&command)?;
            writeln!(io::stdout(), "{}", driver.state().await?)?;
            Ok(0)
        }
        Cli::Ip(command) => {
            let driver = configure_driver(&command)?;
            writeln!(io::stdout(), "{}", driver.ip().await?)?;
            Ok(0)
        }
        Cli::Url(command) => {
            let driver = configure_driver(&command)?;
            writeln!(io::stdout(), "{}", driver.url().await?)?;
            Ok(0)
        }
    }
}

fn list_drivers() -> Result<i32, CliError> {
    let registry = Registry::with_default_drivers();
    let mut stdout = io::stdout();
    for name in registry.driver_names() {
        writeln!(stdout, "{name}")?;
    }
    Ok(0)
}

fn list_flags(command: &FlagsCommand) -> Result<i32, CliError> {
    let registry = Registry::with_default_drivers();
    let flags = match &command.driver {
        Some(driver) => registry.lookup(driver)?.create_flags(),
        None => registry.create_flags(),
    };

    let mut stdout = io::stdout();
    for flag in flags {
        let mut line = format!("--{}", flag.name);
        if flag.required {
            line.push_str(" (required)");
        }
        if let Some(default) = &flag.default {
            line.push_str(&format!(" [default: {default}]"));
        }
        if let Some(env_var) = flag.env_var {
            line.push_str(&format!(" [env: {env_var}]"));
        }
        writeln!(stdout, "{line}")?;
        writeln!(stdout, "    {}", flag.usage)?;
    }
    Ok(0)
}

/// Builds a configured driver instance for a lifecycle subcommand.
///
/// Option resolution happens here, before the driver touches its backend:
/// explicit `-o` pairs win over environment variables, which win over the
/// driver's declared defaults. A required option with no value from any
/// source fails the command without a network call.
fn configure_driver(command: &MachineCommand) -> Result<Box<dyn Driver>, CliError> {
    let config =
        MachineConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let registry = Registry::with_default_drivers();
    let descriptor = registry.lookup(&command.driver)?;

    let explicit = ConfigMap::from_pairs(&command.options)?;
    let resolved = ConfigMap::resolve(&descriptor.create_flags(), &explicit)?;

    let machine_name = command.name.as_deref().unwrap_or_default();
    let base = BaseDriver::new(machine_name, &config.storage_path());
    let mut driver = descriptor.instantiate(base);
    driver.set_config_from_flags(&resolved)?;
    Ok(driver)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
