mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use playrun_core::config::SandboxSettings;
use playrun_core::{observability, BuildMetadata, RunConfig};
use playrun_sandbox::{Plugin, RunError};

fn main() -> ExitCode {
    observability::init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = cli.into_overrides();

    let build = BuildMetadata::from_env_or_cli(&overrides);
    let config = RunConfig::from_env_or_cli(&overrides).context("invalid configuration")?;
    tracing::debug!(?build, ?config, "resolved configuration");

    Plugin::new(build, config, SandboxSettings::from_env())
        .exec()
        .context("ansible run failed")?;
    Ok(())
}

/// The failed child's exit code when it fits in a process status, 1 otherwise.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RunError>()
        .and_then(RunError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|&code| code != 0)
        .unwrap_or(1)
}
