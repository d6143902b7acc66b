//! One complete run: set up the sandbox, execute, tear down.

use std::io::Write;

use playrun_core::config::SandboxSettings;
use playrun_core::{BuildMetadata, RunConfig};

use crate::error::RunError;
use crate::info_log;
use crate::runner::Executor;
use crate::sandbox::Sandbox;

pub struct Plugin {
    build: BuildMetadata,
    config: RunConfig,
    settings: SandboxSettings,
}

impl Plugin {
    pub fn new(build: BuildMetadata, config: RunConfig, settings: SandboxSettings) -> Self {
        Self {
            build,
            config,
            settings,
        }
    }

    /// Run with the debug dump and command trace on stdout.
    pub fn exec(&self) -> Result<(), RunError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.exec_with_output(&mut out)
    }

    /// The sandbox is torn down on every path. A cleanup failure is the run's
    /// error only when nothing failed before it; otherwise it is logged.
    pub fn exec_with_output(&self, out: &mut dyn Write) -> Result<(), RunError> {
        info_log!(
            inventories = ?self.config.inventories,
            playbook = %self.config.playbook,
            strategy = %self.config.strategy,
            "starting run"
        );
        let sandbox = Sandbox::set_up(&self.build, &self.config, &self.settings, out)?;

        let result = Executor::new(&self.build, &self.config, &sandbox, out).run();

        match (result, sandbox.tear_down()) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(cleanup)) => Err(cleanup.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                tracing::warn!(error = %cleanup, "sandbox cleanup failed after run failure");
                Err(err)
            }
        }
    }
}
