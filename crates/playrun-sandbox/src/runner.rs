//! Command synthesis and sequential execution.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use playrun_core::config::env_keys::child;
use playrun_core::observability;
use playrun_core::{BuildMetadata, RunConfig, Strategy};

use crate::agent::SshAgent;
use crate::error::RunError;
use crate::info_log;
use crate::sandbox::Sandbox;
use crate::vars::ExtraVars;

/// One child process: program, arguments, and variables layered over the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined by spaces, as traced before execution.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// stdout/stderr are inherited so child output streams live.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

#[cfg(test)]
impl Invocation {
    fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Runs the version check and then one engine invocation per inventory, in order.
pub struct Executor<'a> {
    build: &'a BuildMetadata,
    config: &'a RunConfig,
    sandbox: &'a Sandbox,
    extra_vars: String,
    trace: &'a mut dyn Write,
}

impl<'a> Executor<'a> {
    /// `trace` receives one `$ <command line>` per invocation before it runs.
    pub fn new(
        build: &'a BuildMetadata,
        config: &'a RunConfig,
        sandbox: &'a Sandbox,
        trace: &'a mut dyn Write,
    ) -> Self {
        let extra_vars =
            ExtraVars::new(build, sandbox.files().private_key.as_deref()).to_json();
        Self {
            build,
            config,
            sandbox,
            extra_vars,
            trace,
        }
    }

    pub fn extra_vars(&self) -> &str {
        &self.extra_vars
    }

    /// `<root>/<inventory_path>/<inventory>`
    pub fn inventory_file(&self, inventory: &str) -> PathBuf {
        self.build
            .path
            .join(&self.config.inventory_path)
            .join(inventory)
    }

    fn playbook_file(&self) -> PathBuf {
        self.build.path.join(&self.config.playbook)
    }

    pub fn version_check_invocation(&self) -> Invocation {
        Invocation::new(&self.config.ansible_bin).arg("--version")
    }

    /// Wrapper-script invocation for one inventory.
    pub fn invocation_for(&self, inventory: &str) -> Invocation {
        Invocation::new(&self.sandbox.files().script)
            .arg(self.extra_vars.clone())
            .arg(self.inventory_file(inventory).display().to_string())
            .env(child::SSH_PASSPHRASE, self.config.ssh_passphrase.clone())
            .env(
                child::ANSIBLE_CONFIG,
                self.sandbox.files().ansible_cfg.display().to_string(),
            )
    }

    /// Direct engine invocation for one inventory, pointed at `agent` when a key is loaded.
    pub fn direct_invocation_for(&self, inventory: &str, agent: Option<&SshAgent>) -> Invocation {
        let mut inv = Invocation::new(&self.config.ansible_bin)
            .arg("-e")
            .arg(self.extra_vars.clone());
        if self.config.has_ssh_user() {
            inv = inv.arg("-u").arg(self.config.ssh_user.clone());
        }
        inv = inv
            .arg("-i")
            .arg(self.inventory_file(inventory).display().to_string())
            .arg(self.playbook_file().display().to_string())
            .env(
                child::ANSIBLE_CONFIG,
                self.sandbox.files().ansible_cfg.display().to_string(),
            );
        if let Some(agent) = agent {
            for (k, v) in agent.env() {
                inv = inv.env(k, v);
            }
        }
        inv
    }

    /// Every invocation the script strategy issues, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        std::iter::once(self.version_check_invocation())
            .chain(self.config.inventories.iter().map(|i| self.invocation_for(i)))
            .collect()
    }

    /// Version check, then each inventory. Stops at the first failure.
    pub fn run(&mut self) -> Result<(), RunError> {
        if !self.config.become_user.is_empty() || !self.config.become_password.is_empty() {
            tracing::debug!("become credentials are accepted but not passed to ansible-playbook");
        }
        match self.config.strategy {
            Strategy::Script => {
                for inv in self.invocations() {
                    self.run_invocation(&inv)?;
                }
                Ok(())
            }
            Strategy::Direct => self.run_direct(),
        }
    }

    fn run_direct(&mut self) -> Result<(), RunError> {
        self.run_invocation(&self.version_check_invocation())?;

        let files = self.sandbox.files();
        let agent = match &files.private_key {
            Some(key) => {
                let agent = SshAgent::start(&self.config.ssh_agent_bin)?;
                agent.add_key(
                    &self.config.ssh_add_bin,
                    key,
                    files.askpass.as_deref(),
                    &self.config.ssh_passphrase,
                )?;
                Some(agent)
            }
            None => None,
        };

        let config = self.config;
        for inventory in &config.inventories {
            let inv = self.direct_invocation_for(inventory, agent.as_ref());
            self.run_invocation(&inv)?;
        }

        match agent {
            Some(agent) => agent.stop(),
            None => Ok(()),
        }
    }

    fn run_invocation(&mut self, inv: &Invocation) -> Result<(), RunError> {
        let command = inv.command_line();
        if let Err(e) = writeln!(self.trace, "$ {}", command).and_then(|_| self.trace.flush()) {
            tracing::warn!(error = %e, "failed to write command trace");
        }

        let program = inv.program.display().to_string();
        observability::audit_execution_started(&program, &inv.args);
        let start = Instant::now();

        let status = inv
            .to_command()
            .status()
            .map_err(|source| RunError::Spawn {
                command: command.clone(),
                source,
            })?;

        let elapsed = start.elapsed().as_millis() as u64;
        observability::audit_execution_completed(&program, status.code(), elapsed);
        if !status.success() {
            return Err(RunError::Command { command, status });
        }
        info_log!(program = %program, duration_ms = elapsed, "command finished");
        Ok(())
    }
}
