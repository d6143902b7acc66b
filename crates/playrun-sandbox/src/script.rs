//! Wrapper script generation.
//!
//! The script loads the key into a fresh ssh-agent (when a key is configured),
//! runs the engine once, and kills the agent. It takes two positional
//! arguments so one script serves every inventory of the run:
//!
//! 1. the extra-variables JSON
//! 2. the inventory file path
//!
//! The script exits with the engine's status, also when an agent was started.

use playrun_core::RunConfig;
use std::path::Path;

const SHEBANG: &str = "#!/bin/sh -u\n";
const AGENT_START: &str = "eval $(ssh-agent) > /dev/null || exit $?\n";
const SAVE_STATUS: &str = "status=$?\n";
const AGENT_STOP: &str = "ssh-agent -k > /dev/null || exit $?\n";
const EXIT_STATUS: &str = "exit $status\n";

/// Builds the wrapper script text from the run configuration and resolved sandbox paths.
pub struct ScriptBuilder<'a> {
    config: &'a RunConfig,
    build_root: &'a Path,
    private_key: Option<&'a Path>,
    askpass: Option<&'a Path>,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(config: &'a RunConfig, build_root: &'a Path) -> Self {
        Self {
            config,
            build_root,
            private_key: None,
            askpass: None,
        }
    }

    pub fn private_key(mut self, path: Option<&'a Path>) -> Self {
        self.private_key = path;
        self
    }

    pub fn askpass(mut self, path: Option<&'a Path>) -> Self {
        self.askpass = path;
        self
    }

    pub fn build(&self) -> String {
        let mut script = String::from(SHEBANG);
        let with_agent = self.config.has_ssh_key();

        if with_agent {
            script.push_str(AGENT_START);
            // SSH_ASKPASS is empty when no passphrase helper was generated.
            script.push_str(&format!(
                "echo \"$SSH_PASSPHRASE\" | SSH_ASKPASS=\"{}\" ssh-add \"{}\" > /dev/null 2>&1 || exit $?\n",
                display_or_empty(self.askpass),
                display_or_empty(self.private_key),
            ));
        }

        let mut command = vec![
            self.config.ansible_bin.display().to_string(),
            "-e".to_string(),
            "\"$1\"".to_string(),
        ];
        if self.config.has_ssh_user() {
            command.push("-u".to_string());
            command.push(format!("\"{}\"", self.config.ssh_user));
        }
        command.push("-i".to_string());
        command.push("\"$2\"".to_string());
        command.push(format!(
            "\"{}\"",
            self.build_root.join(&self.config.playbook).display()
        ));
        command.push("\n".to_string());
        script.push_str(&command.join(" "));

        // The engine's status must survive the agent teardown.
        if with_agent {
            script.push_str(SAVE_STATUS);
            script.push_str(AGENT_STOP);
            script.push_str(EXIT_STATUS);
        }
        script
    }
}

fn display_or_empty(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
