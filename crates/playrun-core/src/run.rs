//! Run inputs: build metadata from the CI runner and the plugin configuration.
//!
//! Both are resolved once at startup (CLI > environment > default) and are
//! read-only afterwards.

use crate::config::env_keys::{build as build_keys, run as run_keys};
use crate::config::loader::{env_bool, env_list, env_optional, env_verbatim};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_INVENTORY_PATH: &str = "provisioning/inventory";
pub const DEFAULT_INVENTORY: &str = "staging";
pub const DEFAULT_PLAYBOOK: &str = "provisioning/provision.yml";
pub const DEFAULT_ANSIBLE_BIN: &str = "/usr/bin/ansible-playbook";
pub const DEFAULT_SSH_AGENT_BIN: &str = "ssh-agent";
pub const DEFAULT_SSH_ADD_BIN: &str = "ssh-add";

/// Identity of the build being provisioned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Working-directory root; playbook and inventory paths are joined onto it.
    pub path: PathBuf,
    /// Commit hash, empty when unknown.
    pub sha: String,
    /// Commit tag, empty when the build is not a tag build.
    pub tag: String,
}

/// How inventories are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Invoke the generated wrapper script once per inventory.
    #[default]
    Script,
    /// Manage the ssh-agent in process and invoke the engine directly.
    Direct,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown strategy '{0}' (expected 'script' or 'direct')")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(Self::Script),
            "direct" => Ok(Self::Direct),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

/// Plugin configuration for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Folder holding the inventory files, relative to the build root.
    pub inventory_path: String,
    /// Inventory file names, run in this order. Never empty after resolution.
    pub inventories: Vec<String>,
    /// Playbook path relative to the build root.
    pub playbook: String,
    pub ssh_user: String,
    pub ssh_key: String,
    pub ssh_passphrase: String,
    /// Accepted for compatibility; not forwarded to the engine.
    pub become_user: String,
    /// Accepted for compatibility; not forwarded to the engine.
    pub become_password: String,
    /// Dump generated artifacts (secrets redacted).
    pub debug: bool,
    /// Engine executable.
    pub ansible_bin: PathBuf,
    pub strategy: Strategy,
    /// Agent executables used by [`Strategy::Direct`]; the wrapper script always calls them from `PATH`.
    pub ssh_agent_bin: PathBuf,
    pub ssh_add_bin: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inventory_path: DEFAULT_INVENTORY_PATH.to_string(),
            inventories: vec![DEFAULT_INVENTORY.to_string()],
            playbook: DEFAULT_PLAYBOOK.to_string(),
            ssh_user: String::new(),
            ssh_key: String::new(),
            ssh_passphrase: String::new(),
            become_user: String::new(),
            become_password: String::new(),
            debug: false,
            ansible_bin: PathBuf::from(DEFAULT_ANSIBLE_BIN),
            strategy: Strategy::default(),
            ssh_agent_bin: PathBuf::from(DEFAULT_SSH_AGENT_BIN),
            ssh_add_bin: PathBuf::from(DEFAULT_SSH_ADD_BIN),
        }
    }
}

// Secrets are replaced so `{:?}` is safe to log.
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("inventory_path", &self.inventory_path)
            .field("inventories", &self.inventories)
            .field("playbook", &self.playbook)
            .field("ssh_user", &self.ssh_user)
            .field("ssh_key", &redacted(&self.ssh_key))
            .field("ssh_passphrase", &redacted(&self.ssh_passphrase))
            .field("become_user", &self.become_user)
            .field("become_password", &redacted(&self.become_password))
            .field("debug", &self.debug)
            .field("ansible_bin", &self.ansible_bin)
            .field("strategy", &self.strategy)
            .field("ssh_agent_bin", &self.ssh_agent_bin)
            .field("ssh_add_bin", &self.ssh_add_bin)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<hidden>"
    }
}

impl RunConfig {
    pub fn has_ssh_key(&self) -> bool {
        !self.ssh_key.is_empty()
    }

    pub fn has_passphrase(&self) -> bool {
        !self.ssh_passphrase.is_empty()
    }

    pub fn has_ssh_user(&self) -> bool {
        !self.ssh_user.is_empty()
    }
}

/// Values given on the command line. `None` defers to the environment, then the default.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub path: Option<PathBuf>,
    pub commit_sha: Option<String>,
    pub commit_tag: Option<String>,
    pub inventory_path: Option<String>,
    pub inventories: Vec<String>,
    pub playbook: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_key: Option<String>,
    pub ssh_passphrase: Option<String>,
    pub become_user: Option<String>,
    pub become_password: Option<String>,
    pub debug: bool,
    pub ansible_bin: Option<PathBuf>,
    pub strategy: Option<Strategy>,
}

impl BuildMetadata {
    /// Priority: CLI > `DRONE_*` environment > current directory / empty.
    pub fn from_env_or_cli(cli: &RunOverrides) -> Self {
        let path = cli
            .path
            .clone()
            .or_else(|| env_optional(build_keys::WORKSPACE, &[]).map(PathBuf::from))
            .unwrap_or_else(|| {
                tracing::warn!(
                    "{} not set and --path not given, using current directory",
                    build_keys::WORKSPACE
                );
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            });
        Self {
            path,
            sha: pick(&cli.commit_sha, build_keys::COMMIT_SHA, &[]),
            tag: pick(&cli.commit_tag, build_keys::TAG, &[]),
        }
    }
}

impl RunConfig {
    /// Priority: CLI > environment alias chain > default.
    pub fn from_env_or_cli(cli: &RunOverrides) -> Result<Self, ParseStrategyError> {
        let defaults = Self::default();

        let inventories = if !cli.inventories.is_empty() {
            cli.inventories
                .iter()
                .flat_map(|s| crate::config::split_list(s))
                .collect()
        } else {
            env_list(run_keys::INVENTORIES, run_keys::INVENTORIES_ALIASES).unwrap_or_default()
        };
        let inventories = if inventories.is_empty() {
            defaults.inventories
        } else {
            inventories
        };

        let strategy = match cli.strategy {
            Some(s) => s,
            None => match env_optional(run_keys::STRATEGY, &[]) {
                Some(s) => s.parse()?,
                None => Strategy::default(),
            },
        };

        Ok(Self {
            inventory_path: cli
                .inventory_path
                .clone()
                .or_else(|| env_optional(run_keys::INVENTORY_PATH, &[]))
                .unwrap_or(defaults.inventory_path),
            inventories,
            playbook: cli
                .playbook
                .clone()
                .or_else(|| env_optional(run_keys::PLAYBOOK, &[]))
                .unwrap_or(defaults.playbook),
            ssh_user: pick(&cli.ssh_user, run_keys::SSH_USER, run_keys::SSH_USER_ALIASES),
            ssh_key: cli
                .ssh_key
                .clone()
                .or_else(|| env_verbatim(run_keys::SSH_KEY, run_keys::SSH_KEY_ALIASES))
                .unwrap_or_default(),
            ssh_passphrase: cli
                .ssh_passphrase
                .clone()
                .or_else(|| {
                    env_verbatim(run_keys::SSH_PASSPHRASE, run_keys::SSH_PASSPHRASE_ALIASES)
                })
                .unwrap_or_default(),
            become_user: pick(
                &cli.become_user,
                run_keys::BECOME_USER,
                run_keys::BECOME_USER_ALIASES,
            ),
            become_password: cli
                .become_password
                .clone()
                .or_else(|| {
                    env_verbatim(run_keys::BECOME_PASSWORD, run_keys::BECOME_PASSWORD_ALIASES)
                })
                .unwrap_or_default(),
            debug: cli.debug || env_bool(run_keys::DEBUG, &[], false),
            ansible_bin: cli
                .ansible_bin
                .clone()
                .or_else(|| env_optional(run_keys::ANSIBLE_BIN, &[]).map(PathBuf::from))
                .unwrap_or(defaults.ansible_bin),
            strategy,
            ssh_agent_bin: env_optional(run_keys::SSH_AGENT_BIN, &[])
                .map(PathBuf::from)
                .unwrap_or(defaults.ssh_agent_bin),
            ssh_add_bin: env_optional(run_keys::SSH_ADD_BIN, &[])
                .map(PathBuf::from)
                .unwrap_or(defaults.ssh_add_bin),
        })
    }
}

fn pick(cli: &Option<String>, primary: &str, aliases: &[&str]) -> String {
    cli.clone()
        .or_else(|| env_optional(primary, aliases))
        .unwrap_or_default()
}
