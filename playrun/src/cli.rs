use clap::Parser;
use playrun_core::{RunOverrides, Strategy};
use std::path::PathBuf;

/// playrun - run ansible-playbook against CI inventories in a private sandbox
///
/// Every flag falls back to its environment variable, then to its default.
#[derive(Parser, Debug)]
#[command(name = "playrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder holding the inventory files, relative to --path [env: PLUGIN_INVENTORY_PATH] [default: provisioning/inventory]
    #[arg(long, value_name = "DIR")]
    pub inventory_path: Option<String>,

    /// Inventory file names, run in order; repeat or comma-separate [env: PLUGIN_INVENTORY, PLUGIN_INVENTORIES] [default: staging]
    #[arg(long = "inventories", visible_alias = "inventory", value_name = "NAME", value_delimiter = ',')]
    pub inventories: Vec<String>,

    /// Playbook to execute, relative to --path [env: PLUGIN_PLAYBOOK] [default: provisioning/provision.yml]
    #[arg(long, value_name = "FILE")]
    pub playbook: Option<String>,

    /// SSH user for remote hosts [env: SSH_USER, PLUGIN_SSH_USER]
    #[arg(long, value_name = "USER")]
    pub ssh_user: Option<String>,

    /// SSH private key for remote hosts [env: SSH_KEY, PLUGIN_SSH_KEY]
    #[arg(long, value_name = "KEY")]
    pub ssh_key: Option<String>,

    /// Passphrase for the private key [env: SSH_PASSPHRASE, PLUGIN_SSH_PASSPHRASE]
    #[arg(long, value_name = "PASSPHRASE")]
    pub ssh_passphrase: Option<String>,

    /// Become (sudo) user; accepted but not passed to ansible [env: BECOME_USER, SUDO_USER, ...]
    #[arg(long, value_name = "USER")]
    pub become_user: Option<String>,

    /// Become (sudo) password; accepted but not passed to ansible [env: BECOME_PASSWORD, SUDO_PASSWORD, ...]
    #[arg(long, value_name = "PASSWORD")]
    pub become_password: Option<String>,

    /// Dump generated sandbox files (secrets hidden) [env: PLUGIN_DEBUG]
    #[arg(long)]
    pub debug: bool,

    /// Project base path [env: DRONE_WORKSPACE]
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Git commit sha [env: DRONE_COMMIT_SHA]
    #[arg(long = "commit-sha", visible_alias = "commit.sha", value_name = "SHA")]
    pub commit_sha: Option<String>,

    /// Git tag [env: DRONE_TAG]
    #[arg(long = "commit-tag", visible_alias = "commit.tag", value_name = "TAG")]
    pub commit_tag: Option<String>,

    /// ansible-playbook executable [env: PLAYRUN_ANSIBLE_BIN] [default: /usr/bin/ansible-playbook]
    #[arg(long, value_name = "PATH")]
    pub ansible_bin: Option<PathBuf>,

    /// script: generated wrapper script per inventory; direct: in-process ssh-agent [env: PLAYRUN_STRATEGY] [default: script]
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,
}

impl Cli {
    pub fn into_overrides(self) -> RunOverrides {
        RunOverrides {
            path: self.path,
            commit_sha: self.commit_sha,
            commit_tag: self.commit_tag,
            inventory_path: self.inventory_path,
            inventories: self.inventories,
            playbook: self.playbook,
            ssh_user: self.ssh_user,
            ssh_key: self.ssh_key,
            ssh_passphrase: self.ssh_passphrase,
            become_user: self.become_user,
            become_password: self.become_password,
            debug: self.debug,
            ansible_bin: self.ansible_bin,
            strategy: self.strategy,
        }
    }
}
