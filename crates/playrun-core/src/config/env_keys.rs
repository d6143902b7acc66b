//! Environment variable keys and their alias chains.
//!
//! The first key of each pair is read first; aliases are tried in order.
//! Names follow the Drone plugin conventions (`PLUGIN_*`, `DRONE_*`) plus the
//! bare credential names that older pipelines export.

/// Run configuration (inventories, playbook, credentials)
pub mod run {
    pub const INVENTORY_PATH: &str = "PLUGIN_INVENTORY_PATH";

    pub const INVENTORIES: &str = "PLUGIN_INVENTORY";
    pub const INVENTORIES_ALIASES: &[&str] = &["PLUGIN_INVENTORIES"];

    pub const PLAYBOOK: &str = "PLUGIN_PLAYBOOK";

    pub const SSH_USER: &str = "SSH_USER";
    pub const SSH_USER_ALIASES: &[&str] = &["PLUGIN_SSH_USER"];

    pub const SSH_KEY: &str = "SSH_KEY";
    pub const SSH_KEY_ALIASES: &[&str] = &["PLUGIN_SSH_KEY"];

    pub const SSH_PASSPHRASE: &str = "SSH_PASSPHRASE";
    pub const SSH_PASSPHRASE_ALIASES: &[&str] = &["PLUGIN_SSH_PASSPHRASE"];

    pub const BECOME_USER: &str = "BECOME_USER";
    pub const BECOME_USER_ALIASES: &[&str] =
        &["PLUGIN_BECOME_USER", "SUDO_USER", "PLUGIN_SUDO_USER"];

    pub const BECOME_PASSWORD: &str = "BECOME_PASSWORD";
    pub const BECOME_PASSWORD_ALIASES: &[&str] =
        &["PLUGIN_BECOME_PASSWORD", "SUDO_PASSWORD", "PLUGIN_SUDO_PASSWORD"];

    pub const DEBUG: &str = "PLUGIN_DEBUG";

    pub const ANSIBLE_BIN: &str = "PLAYRUN_ANSIBLE_BIN";
    pub const STRATEGY: &str = "PLAYRUN_STRATEGY";

    /// ssh-agent / ssh-add executables for the direct strategy.
    pub const SSH_AGENT_BIN: &str = "PLAYRUN_SSH_AGENT_BIN";
    pub const SSH_ADD_BIN: &str = "PLAYRUN_SSH_ADD_BIN";
}

/// Build metadata injected by the CI runner
pub mod build {
    pub const WORKSPACE: &str = "DRONE_WORKSPACE";
    pub const COMMIT_SHA: &str = "DRONE_COMMIT_SHA";
    pub const TAG: &str = "DRONE_TAG";
}

/// Sandbox placement
pub mod sandbox {
    pub const PLAYRUN_TMP_DIR: &str = "PLAYRUN_TMP_DIR";
}

/// Logging and audit
pub mod observability {
    pub const PLAYRUN_QUIET: &str = "PLAYRUN_QUIET";
    pub const PLAYRUN_LOG_LEVEL: &str = "PLAYRUN_LOG_LEVEL";
    pub const PLAYRUN_LOG_JSON: &str = "PLAYRUN_LOG_JSON";
    pub const PLAYRUN_AUDIT_LOG: &str = "PLAYRUN_AUDIT_LOG";
}

/// Variables the generated wrapper script and the engine read at run time.
/// These are set on child processes, never read from our own environment.
pub mod child {
    pub const SSH_PASSPHRASE: &str = "SSH_PASSPHRASE";
    pub const ANSIBLE_CONFIG: &str = "ANSIBLE_CONFIG";
    pub const SSH_ASKPASS: &str = "SSH_ASKPASS";
    pub const SSH_AUTH_SOCK: &str = "SSH_AUTH_SOCK";
    pub const SSH_AGENT_PID: &str = "SSH_AGENT_PID";
}
