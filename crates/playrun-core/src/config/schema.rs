//! Typed configuration groups loaded from the environment.

use super::env_keys::{observability as obv_keys, sandbox as sandbox_keys};
use super::loader::{env_bool, env_optional, env_or};
use std::path::PathBuf;

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(Self::load)
    }

    fn load() -> Self {
        Self {
            quiet: env_bool(obv_keys::PLAYRUN_QUIET, &[], false),
            log_level: env_or(obv_keys::PLAYRUN_LOG_LEVEL, &[], || "playrun=info".to_string()),
            log_json: env_bool(obv_keys::PLAYRUN_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::PLAYRUN_AUDIT_LOG, &[]),
        }
    }
}

/// Where per-run sandbox directories are created.
#[derive(Debug, Clone, Default)]
pub struct SandboxSettings {
    /// Parent directory for sandboxes; `None` means the system temp dir.
    pub tmp_dir: Option<PathBuf>,
}

impl SandboxSettings {
    pub fn from_env() -> Self {
        Self {
            tmp_dir: env_optional(sandbox_keys::PLAYRUN_TMP_DIR, &[]).map(PathBuf::from),
        }
    }
}
