//! Error types for sandbox construction and command execution.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures while building or removing the per-run sandbox directory.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create temp dir: {source}")]
    Creation {
        #[source]
        source: io::Error,
    },

    #[error("failed to generate {artifact}: {source}")]
    Write {
        artifact: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete temp dir {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Terminal result of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("failed to execute command `{command}`: {status}")]
    Command { command: String, status: ExitStatus },

    #[error("failed to execute command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("ssh-agent {step} failed: {detail}")]
    Agent { step: &'static str, detail: String },
}

impl RunError {
    /// Exit code of the failed child, when there is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Command { status, .. } => status.code(),
            _ => None,
        }
    }
}
