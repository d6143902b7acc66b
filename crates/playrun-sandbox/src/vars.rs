//! Run-scoped extra variables passed to every engine invocation with `-e`.

use playrun_core::BuildMetadata;
use serde::Serialize;
use std::path::Path;

/// Keys are emitted only when their source value is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtraVars {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_private_key_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_tag: Option<String>,
}

impl ExtraVars {
    /// `private_key` is the generated key file, `None` when no key was configured.
    pub fn new(build: &BuildMetadata, private_key: Option<&Path>) -> Self {
        Self {
            ansible_ssh_private_key_file: private_key.map(|p| p.display().to_string()),
            commit_sha: non_empty(&build.sha),
            commit_tag: non_empty(&build.tag),
        }
    }

    /// Compact single-line JSON, suitable as one command-line argument.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("extra vars hold only strings")
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
