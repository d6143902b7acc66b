//! Per-run sandbox: a private temp directory holding the generated ssh/ansible
//! config, optional key material, and the wrapper script.
//!
//! The directory is removed exactly once: by [`Sandbox::tear_down`] on the
//! normal path, or by `Drop` on every other exit.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use playrun_core::config::SandboxSettings;
use playrun_core::{BuildMetadata, RunConfig};
use tempfile::TempDir;

use crate::error::SandboxError;
use crate::script::ScriptBuilder;

const TEMP_PREFIX: &str = "playrun-";
const SSH_CONFIG: &str = "StrictHostKeyChecking no\nUserKnownHostsFile=/dev/null\n";
const ASKPASS: &str = "#!/bin/sh\nexec cat\n";
const HIDDEN: &str = "<hidden>";

/// Files generated into the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    SshConfig,
    AnsibleCfg,
    PrivateKey,
    AskPass,
    Script,
}

/// Artifacts whose content is secret. Debug dumps print a placeholder for these.
pub const REDACTED_ARTIFACTS: &[Artifact] = &[Artifact::PrivateKey, Artifact::AskPass];

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::SshConfig => "ssh_config",
            Self::AnsibleCfg => "ansible.cfg",
            Self::PrivateKey => "id_rsa",
            Self::AskPass => "askpass.sh",
            Self::Script => "script.sh",
        }
    }

    /// Unix permission bits
    pub fn mode(&self) -> u32 {
        match self {
            Self::AskPass | Self::Script => 0o700,
            Self::SshConfig | Self::AnsibleCfg | Self::PrivateKey => 0o600,
        }
    }

    pub fn is_redacted(&self) -> bool {
        REDACTED_ARTIFACTS.contains(self)
    }
}

/// Paths of the generated artifacts.
#[derive(Debug, Clone)]
pub struct SandboxFiles {
    pub ssh_config: PathBuf,
    pub ansible_cfg: PathBuf,
    /// Present iff an ssh key was configured.
    pub private_key: Option<PathBuf>,
    /// Present iff both an ssh key and a passphrase were configured.
    pub askpass: Option<PathBuf>,
    pub script: PathBuf,
}

#[derive(Debug)]
pub struct Sandbox {
    dir: Option<TempDir>,
    root: PathBuf,
    files: SandboxFiles,
}

impl Sandbox {
    /// Create the directory and write every artifact.
    ///
    /// When `config.debug` is set, each artifact is echoed to `dump`.
    /// On a write failure the partial directory is removed before returning.
    pub fn set_up(
        build: &BuildMetadata,
        config: &RunConfig,
        settings: &SandboxSettings,
        dump: &mut dyn Write,
    ) -> Result<Self, SandboxError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let dir = match &settings.tmp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|source| SandboxError::Creation { source })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700))
                .map_err(|source| SandboxError::Creation { source })?;
        }
        Self::populate(dir, build, config, dump)
    }

    /// Write every artifact into `dir`, which is removed again if any write fails.
    fn populate(
        dir: TempDir,
        build: &BuildMetadata,
        config: &RunConfig,
        dump: &mut dyn Write,
    ) -> Result<Self, SandboxError> {
        let mut writer = ArtifactWriter {
            root: dir.path(),
            debug: config.debug,
            dump,
        };
        match writer.write_all(build, config) {
            Ok(files) => {
                let root = dir.path().to_path_buf();
                tracing::debug!(root = %root.display(), "sandbox ready");
                Ok(Self {
                    dir: Some(dir),
                    root,
                    files,
                })
            }
            Err(err) => {
                let path = dir.path().to_path_buf();
                if let Err(cleanup) = dir.close() {
                    tracing::warn!(
                        path = %path.display(),
                        error = %cleanup,
                        "failed to remove partial sandbox"
                    );
                }
                Err(err)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &SandboxFiles {
        &self.files
    }

    /// Remove the sandbox directory tree.
    pub fn tear_down(mut self) -> Result<(), SandboxError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|source| SandboxError::Cleanup {
                path: self.root.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(path = %self.root.display(), error = %e, "failed to delete temp dir");
            }
        }
    }
}

struct ArtifactWriter<'a> {
    root: &'a Path,
    debug: bool,
    dump: &'a mut dyn Write,
}

impl ArtifactWriter<'_> {
    fn write_all(
        &mut self,
        build: &BuildMetadata,
        config: &RunConfig,
    ) -> Result<SandboxFiles, SandboxError> {
        let ssh_config = self.write(Artifact::SshConfig, SSH_CONFIG)?;

        // Host key checking is off: CI targets are ephemeral and have no known_hosts.
        let ansible_cfg = self.write(
            Artifact::AnsibleCfg,
            &format!(
                "[defaults]\nhost_key_checking = False\n[ssh_connection]\nssh_args = -F \"{}\"\n",
                ssh_config.display()
            ),
        )?;

        let private_key = if config.has_ssh_key() {
            Some(self.write(Artifact::PrivateKey, &config.ssh_key)?)
        } else {
            None
        };
        let askpass = if config.has_ssh_key() && config.has_passphrase() {
            Some(self.write(Artifact::AskPass, ASKPASS)?)
        } else {
            None
        };

        let script = ScriptBuilder::new(config, &build.path)
            .private_key(private_key.as_deref())
            .askpass(askpass.as_deref())
            .build();
        let script = self.write(Artifact::Script, &script)?;

        Ok(SandboxFiles {
            ssh_config,
            ansible_cfg,
            private_key,
            askpass,
            script,
        })
    }

    fn write(&mut self, artifact: Artifact, content: &str) -> Result<PathBuf, SandboxError> {
        let name = artifact.file_name();
        let path = self.root.join(name);
        if self.debug {
            let shown = if artifact.is_redacted() { HIDDEN } else { content };
            if let Err(e) = dump_with_quote(self.dump, name, shown) {
                tracing::warn!(artifact = name, error = %e, "debug dump failed");
            }
        }
        write_with_mode(&path, content, artifact.mode())
            .map_err(|source| SandboxError::Write {
                artifact: name,
                source,
            })?;
        Ok(path)
    }
}

fn write_with_mode(path: &Path, content: &str, mode: u32) -> io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(mode);
    }
    let mut file = opts.open(path)?;
    file.write_all(content.as_bytes())?;
    drop(file);

    // umask may have masked bits off at create time.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

fn dump_with_quote(out: &mut dyn Write, name: &str, content: &str) -> io::Result<()> {
    writeln!(out, "[{}]", name)?;
    for line in content.lines() {
        writeln!(out, "> {}", line)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tmp: &TempDir) -> SandboxSettings {
        SandboxSettings {
            tmp_dir: Some(tmp.path().to_path_buf()),
        }
    }

    fn keyed_config() -> RunConfig {
        RunConfig {
            ssh_key: "-----BEGIN KEY-----\nsecret-material\n-----END KEY-----\n".into(),
            ssh_passphrase: "passphrase".into(),
            ..Default::default()
        }
    }

    fn set_up(config: &RunConfig, tmp: &TempDir) -> Sandbox {
        Sandbox::set_up(&BuildMetadata::default(), config, &settings(tmp), &mut io::sink())
            .unwrap()
    }

    #[test]
    fn test_set_up_writes_all_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = set_up(&keyed_config(), &tmp);
        let files = sandbox.files();

        assert!(files.ssh_config.is_file());
        assert!(files.ansible_cfg.is_file());
        assert!(files.script.is_file());
        let key = files.private_key.as_ref().unwrap();
        assert_eq!(
            fs::read_to_string(key).unwrap(),
            "-----BEGIN KEY-----\nsecret-material\n-----END KEY-----\n"
        );
        assert!(files.askpass.as_ref().unwrap().is_file());
        assert!(sandbox.root().starts_with(tmp.path()));
        assert!(sandbox
            .root()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("playrun-"));

        let cfg = fs::read_to_string(&files.ansible_cfg).unwrap();
        assert!(cfg.contains("host_key_checking = False"));
        assert!(cfg.contains(&format!("ssh_args = -F \"{}\"", files.ssh_config.display())));
        sandbox.tear_down().unwrap();
    }

    #[test]
    fn test_set_up_without_key_skips_key_and_askpass() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig {
            ssh_passphrase: "passphrase".into(),
            ..Default::default()
        };
        let sandbox = set_up(&config, &tmp);
        assert!(sandbox.files().private_key.is_none());
        assert!(sandbox.files().askpass.is_none());
        assert!(!sandbox.root().join("id_rsa").exists());
        assert!(!sandbox.root().join("askpass.sh").exists());
    }

    #[test]
    fn test_key_without_passphrase_skips_askpass() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig {
            ssh_key: "key".into(),
            ..Default::default()
        };
        let sandbox = set_up(&config, &tmp);
        assert!(sandbox.files().private_key.is_some());
        assert!(sandbox.files().askpass.is_none());
    }

    #[test]
    fn test_script_on_disk_references_sandbox_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig {
            ssh_user: "user1".into(),
            playbook: "playbook.yml".into(),
            ..keyed_config()
        };
        let build = BuildMetadata {
            path: PathBuf::from("path"),
            ..Default::default()
        };
        let sandbox =
            Sandbox::set_up(&build, &config, &settings(&tmp), &mut io::sink()).unwrap();
        let script = fs::read_to_string(&sandbox.files().script).unwrap();
        let root = sandbox.root().display().to_string();
        assert_eq!(
            script.replace(&root, "tmp"),
            "#!/bin/sh -u\n\
             eval $(ssh-agent) > /dev/null || exit $?\n\
             echo \"$SSH_PASSPHRASE\" | SSH_ASKPASS=\"tmp/askpass.sh\" ssh-add \"tmp/id_rsa\" > /dev/null 2>&1 || exit $?\n\
             /usr/bin/ansible-playbook -e \"$1\" -u \"user1\" -i \"$2\" \"path/playbook.yml\" \n\
             status=$?\n\
             ssh-agent -k > /dev/null || exit $?\n\
             exit $status\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = set_up(&keyed_config(), &tmp);
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        let files = sandbox.files();
        assert_eq!(mode(files.private_key.as_ref().unwrap()), 0o600);
        assert_eq!(mode(&files.ssh_config), 0o600);
        assert_eq!(mode(&files.ansible_cfg), 0o600);
        assert_eq!(mode(files.askpass.as_ref().unwrap()), 0o700);
        assert_eq!(mode(&files.script), 0o700);
        assert_eq!(mode(sandbox.root()), 0o700);
    }

    #[test]
    fn test_tear_down_removes_root_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        for _ in 0..2 {
            let sandbox = set_up(&keyed_config(), &tmp);
            let root = sandbox.root().to_path_buf();
            let cfg = sandbox.files().ansible_cfg.clone();
            assert!(root.exists());
            sandbox.tear_down().unwrap();
            assert!(!root.exists());
            assert!(!cfg.exists());
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = {
            let sandbox = set_up(&keyed_config(), &tmp);
            sandbox.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_tear_down_reports_cleanup_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = set_up(&RunConfig::default(), &tmp);
        fs::remove_dir_all(sandbox.root()).unwrap();
        let err = sandbox.tear_down().unwrap_err();
        assert!(matches!(err, SandboxError::Cleanup { .. }));
        assert!(err.to_string().starts_with("failed to delete temp dir"));
    }

    #[test]
    fn test_creation_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = SandboxSettings {
            tmp_dir: Some(tmp.path().join("does-not-exist")),
        };
        let err = Sandbox::set_up(
            &BuildMetadata::default(),
            &RunConfig::default(),
            &missing,
            &mut io::sink(),
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::Creation { .. }));
    }

    #[test]
    fn test_write_failure_names_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("gone");
        let mut sink = io::sink();
        let mut writer = ArtifactWriter {
            root: &gone,
            debug: false,
            dump: &mut sink,
        };
        let err = writer
            .write_all(&BuildMetadata::default(), &RunConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Write {
                artifact: "ssh_config",
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to generate ssh_config"));
    }

    #[test]
    fn test_write_failure_removes_partial_sandbox() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(tmp.path())
            .unwrap();
        // create_new refuses to overwrite, so the last artifact fails
        fs::write(dir.path().join("script.sh"), "").unwrap();

        let err = Sandbox::populate(
            dir,
            &BuildMetadata::default(),
            &keyed_config(),
            &mut io::sink(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Write {
                artifact: "script.sh",
                ..
            }
        ));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_debug_dump_redacts_secrets() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig {
            debug: true,
            ..keyed_config()
        };
        let mut out = Vec::new();
        let sandbox =
            Sandbox::set_up(&BuildMetadata::default(), &config, &settings(&tmp), &mut out)
                .unwrap();
        let dump = String::from_utf8(out).unwrap();

        assert!(dump.contains("[ssh_config]\n> StrictHostKeyChecking no\n"));
        assert!(dump.contains("[ansible.cfg]\n> [defaults]\n"));
        assert!(dump.contains("[id_rsa]\n> <hidden>\n"));
        assert!(dump.contains("[askpass.sh]\n> <hidden>\n"));
        assert!(dump.contains("[script.sh]\n> #!/bin/sh -u\n"));
        assert!(!dump.contains("secret-material"));
        assert!(!dump.contains("exec cat"));
        assert!(!dump.contains("passphrase\n"));
        sandbox.tear_down().unwrap();
    }

    #[test]
    fn test_no_dump_without_debug() {
        let tmp = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let _sandbox = Sandbox::set_up(
            &BuildMetadata::default(),
            &keyed_config(),
            &settings(&tmp),
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_redaction_allow_list() {
        assert!(Artifact::PrivateKey.is_redacted());
        assert!(Artifact::AskPass.is_redacted());
        assert!(!Artifact::Script.is_redacted());
        assert!(!Artifact::SshConfig.is_redacted());
        assert!(!Artifact::AnsibleCfg.is_redacted());
    }
}
