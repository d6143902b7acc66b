//! In-process ssh-agent lifecycle for [`Strategy::Direct`](playrun_core::Strategy).
//!
//! Mirrors what the wrapper script does in shell: start one agent, add the
//! sandbox key (feeding the passphrase through the askpass helper), hand the
//! agent socket to each engine invocation, kill the agent at the end.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use playrun_core::config::env_keys::child;

use crate::error::RunError;

/// A running ssh-agent. Killed on [`SshAgent::stop`] or drop.
#[derive(Debug)]
pub struct SshAgent {
    agent_bin: PathBuf,
    auth_sock: String,
    pid: String,
    stopped: bool,
}

impl SshAgent {
    /// Run `<agent_bin> -s` and capture the socket and pid it exports.
    pub fn start(agent_bin: &Path) -> Result<Self, RunError> {
        let output = Command::new(agent_bin)
            .arg("-s")
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| RunError::Agent {
                step: "start",
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(RunError::Agent {
                step: "start",
                detail: output.status.to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let (auth_sock, pid) = parse_agent_output(&stdout).ok_or_else(|| RunError::Agent {
            step: "start",
            detail: "could not read SSH_AUTH_SOCK / SSH_AGENT_PID from ssh-agent output".into(),
        })?;
        tracing::debug!(pid = %pid, "ssh-agent started");
        Ok(Self {
            agent_bin: agent_bin.to_path_buf(),
            auth_sock,
            pid,
            stopped: false,
        })
    }

    /// Load `key` into the agent. The passphrase is written to ssh-add's stdin,
    /// where the askpass helper (if any) echoes it back.
    pub fn add_key(
        &self,
        add_bin: &Path,
        key: &Path,
        askpass: Option<&Path>,
        passphrase: &str,
    ) -> Result<(), RunError> {
        let askpass = askpass
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let mut cmd = Command::new(add_bin);
        cmd.arg(key)
            .envs(self.env())
            .env(child::SSH_ASKPASS, askpass)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let agent_err = |detail: String| RunError::Agent {
            step: "add",
            detail,
        };
        let mut proc = cmd.spawn().map_err(|e| agent_err(e.to_string()))?;
        if let Some(mut stdin) = proc.stdin.take() {
            // ssh-add may exit before reading; a broken pipe here is not the failure to report.
            let _ = writeln!(stdin, "{}", passphrase);
        }
        let status = proc.wait().map_err(|e| agent_err(e.to_string()))?;
        if !status.success() {
            return Err(agent_err(status.to_string()));
        }
        Ok(())
    }

    /// Variables that point a child process at this agent.
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            (child::SSH_AUTH_SOCK.to_string(), self.auth_sock.clone()),
            (child::SSH_AGENT_PID.to_string(), self.pid.clone()),
        ]
    }

    pub fn stop(mut self) -> Result<(), RunError> {
        self.stopped = true;
        self.kill()
    }

    fn kill(&self) -> Result<(), RunError> {
        let status = Command::new(&self.agent_bin)
            .arg("-k")
            .envs(self.env())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|e| RunError::Agent {
                step: "stop",
                detail: e.to_string(),
            })?;
        if !status.success() {
            return Err(RunError::Agent {
                step: "stop",
                detail: status.to_string(),
            });
        }
        tracing::debug!(pid = %self.pid, "ssh-agent stopped");
        Ok(())
    }
}

impl Drop for SshAgent {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.kill() {
                tracing::warn!(error = %e, "failed to stop ssh-agent");
            }
        }
    }
}

/// Parse `ssh-agent -s` output:
///
/// ```text
/// SSH_AUTH_SOCK=/tmp/ssh-abc/agent.41; export SSH_AUTH_SOCK;
/// SSH_AGENT_PID=42; export SSH_AGENT_PID;
/// echo Agent pid 42;
/// ```
fn parse_agent_output(stdout: &str) -> Option<(String, String)> {
    let mut sock = None;
    let mut pid = None;
    for line in stdout.lines() {
        let assignment = line.split(';').next().unwrap_or("").trim();
        match assignment.split_once('=') {
            Some((k, v)) if k == child::SSH_AUTH_SOCK => sock = Some(v.to_string()),
            Some((k, v)) if k == child::SSH_AGENT_PID => pid = Some(v.to_string()),
            _ => {}
        }
    }
    Some((sock?, pid?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fake `ssh-agent` and `ssh-add` that record their calls in `agent.log` under `dir`.
    #[cfg(unix)]
    fn fake_agent(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;
        let log = dir.join("agent.log");
        let agent = dir.join("ssh-agent");
        let add = dir.join("ssh-add");
        fs::write(
            &agent,
            format!(
                "#!/bin/sh\n\
                 case \"$1\" in\n\
                 -s)\n\
                 echo start >> \"{log}\"\n\
                 echo \"SSH_AUTH_SOCK=/tmp/agent.sock; export SSH_AUTH_SOCK;\"\n\
                 echo \"SSH_AGENT_PID=4242; export SSH_AGENT_PID;\"\n\
                 echo \"echo Agent pid 4242;\" ;;\n\
                 -k) echo \"kill $SSH_AGENT_PID\" >> \"{log}\" ;;\n\
                 esac\n",
                log = log.display()
            ),
        )
        .unwrap();
        fs::write(
            &add,
            format!(
                "#!/bin/sh\nread pass\necho \"add $1 $pass $SSH_AUTH_SOCK\" >> \"{}\"\n",
                log.display()
            ),
        )
        .unwrap();
        for p in [&agent, &add] {
            fs::set_permissions(p, fs::Permissions::from_mode(0o755)).unwrap();
        }
        (agent, add, log)
    }

    #[cfg(unix)]
    fn logged(log: &Path) -> Vec<String> {
        fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_agent_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent_bin, add_bin, log) = fake_agent(tmp.path());
        let key = tmp.path().join("id_rsa");

        let agent = SshAgent::start(&agent_bin).unwrap();
        assert_eq!(agent.env()[0].1, "/tmp/agent.sock");
        agent.add_key(&add_bin, &key, None, "secret").unwrap();
        agent.stop().unwrap();

        assert_eq!(
            logged(&log),
            vec![
                "start".to_string(),
                format!("add {} secret /tmp/agent.sock", key.display()),
                "kill 4242".to_string(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_kills_agent() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent_bin, _, log) = fake_agent(tmp.path());
        drop(SshAgent::start(&agent_bin).unwrap());
        assert_eq!(logged(&log), vec!["start", "kill 4242"]);
    }

    #[test]
    fn test_start_failure_is_agent_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SshAgent::start(&tmp.path().join("missing-agent")).unwrap_err();
        assert!(matches!(err, RunError::Agent { step: "start", .. }));
    }

    #[test]
    fn test_parse_agent_output() {
        let out = "SSH_AUTH_SOCK=/tmp/ssh-XXXXabc/agent.41; export SSH_AUTH_SOCK;\n\
                   SSH_AGENT_PID=42; export SSH_AGENT_PID;\n\
                   echo Agent pid 42;\n";
        assert_eq!(
            parse_agent_output(out),
            Some(("/tmp/ssh-XXXXabc/agent.41".to_string(), "42".to_string()))
        );
    }

    #[test]
    fn test_parse_agent_output_incomplete() {
        assert_eq!(parse_agent_output("echo Agent pid 42;\n"), None);
        assert_eq!(
            parse_agent_output("SSH_AGENT_PID=42; export SSH_AGENT_PID;\n"),
            None
        );
    }

    #[test]
    fn test_env_points_at_agent() {
        let agent = SshAgent {
            agent_bin: PathBuf::from("ssh-agent"),
            auth_sock: "/tmp/sock".into(),
            pid: "7".into(),
            // never run ssh-agent -k from a unit test
            stopped: true,
        };
        assert_eq!(
            agent.env(),
            vec![
                ("SSH_AUTH_SOCK".to_string(), "/tmp/sock".to_string()),
                ("SSH_AGENT_PID".to_string(), "7".to_string()),
            ]
        );
    }
}
