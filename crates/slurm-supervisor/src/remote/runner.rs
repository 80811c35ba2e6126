//! Command execution backends for [`crate::remote::slurm::SlurmAdapter`].
//!
//! Splitting "how a command reaches the remote host" from "what SLURM
//! command to run" mirrors the teacher crate's
//! `get_squeue_res<F, Fut>(mode, execute_cmd)` higher-order-function
//! pattern (`crates/slurry/src/data_extraction/squeue.rs`): the adapter
//! builds command strings, a [`CommandRunner`] is responsible only for
//! getting bytes to and from the remote host.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::SupervisorError;

/// Build the command-prefix tokens for a remote command or copy, per
/// `SPEC_FULL.md` §4.1: `ssh` for commands, `scp` for copies, an
/// optional `-o ControlMaster=no` when the adapter does not share
/// connections, and the server name appended for commands (not for
/// `scp`, whose destination already carries it).
pub fn command_prefix(server: &str, shared: bool, copy: bool) -> Vec<String> {
    let mut prefix = vec![if copy { "scp" } else { "ssh" }.to_string()];
    if !shared {
        prefix.push("-o".to_string());
        prefix.push("ControlMaster=no".to_string());
    }
    if !copy {
        prefix.push(server.to_string());
    }
    prefix
}

/// A backend capable of running a remote command or copying a file to
/// the remote host. Every method is two-valued: `(ok, output)`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` on the remote host, returning `(false, "")` on
    /// timeout or non-zero exit.
    async fn run(&self, cmd: &str) -> (bool, String);

    /// Copy `local_file` to `remote_dest` (a `server:path` style
    /// destination), returning `(false, "")` on failure.
    async fn copy(&self, local_file: &str, remote_dest: &str) -> (bool, String);
}

/// A [`CommandRunner`] that shells out to the `ssh`/`scp` binaries
/// found on `PATH`, using the literal command-prefix construction from
/// `SPEC_FULL.md` §4.1. Used when the `ssh` feature (an actual SSH
/// client library) is unavailable, and in tests that want to exercise
/// the prefix-construction rule without a real network.
pub struct ShellCommandRunner {
    server: String,
    shared: bool,
    timeout: Duration,
}

impl ShellCommandRunner {
    /// Create a runner targeting `server`, sharing connections when
    /// `shared` is true, with the default 60s timeout.
    pub fn new(server: impl Into<String>, shared: bool) -> Self {
        Self {
            server: server.into(),
            shared,
            timeout: Duration::from_secs(super::DEFAULT_TIMEOUT_SECS),
        }
    }

    async fn exec(&self, mut argv: Vec<String>) -> (bool, String) {
        if argv.is_empty() {
            return (false, String::new());
        }
        let program = argv.remove(0);
        let mut cmd = Command::new(program);
        cmd.args(argv);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                let err = SupervisorError::Transport(format!("exec error: {err}"));
                tracing::error!("{err}");
                return (false, String::new());
            }
            Err(_) => {
                let err = SupervisorError::Transport(format!(
                    "timed out after {:?}",
                    self.timeout
                ));
                tracing::info!("{err}");
                return (false, String::new());
            }
        };

        if !output.status.success() {
            let err = SupervisorError::Transport(format!(
                "exited with status {:?}",
                output.status.code()
            ));
            tracing::error!("{err}");
            return (false, String::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        (true, stdout)
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, cmd: &str) -> (bool, String) {
        let mut argv = command_prefix(&self.server, self.shared, false);
        argv.extend(cmd.split_whitespace().map(str::to_string));
        self.exec(argv).await
    }

    async fn copy(&self, local_file: &str, remote_dest: &str) -> (bool, String) {
        let mut argv = command_prefix(&self.server, self.shared, true);
        argv.push(local_file.to_string());
        argv.push(format!("{}:{}", self.server, remote_dest));
        self.exec(argv).await
    }
}

#[cfg(feature = "ssh")]
pub use ssh_backed::SshCommandRunner;

#[cfg(feature = "ssh")]
mod ssh_backed {
    use super::*;
    use async_ssh2_tokio::client::Client;
    use std::path::Path;

    /// A [`CommandRunner`] backed by a persistent
    /// [`async_ssh2_tokio::Client`] connection, the teacher crate's
    /// actual transport. `shared` records whether this adapter was
    /// configured to reuse one session (informational - the client
    /// itself already multiplexes channels over one connection).
    pub struct SshCommandRunner {
        client: Client,
        shared: bool,
        timeout: Duration,
    }

    impl SshCommandRunner {
        /// Wrap an already-authenticated client.
        pub fn new(client: Client, shared: bool) -> Self {
            Self {
                client,
                shared,
                timeout: Duration::from_secs(super::super::DEFAULT_TIMEOUT_SECS),
            }
        }

        /// Whether this runner was configured to share its connection.
        pub fn is_shared(&self) -> bool {
            self.shared
        }

        /// Upload `local_file` to `remote_path` via SFTP, creating the
        /// destination directory first.
        pub async fn upload(&self, local_file: &Path, remote_path: &str) -> (bool, String) {
            if let Some(dir) = Path::new(remote_path).parent() {
                let _ = self
                    .client
                    .execute(&format!("mkdir -p '{}'", dir.display()))
                    .await;
            }
            match timeout(self.timeout, self.client.upload_file(local_file, remote_path)).await {
                Ok(Ok(())) => (true, String::new()),
                Ok(Err(err)) => {
                    let err = SupervisorError::Transport(format!("upload failed: {err}"));
                    tracing::error!("{err}");
                    (false, String::new())
                }
                Err(_) => {
                    let err = SupervisorError::Transport(format!(
                        "upload timed out after {:?}",
                        self.timeout
                    ));
                    tracing::info!("{err}");
                    (false, String::new())
                }
            }
        }
    }

    #[async_trait]
    impl CommandRunner for SshCommandRunner {
        async fn run(&self, cmd: &str) -> (bool, String) {
            match timeout(self.timeout, self.client.execute(cmd)).await {
                Ok(Ok(result)) if result.exit_status == 0 => {
                    (true, result.stdout.trim_end().to_string())
                }
                Ok(Ok(result)) => {
                    let err = SupervisorError::Transport(format!(
                        "exited with status {}",
                        result.exit_status
                    ));
                    tracing::error!("{err}");
                    (false, String::new())
                }
                Ok(Err(err)) => {
                    let err = SupervisorError::Transport(format!("exec error: {err}"));
                    tracing::error!("{err}");
                    (false, String::new())
                }
                Err(_) => {
                    let err = SupervisorError::Transport(format!(
                        "timed out after {:?}",
                        self.timeout
                    ));
                    tracing::info!("{err}");
                    (false, String::new())
                }
            }
        }

        async fn copy(&self, local_file: &str, remote_dest: &str) -> (bool, String) {
            self.upload(Path::new(local_file), remote_dest).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_for_command_not_shared() {
        let tokens = command_prefix("cluster", false, false);
        assert_eq!(
            tokens,
            vec!["ssh", "-o", "ControlMaster=no", "cluster"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn prefix_for_command_shared() {
        let tokens = command_prefix("cluster", true, false);
        assert_eq!(tokens, vec!["ssh".to_string(), "cluster".to_string()]);
    }

    #[test]
    fn prefix_for_copy_never_appends_server() {
        let tokens = command_prefix("cluster", true, true);
        assert_eq!(tokens, vec!["scp".to_string()]);
    }

    #[tokio::test]
    async fn shell_runner_times_out_cleanly() {
        let runner = ShellCommandRunner {
            server: "cluster".to_string(),
            shared: true,
            timeout: Duration::from_millis(1),
        };
        let (ok, out) = runner.exec(vec!["sleep".to_string(), "2".to_string()]).await;
        assert!(!ok);
        assert_eq!(out, "");
    }
}
