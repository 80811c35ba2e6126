//! Transport-neutral interface to one remote batch-scheduler instance.
//!
//! A [`RemoteAdapter`] never raises to its caller: every method returns a
//! safe sentinel (`(false, String::new())`, an empty `Vec`, `None`) on
//! failure, logging at the level fixed by the error taxonomy. This
//! mirrors the original `Remote`/`SlurmRemote` split
//! (`examples/original_source/script/python/tools/auto_submitter/remote.py`)
//! generalized behind an async trait so new batch systems can be added
//! without touching the Gateway.

pub mod factory;
pub mod runner;
pub mod slurm;

use async_trait::async_trait;

use crate::job::JobStat;

/// Default timeout applied to every remote command, per
/// `SPEC_FULL.md` §4.1.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A transport-neutral proxy to one remote scheduler instance.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// Immutable batch-system name this adapter was created for
    /// (e.g. `"slurm"`).
    fn batch_system(&self) -> &str;

    /// Run a raw remote command, prefixed by this adapter's transport
    /// tokens. Returns `(false, "")` on timeout or non-zero exit,
    /// otherwise `(true, trimmed_stdout)`.
    async fn run_command(&self, cmd: &str) -> (bool, String);

    /// Query the remote queue for `user`'s jobs.
    async fn job_status(&self, user: &str) -> Vec<JobStat>;

    /// Current time on the remote host, or `None` if it could not be
    /// determined (unreachable, or unparseable `date` output).
    async fn current_time(&self) -> Option<chrono::DateTime<chrono::Utc>>;

    /// Trailing `n` lines of `work_dir`'s well-known stdout file for
    /// `job_id`.
    async fn tail_log(&self, job_id: &str, work_dir: &str, n: usize) -> Vec<String>;

    /// Copy `local_file` into `remote_dir` and submit it. Returns the
    /// raw submission output (empty string on failure at either step).
    async fn copy_and_submit(&self, local_file: &str, remote_dir: &str) -> String;

    /// Best-effort cancellation of `job_id`.
    async fn cancel_job(&self, job_id: &str);
}

/// Extract the `squeue`-style "slow node" projected completion time
/// from a log tail, per `SPEC_FULL.md` §4.1: the line whose first
/// whitespace token is `imb`, the rest (tokens `[7..]`) forming a
/// `"%a %b %d %H:%M:%S %Y"` timestamp.
pub fn parse_projected_completion(
    log_lines: &[String],
) -> Option<chrono::NaiveDateTime> {
    for line in log_lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().copied() != Some("imb") {
            continue;
        }
        if tokens.len() < 8 {
            continue;
        }
        let ts = tokens[7..].join(" ");
        if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(&ts, "%a %b %d %H:%M:%S %Y") {
            return Some(parsed);
        }
    }
    None
}
