//! Supervisor configuration: the constants the source hardcodes as
//! class attributes (`AutoSubmitter.CHECK_EVERY_N`, `GAP_TIME`,
//! `NUM_THREADS`) plus the snapshot path and remote timeout, gathered
//! into one struct so a deployment can tune them without touching code.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for [`crate::supervisor::AutoSubmitter`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How often the poll cycle re-checks remote job status.
    /// `AutoSubmitter.CHECK_EVERY_N` in the source (1800s / 30 minutes).
    pub check_every: Duration,
    /// Extra delay added after a job's projected completion before
    /// resubmitting. `AutoSubmitter.GAP_TIME` in the source (30s).
    pub gap_time: Duration,
    /// Size of the shared worker pool. `AutoSubmitter.NUM_THREADS` in
    /// the source (8).
    pub num_workers: usize,
    /// Where the job table snapshot is written after every
    /// auto-resubmit (`jobs_current.json` in the source).
    pub snapshot_path: PathBuf,
    /// Timeout applied to individual remote commands.
    pub remote_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            check_every: Duration::from_secs(1800),
            gap_time: Duration::from_secs(30),
            num_workers: 8,
            snapshot_path: PathBuf::from("jobs_current.json"),
            remote_timeout: Duration::from_secs(crate::remote::DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_constants() {
        let config = SupervisorConfig::default();
        assert_eq!(config.check_every, Duration::from_secs(1800));
        assert_eq!(config.gap_time, Duration::from_secs(30));
        assert_eq!(config.num_workers, 8);
    }
}
