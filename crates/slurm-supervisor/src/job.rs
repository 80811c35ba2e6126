//! The job table's data model: [`JobRecord`], [`JobStat`] and the small
//! value types that make the supervisor's state machine exact
//! (`JobState`, `JobNote`, `ExpCompletion`).

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// State of a SLURM job, as reported by `squeue`'s short (`%t`) codes.
///
/// Documentation of the well-known codes taken from
/// <https://slurm.schedmd.com/squeue.html#SECTION_JOB-STATE-CODES>.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// `R` - job currently has an allocation.
    Running,
    /// `PD` - job is awaiting resource allocation.
    Pending,
    /// `CG` - job is in the process of completing.
    Completing,
    /// `CD` - job has terminated all processes with exit code zero.
    Completed,
    /// `CA` - job was explicitly cancelled.
    Cancelled,
    /// `F` - job terminated with a non-zero exit code.
    Failed,
    /// `TO` - job terminated upon reaching its time limit.
    Timeout,
    /// `OOM` - job experienced an out-of-memory error.
    OutOfMemory,
    /// `NF` - job terminated due to failure of an allocated node.
    NodeFail,
    /// Any other state code, kept verbatim.
    Other(String),
}

impl JobState {
    /// Parse a `squeue` short state code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "R" => Self::Running,
            "PD" => Self::Pending,
            "CG" => Self::Completing,
            "CD" => Self::Completed,
            "CA" => Self::Cancelled,
            "F" => Self::Failed,
            "TO" => Self::Timeout,
            "OOM" => Self::OutOfMemory,
            "NF" => Self::NodeFail,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this state is the `R` (running) state the poll cycle
    /// treats specially.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One-shot note attached to a cached [`JobStat`]: `"P"` in the source
/// marks a stat that should be returned once more from cache before the
/// next real refresh, then cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobNote {
    /// Pending confirmation; cleared the next time this entry is read.
    Pending,
    /// No note.
    Clear,
}

/// A job's projected completion time relative to "now", or the
/// "unknown, wait forever" sentinel.
///
/// Modelled as an explicit enum rather than `i64::MAX` so that the
/// slow-node comparison (`expCompletion > timeLimit`) can never be
/// accidentally satisfied by integer overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpCompletion {
    /// Known projected completion, in seconds from now (may be negative
    /// if the projection is already in the past).
    Finite(i64),
    /// Unknown / not yet observable; treated as "pending forever".
    Infinite,
}

impl ExpCompletion {
    /// Zero seconds: used when a job is reset to idle.
    pub const ZERO: ExpCompletion = ExpCompletion::Finite(0);

    /// Whether this completion estimate exceeds `limit` seconds,
    /// i.e. whether the slow-node rule should fire. `Infinite` never
    /// exceeds a limit because it means "unknown", not "overdue" - the
    /// poll cycle only fires the slow-node rule for a job it has
    /// actually measured as running past its allotted time.
    pub fn exceeds(&self, limit: Seconds) -> bool {
        match self {
            ExpCompletion::Finite(secs) => *secs > limit.0,
            ExpCompletion::Infinite => false,
        }
    }

    /// Whether this estimate is due within `window` seconds, i.e.
    /// whether an auto-resubmit task should be scheduled now.
    pub fn due_within(&self, window: Seconds) -> bool {
        match self {
            ExpCompletion::Finite(secs) => *secs <= window.0,
            ExpCompletion::Infinite => false,
        }
    }
}

/// A duration in whole seconds, used for `timeLimit`/`CHECK_EVERY_N`
/// style values throughout the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seconds(pub i64);

/// Parse a SLURM-style `HH:MM:SS` duration into seconds.
///
/// Per the supervisor's boundary behaviours: `parse_hms("0:0:0") == 0`;
/// an unparseable string yields [`Seconds::MAX`], the "treat as
/// unreachable" sentinel used by the slow-node comparison.
pub fn parse_hms(s: &str) -> Seconds {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Seconds::MAX;
    }
    let (h, m, sec) = match (
        parts[0].parse::<i64>(),
        parts[1].parse::<i64>(),
        parts[2].parse::<i64>(),
    ) {
        (Ok(h), Ok(m), Ok(sec)) => (h, m, sec),
        _ => return Seconds::MAX,
    };
    Seconds(h * 3600 + m * 60 + sec)
}

impl Seconds {
    /// Sentinel standing in for "could not parse / effectively unbounded".
    pub const MAX: Seconds = Seconds(i64::MAX);
}

/// Metadata and live state for one managed job (one simulation section
/// chain). See `SPEC_FULL.md` §3 for the full invariant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job name, at most 8 characters once accepted.
    pub name: String,
    /// Job type, used to pick a [`crate::specialist::Specialist`]
    /// (e.g. `"Gromacs"`, `"Test"`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Name of the remote cluster this job runs on.
    pub remote: String,
    /// Batch system name for that remote (e.g. `"slurm"`).
    #[serde(default, rename = "batchType")]
    pub batch_type: String,
    /// Remote username.
    #[serde(rename = "userId")]
    pub username: String,
    /// Remote working directory for this job.
    #[serde(rename = "directory")]
    pub work_dir: String,
    /// Wall-time limit, `HH:MM:SS`.
    #[serde(rename = "timeLimit")]
    pub time_limit: String,
    /// Requested node count (`-N`).
    #[serde(rename = "numOfNodes")]
    pub num_nodes: u32,
    /// Requested task count (`--ntasks-per-node`, `-np`).
    #[serde(rename = "numOfProcs")]
    pub num_procs: u32,
    /// Requested threads per task (`--cpus-per-task`, `OMP_NUM_THREADS`).
    #[serde(rename = "numOfThrs")]
    pub num_threads: u32,
    /// SLURM partition, e.g. `"gpu"` or `"standard"`.
    pub partition: String,
    /// Number of GPUs requested, required when `partition == "gpu"`.
    #[serde(default, rename = "numOfGPUs")]
    pub num_gpus: Option<u32>,
    /// Base name for Gromacs section files (required for Gromacs jobs).
    #[serde(default)]
    pub name_base: Option<String>,
    /// Current section number (required for Gromacs jobs).
    #[serde(default)]
    pub section_num: u32,
    /// `.mdp` parameter file (required for Gromacs jobs).
    #[serde(default)]
    pub mdp: Option<String>,
    /// Whether grompp should pull in the previous section's checkpoint.
    #[serde(default)]
    pub continuation: bool,
    /// Whether the next resubmission should skip grompp and resume
    /// from the current section's checkpoint instead.
    #[serde(default)]
    pub makeup: bool,
    /// Remote scheduler job id; empty string before first submission.
    #[serde(default)]
    pub job_id: String,
    /// Projected completion relative to "now", in seconds.
    #[serde(default = "default_exp_completion")]
    pub exp_completion: ExpCompletion,
    /// Sorted, deduplicated set of nodes to exclude on next submission.
    #[serde(default)]
    pub exclusion_list: BTreeSet<String>,
    /// Path of the exclusion-list file, lazily defaulted to
    /// `<name>_exclusion`.
    #[serde(default)]
    pub exclusion_path: Option<PathBuf>,
    /// Optional `.ndx` index base name (`-n <index>.ndx`).
    #[serde(default)]
    pub index: Option<String>,
    /// Path to the Gromacs install providing `GMXRC` (environment step).
    #[serde(default)]
    pub binary_path: Option<String>,
    /// Lookup index into the owning table. Deliberately a field
    /// distinct from `name` - the source's duplicate-name check wrote
    /// the index into `name` itself, corrupting lookups; see
    /// `SPEC_FULL.md` Design Decision D1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
}

fn default_exp_completion() -> ExpCompletion {
    ExpCompletion::ZERO
}

impl JobRecord {
    /// Path of the exclusion file for this job, defaulting to
    /// `<name>_exclusion` the first time it is needed.
    pub fn exclusion_path(&self) -> PathBuf {
        self.exclusion_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_exclusion", self.name)))
    }

    /// Validate the GPU/process invariant from `SPEC_FULL.md` §3:
    /// `numProcs % numGPUs == 0` and `numGPUs <= numProcs` whenever
    /// `partition == "gpu"`.
    pub fn validate_gpu(&self) -> Result<(), String> {
        if self.partition != "gpu" {
            return Ok(());
        }
        let num_gpus = self
            .num_gpus
            .ok_or_else(|| "numOfGPUs is required when partition is gpu".to_string())?;
        if num_gpus == 0 {
            return Err("numOfGPUs must be greater than zero".to_string());
        }
        if num_gpus > self.num_procs {
            return Err("requesting more GPUs than processes".to_string());
        }
        if self.num_procs % num_gpus != 0 {
            return Err("numOfProcs is not evenly divisible by numOfGPUs".to_string());
        }
        Ok(())
    }
}

/// A single row of remote job status, rebuilt on every poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStat {
    /// Job name as reported by the remote scheduler.
    pub name: String,
    /// Remote scheduler job id.
    pub id: String,
    /// Node/machine the job is (or was) executing on.
    pub machine: Option<String>,
    /// Current remote state.
    pub state: JobState,
    /// One-shot cache note (`"P"` in the source).
    #[serde(default = "default_note")]
    pub note: JobNote,
}

fn default_note() -> JobNote {
    JobNote::Clear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hms_zero() {
        assert_eq!(parse_hms("0:0:0"), Seconds(0));
    }

    #[test]
    fn parse_hms_typical() {
        assert_eq!(parse_hms("24:00:00"), Seconds(24 * 3600));
    }

    #[test]
    fn parse_hms_garbage_is_unbounded() {
        assert_eq!(parse_hms("not-a-time"), Seconds::MAX);
    }

    #[test]
    fn exp_completion_exceeds_limit() {
        assert!(ExpCompletion::Finite(3601).exceeds(Seconds(3600)));
        assert!(!ExpCompletion::Finite(3600).exceeds(Seconds(3600)));
        assert!(!ExpCompletion::Infinite.exceeds(Seconds(3600)));
    }

    #[test]
    fn gpu_validation() {
        let mut job = sample_job();
        job.partition = "gpu".to_string();
        job.num_gpus = Some(2);
        job.num_procs = 4;
        assert!(job.validate_gpu().is_ok());

        job.num_gpus = Some(3);
        assert!(job.validate_gpu().is_err());

        job.num_gpus = Some(8);
        assert!(job.validate_gpu().is_err());
    }

    fn sample_job() -> JobRecord {
        JobRecord {
            name: "job1".to_string(),
            job_type: "Gromacs".to_string(),
            remote: "cluster".to_string(),
            batch_type: "slurm".to_string(),
            username: "user".to_string(),
            work_dir: "/work".to_string(),
            time_limit: "24:00:00".to_string(),
            num_nodes: 1,
            num_procs: 4,
            num_threads: 1,
            partition: "standard".to_string(),
            num_gpus: None,
            name_base: Some("sim".to_string()),
            section_num: 0,
            mdp: Some("sim.mdp".to_string()),
            continuation: false,
            makeup: false,
            job_id: String::new(),
            exp_completion: ExpCompletion::ZERO,
            exclusion_list: BTreeSet::new(),
            exclusion_path: None,
            index: None,
            binary_path: Some("/opt/gromacs".to_string()),
            table_index: None,
        }
    }
}
