//! Job specialists: per-job-type delegates the [`crate::manager::JobManager`]
//! hands validated jobs to, per `SPEC_FULL.md` §4.4.
//!
//! Grounded in
//! `examples/original_source/script/python/tools/auto_submitter/specialist.py`.
//! The source's `Specialist` base class carries shared bookkeeping
//! (`_jobs`, `_check_duplicated_name`) alongside two abstract hooks
//! (`_check_job_metadata`, `__add_job_handler`); here the shared
//! bookkeeping lives in [`JobTable`], a small struct every specialist
//! embeds, and the two hooks become the two required trait methods.

mod factory;
mod gromacs;
mod test_specialist;

pub use factory::create_specialist;
pub use gromacs::GromacsSpecialist;
pub use test_specialist::TestSpecialist;

use std::collections::BTreeMap;

use crate::job::{JobRecord, JobStat};

/// Shared job bookkeeping every [`Specialist`] embeds: the source's
/// `Specialist.__init__`'s `_jobs`/`_job_stats` dicts plus
/// `_check_duplicated_name`.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<String, JobRecord>,
    stats: BTreeMap<String, JobStat>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `name` is not already managed.
    pub fn check_duplicate(&self, name: &str) -> bool {
        if self.jobs.contains_key(name) {
            tracing::error!("name duplicate [{name}]");
            return false;
        }
        true
    }

    pub fn insert(&mut self, job: JobRecord) {
        self.jobs.insert(job.name.clone(), job);
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.values()
    }

    pub fn get(&self, name: &str) -> Option<&JobRecord> {
        self.jobs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut JobRecord> {
        self.jobs.get_mut(name)
    }

    /// Remove `name` if present, reporting whether it was found.
    pub fn remove(&mut self, name: &str) -> bool {
        self.jobs.remove(name).is_some()
    }

    pub fn record_stat(&mut self, stat: JobStat) {
        self.stats.insert(stat.name.clone(), stat);
    }

    pub fn stats(&self) -> impl Iterator<Item = &JobStat> {
        self.stats.values()
    }
}

/// A delegate that owns and validates jobs of one job type.
///
/// `add_job` performs the two checks the source runs before accepting a
/// job (`_check_job_metadata` then `_check_duplicated_name`), storing it
/// only if both pass.
pub trait Specialist: Send + Sync {
    /// Check the job-type-specific required fields (`GromacsSpecialist`'s
    /// `REQUIRED` list, `TestSpecialist`'s unconditional pass).
    fn check_job_metadata(&self, job: &JobRecord) -> bool;

    /// Add `job` to this specialist's table. Returns `false` (and logs)
    /// if metadata validation or the duplicate-name check fails.
    fn add_job(&mut self, job: JobRecord) -> bool;

    /// Every job currently managed by this specialist.
    fn jobs(&self) -> Vec<JobRecord>;

    /// Remove `name` from this specialist's table if it is managed
    /// here, reporting whether it was found.
    fn remove_job(&mut self, name: &str) -> bool;

    /// Record a freshly observed [`crate::job::JobStat`] for one of
    /// this specialist's jobs.
    fn record_stat(&mut self, stat: crate::job::JobStat);

    /// Every job-status row last recorded for this specialist's jobs.
    fn job_stats(&self) -> Vec<crate::job::JobStat>;

    /// Re-synchronize with remote state. A hook for job-type-specific
    /// post-processing once the manager has refreshed job stats; the
    /// source's two implementations are both no-ops beyond logging.
    fn sync_remote(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(name: &str) -> JobRecord {
        JobRecord {
            name: name.to_string(),
            job_type: "Test".to_string(),
            remote: "cluster".to_string(),
            batch_type: "slurm".to_string(),
            username: "user".to_string(),
            work_dir: "/work".to_string(),
            time_limit: "24:00:00".to_string(),
            num_nodes: 1,
            num_procs: 1,
            num_threads: 1,
            partition: "standard".to_string(),
            num_gpus: None,
            name_base: None,
            section_num: 0,
            mdp: None,
            continuation: false,
            makeup: false,
            job_id: String::new(),
            exp_completion: crate::job::ExpCompletion::ZERO,
            exclusion_list: Default::default(),
            exclusion_path: None,
            index: None,
            binary_path: None,
            table_index: None,
        }
    }

    #[test]
    fn job_table_rejects_duplicate_names() {
        let mut table = JobTable::new();
        table.insert(sample_job("job1"));
        assert!(!table.check_duplicate("job1"));
        assert!(table.check_duplicate("job2"));
    }
}
