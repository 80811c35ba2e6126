//! The test specialist: accepts any job unconditionally, mirroring
//! `TestSpecialist` in
//! `examples/original_source/script/python/tools/auto_submitter/specialist.py`.
//! Used for the `TestSubmitter`-style dry-run path in `SPEC_FULL.md` §6.

use super::{JobTable, Specialist};
use crate::job::JobRecord;

/// Delegate for jobs of type `"Test"`. Performs no metadata validation.
#[derive(Debug, Default)]
pub struct TestSpecialist {
    table: JobTable,
}

impl TestSpecialist {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Specialist for TestSpecialist {
    fn check_job_metadata(&self, _job: &JobRecord) -> bool {
        true
    }

    fn add_job(&mut self, job: JobRecord) -> bool {
        if !self.table.check_duplicate(&job.name) {
            return false;
        }
        let name = job.name.clone();
        self.table.insert(job);
        tracing::info!("add_job: {name}");
        true
    }

    fn jobs(&self) -> Vec<JobRecord> {
        self.table.jobs().cloned().collect()
    }

    fn remove_job(&mut self, name: &str) -> bool {
        self.table.remove(name)
    }

    fn record_stat(&mut self, stat: crate::job::JobStat) {
        self.table.record_stat(stat);
    }

    fn job_stats(&self) -> Vec<crate::job::JobStat> {
        self.table.stats().cloned().collect()
    }

    fn sync_remote(&mut self) {
        tracing::info!("synced with remote.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn bare_job(name: &str) -> JobRecord {
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
            exclusion_list: BTreeSet::new(),
            exclusion_path: None,
            index: None,
            binary_path: None,
            table_index: None,
        }
    }

    #[test]
    fn accepts_jobs_with_no_extra_fields() {
        let mut specialist = TestSpecialist::new();
        assert!(specialist.add_job(bare_job("t1")));
        assert_eq!(specialist.jobs().len(), 1);
    }

    #[test]
    fn still_rejects_duplicate_names() {
        let mut specialist = TestSpecialist::new();
        assert!(specialist.add_job(bare_job("t1")));
        assert!(!specialist.add_job(bare_job("t1")));
    }
}
