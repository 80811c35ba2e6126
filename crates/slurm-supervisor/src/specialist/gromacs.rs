//! The Gromacs specialist: validates the molecular-dynamics-specific
//! fields (`nameBase`, `sectionNum`, `mdp`, `continuation`) before a job
//! is accepted, per `GromacsSpecialist` in
//! `examples/original_source/script/python/tools/auto_submitter/specialist.py`.

use super::{JobTable, Specialist};
use crate::job::JobRecord;

/// Delegate for jobs of type `"Gromacs"`.
#[derive(Debug, Default)]
pub struct GromacsSpecialist {
    table: JobTable,
}

impl GromacsSpecialist {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Specialist for GromacsSpecialist {
    fn check_job_metadata(&self, job: &JobRecord) -> bool {
        if job.name_base.is_none() {
            tracing::error!("invalid gromacs job: no required field [nameBase]");
            return false;
        }
        if job.mdp.is_none() {
            tracing::error!("invalid gromacs job: no required field [mdp]");
            return false;
        }
        // sectionNum and continuation are always present on JobRecord
        // (defaulted by serde), so their "required field" check from
        // the source collapses to "nothing further to verify" here.
        true
    }

    fn add_job(&mut self, job: JobRecord) -> bool {
        if !self.check_job_metadata(&job) {
            return false;
        }
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

    fn gromacs_job(name: &str) -> JobRecord {
        JobRecord {
            name: name.to_string(),
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
            exp_completion: crate::job::ExpCompletion::ZERO,
            exclusion_list: BTreeSet::new(),
            exclusion_path: None,
            index: None,
            binary_path: Some("/opt/gromacs".to_string()),
            table_index: None,
        }
    }

    #[test]
    fn accepts_job_with_required_fields() {
        let mut specialist = GromacsSpecialist::new();
        assert!(specialist.add_job(gromacs_job("md1")));
        assert_eq!(specialist.jobs().len(), 1);
    }

    #[test]
    fn rejects_job_missing_name_base() {
        let mut specialist = GromacsSpecialist::new();
        let mut job = gromacs_job("md1");
        job.name_base = None;
        assert!(!specialist.add_job(job));
        assert!(specialist.jobs().is_empty());
    }

    #[test]
    fn rejects_job_missing_mdp() {
        let mut specialist = GromacsSpecialist::new();
        let mut job = gromacs_job("md1");
        job.mdp = None;
        assert!(!specialist.add_job(job));
    }

    #[test]
    fn rejects_duplicate_job_name() {
        let mut specialist = GromacsSpecialist::new();
        assert!(specialist.add_job(gromacs_job("md1")));
        assert!(!specialist.add_job(gromacs_job("md1")));
        assert_eq!(specialist.jobs().len(), 1);
    }

    #[test]
    fn remove_job_is_best_effort() {
        let mut specialist = GromacsSpecialist::new();
        assert!(specialist.add_job(gromacs_job("md1")));
        assert!(specialist.remove_job("md1"));
        assert!(!specialist.remove_job("md1"));
        assert!(specialist.jobs().is_empty());
    }
}
