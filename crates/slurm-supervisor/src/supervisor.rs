//! The Supervisor control loop ("AutoSubmitter" in
//! `examples/original_source/script/python/tools/auto_submitter/submitter.py`):
//! the periodic driver that checks remote job status, diagnoses slow
//! nodes, and schedules resubmission.
//!
//! Unlike [`crate::manager::JobManager`] (which routes jobs through
//! per-type [`crate::specialist::Specialist`]s for validation and
//! batch-script generation), the source's `AutoSubmitter` keeps its own
//! flat job table and drives it directly — the two are independent
//! front-ends over the same [`Gateway`]/[`RemoteAdapter`] stack, exactly
//! as `submitter.py` and `manager.py` are independent of each other in
//! the original tree. This module mirrors that shape rather than
//! forcing the control loop through the Manager.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::batch;
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::gateway::Gateway;
use crate::job::{parse_hms, ExpCompletion, JobRecord, Seconds};
use crate::labor::Labor;
use crate::manager::{atomic_write, to_pretty_json};
use crate::remote::parse_projected_completion;
use crate::request::Request;

const JOB_ID_TOKEN_INDEX: usize = 3;

/// The periodic driver for one remote cluster's worth of managed jobs.
pub struct AutoSubmitter {
    gateway: Arc<Gateway>,
    config: SupervisorConfig,
    remote_name: String,
    username: String,
    job_table: Mutex<Vec<JobRecord>>,
    ids: Mutex<HashMap<String, usize>>,
    snapshot_lock: Mutex<()>,
    labor: Arc<Labor>,
}

impl AutoSubmitter {
    pub fn new(
        gateway: Arc<Gateway>,
        config: SupervisorConfig,
        remote_name: String,
        username: String,
        jobs: Vec<JobRecord>,
        labor: Arc<Labor>,
    ) -> Self {
        Self {
            gateway,
            config,
            remote_name,
            username,
            job_table: Mutex::new(jobs),
            ids: Mutex::new(HashMap::new()),
            snapshot_lock: Mutex::new(()),
            labor,
        }
    }

    /// Check the format of the configured job table: name length,
    /// duplicate names, and initialize the per-job transient fields.
    /// Mirrors `__checkin_items`.
    pub async fn check_in(&self) -> bool {
        let mut table = self.job_table.lock().await;
        let mut ids = self.ids.lock().await;
        ids.clear();

        for (index, item) in table.iter_mut().enumerate() {
            if item.name.len() > 8 {
                tracing::error!("job name has a length > 8 ({})", item.name);
                return false;
            }
            tracing::info!("put job {} in job table", item.name);

            if ids.contains_key(&item.name) {
                tracing::error!("duplicate job name {}", item.name);
                return false;
            }

            ids.insert(item.name.clone(), index);
            item.table_index = Some(index);
            item.job_id.clear();
            item.exp_completion = ExpCompletion::ZERO;
        }

        true
    }

    /// Current snapshot of the job table, for inspection/testing.
    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.job_table.lock().await.clone()
    }

    async fn time_to_completion(&self, job_id: &str, work_dir: &str) -> ExpCompletion {
        if work_dir.is_empty() {
            tracing::warn!("No work_directory is provided.");
            return ExpCompletion::Infinite;
        }
        if job_id.is_empty() {
            return ExpCompletion::ZERO;
        }

        let remote_now = self.gateway.current_time(&self.remote_name).await;
        let log_lines = self
            .gateway
            .tail_log(&self.remote_name, job_id, work_dir, 1)
            .await;
        let projected = parse_projected_completion(&log_lines);

        let (Some(remote_now), Some(projected)) = (remote_now, projected) else {
            tracing::info!("failed to obtain completion time.");
            return ExpCompletion::Infinite;
        };

        let projected_utc =
            chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(projected, chrono::Utc);
        ExpCompletion::Finite((projected_utc - remote_now).num_seconds())
    }

    /// Fetch remote job status and update every managed job's
    /// transient fields, detecting and acting on slow nodes. Mirrors
    /// `__get_job_stats`.
    async fn refresh_job_stats(&self) {
        let stats = self
            .gateway
            .job_statuses(&self.remote_name, &self.username)
            .await;

        let ids = self.ids.lock().await;
        let mut table = self.job_table.lock().await;

        for stat in stats {
            let Some(&index) = ids.get(&stat.name) else {
                continue;
            };
            let item = &mut table[index];
            item.job_id = stat.id.clone();

            if stat.state.is_running() {
                let exp_completion = self.time_to_completion(&item.job_id, &item.work_dir).await;
                let time_limit = parse_hms(&item.time_limit);

                if exp_completion.exceeds(time_limit) {
                    let machine = stat.machine.clone().unwrap_or_default();
                    tracing::error!(
                        "cancel job [{}] due to slow node [{}].",
                        item.name,
                        machine
                    );
                    self.gateway.cancel(&self.remote_name, &item.job_id).await;

                    tracing::info!("update exclusion lists with {machine}");
                    if let Err(err) = batch::add_exclusion_node(item, &machine) {
                        tracing::error!("failed to persist exclusion list: {err}");
                    }

                    item.exp_completion = ExpCompletion::ZERO;
                    item.makeup = true;
                } else {
                    item.exp_completion = exp_completion;
                    item.makeup = false;
                }
            } else {
                item.exp_completion = ExpCompletion::Infinite;
            }
        }
    }

    /// Scan the job table and return the names of jobs ready for
    /// resubmission (`expCompletion <= CHECK_EVERY_N`). Mirrors
    /// `__maybe_order_job_submission`.
    async fn jobs_ready_for_resubmit(&self) -> Vec<String> {
        let window = Seconds(self.config.check_every.as_secs() as i64);
        let table = self.job_table.lock().await;
        table
            .iter()
            .filter(|job| job.exp_completion.due_within(window))
            .map(|job| job.name.clone())
            .collect()
    }

    /// Run one full poll cycle: refresh remote status, then schedule a
    /// resubmit task for every job whose completion is imminent. Each
    /// resubmit is dispatched through the shared [`Labor`] pool so no
    /// more than `num_workers` resubmissions run at once, per
    /// `SPEC_FULL.md` §4.3/§5. Mirrors `__update_job_stats_task` minus
    /// its trailing `sleep`.
    pub async fn run_cycle(self: &Arc<Self>) {
        tracing::info!("update job status from remote");
        self.refresh_job_stats().await;

        for name in self.jobs_ready_for_resubmit().await {
            let this = Arc::clone(self);
            let request = Request::general("AutoResubmitTask", async move {
                this.auto_resubmit_task(&name).await;
            });
            self.labor.perform(request, None::<fn(Result<(), tokio::task::JoinError>)>);
        }
    }

    /// Resubmit `job_name` after waiting out its remaining completion
    /// window plus the configured gap. Mirrors `__auto_resubmit_task`.
    async fn auto_resubmit_task(&self, job_name: &str) {
        let delay = {
            let table = self.job_table.lock().await;
            let ids = self.ids.lock().await;
            let Some(&index) = ids.get(job_name) else {
                return;
            };
            let job = &table[index];
            match job.exp_completion {
                ExpCompletion::Finite(secs) => {
                    std::time::Duration::from_secs(secs.max(0) as u64) + self.config.gap_time
                }
                ExpCompletion::Infinite => return,
            }
        };
        tokio::time::sleep(delay).await;

        tracing::info!("submitting job {job_name}.");

        let (script, work_dir) = {
            let ids = self.ids.lock().await;
            let table = self.job_table.lock().await;
            let Some(&index) = ids.get(job_name) else {
                return;
            };
            let job = &table[index];
            match batch::generate_gromacs_batch(job, job.makeup) {
                Ok(script) => (script, job.work_dir.clone()),
                Err(err) => {
                    tracing::error!("failed to generate batch script for {job_name}: {err}");
                    return;
                }
            }
        };

        let file_name = format!("{job_name}.sh");
        if let Err(err) = std::fs::write(&file_name, script) {
            tracing::error!("failed to write batch file {file_name}: {err}");
            return;
        }

        let submission_output = Request::copy_and_submit(
            Arc::clone(&self.gateway),
            self.remote_name.clone(),
            work_dir,
            file_name.clone(),
        )
        .run()
        .await;
        let new_job_id = submission_output
            .split_whitespace()
            .nth(JOB_ID_TOKEN_INDEX)
            .unwrap_or_default()
            .to_string();
        tracing::info!("remote returns new job id: {new_job_id}");

        let ids = self.ids.lock().await;
        let mut table = self.job_table.lock().await;
        let Some(&index) = ids.get(job_name) else {
            return;
        };
        let job = &mut table[index];

        if new_job_id.is_empty() {
            let err = SupervisorError::Submission {
                job: job_name.to_string(),
            };
            tracing::error!("{err}");
        } else {
            tracing::info!(
                "job submitted: {job_name} section_id: {} job_id: {new_job_id}",
                job.section_num
            );
            job.job_id = new_job_id;
            job.section_num += 1;
            job.makeup = false;
        }

        drop(ids);
        let snapshot = serde_json::json!({"title": "Snapshot", "data": &*table});
        drop(table);

        self.dump_job_stats(&snapshot).await;
    }

    async fn dump_job_stats(&self, snapshot: &serde_json::Value) {
        let _guard = self.snapshot_lock.lock().await;
        match to_pretty_json(snapshot) {
            Ok(rendered) => {
                if let Err(err) = atomic_write(&self.config.snapshot_path, &rendered) {
                    tracing::error!("failed to dump current job stats: {err}");
                } else {
                    tracing::info!("dump current job stats to json");
                }
            }
            Err(err) => tracing::error!("failed to render job stats: {err}"),
        }
    }
}
