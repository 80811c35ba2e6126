//! The Gateway: the single coordination point all remote traffic flows
//! through, owning the registered [`RemoteAdapter`]s and the
//! remote-status cache.
//!
//! Grounded in
//! `examples/original_source/script/python/tools/auto_submitter/gateway.py`.
//! The source models the Gateway as a process-wide singleton via a
//! metaclass; here it is an ordinary, independently constructible type
//! (`Gateway::new`) so tests get full isolation, plus [`Gateway::global`]
//! for the one place the supervisor actually wants a shared default
//! instance. The Gateway never holds a reference back into a
//! `RemoteAdapter` - only a registry of them - so the Gateway/Adapter
//! relationship is one-way (`SPEC_FULL.md` §4.2).

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::job::{JobNote, JobStat};
use crate::remote::factory;
use crate::remote::RemoteAdapter;

struct Cache {
    stats: HashMap<String, JobStat>,
    last_update: DateTime<Utc>,
}

impl Cache {
    fn new() -> Self {
        Self {
            stats: HashMap::new(),
            last_update: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// The network gateway. Owns every registered [`RemoteAdapter`] and
/// the cache of the last-seen [`JobStat`] for each managed job name.
pub struct Gateway {
    remotes: RwLock<HashMap<String, Box<dyn RemoteAdapter>>>,
    cache: Mutex<Cache>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<Arc<Gateway>> = OnceLock::new();

impl Gateway {
    /// Create a fresh, independent Gateway with no registered remotes.
    pub fn new() -> Self {
        Self {
            remotes: RwLock::new(HashMap::new()),
            cache: Mutex::new(Cache::new()),
        }
    }

    /// The process-wide default Gateway instance, created on first use.
    pub fn global() -> Arc<Gateway> {
        GLOBAL.get_or_init(|| Arc::new(Gateway::new())).clone()
    }

    /// Register (or re-register, if the batch system changed) a
    /// [`RemoteAdapter`] for `remote_name`. Immediately probes the
    /// connection with a cheap `ls`; on probe failure the adapter is
    /// discarded and `false` is returned.
    pub async fn request_remote(&self, remote_name: &str, batch_system: &str, shared: bool) -> bool {
        {
            let remotes = self.remotes.read().await;
            if let Some(existing) = remotes.get(remote_name) {
                if existing.batch_system() == batch_system {
                    return true;
                }
                tracing::warn!("using a new batch system on {remote_name}");
            }
        }

        let Some(adapter) = factory::create_adapter(batch_system, remote_name, shared) else {
            return false;
        };

        {
            let mut remotes = self.remotes.write().await;
            remotes.insert(remote_name.to_string(), adapter);
        }

        if !self.run_on_remote(remote_name, "ls").await.0 {
            tracing::error!("remote server [{remote_name}] refuses to connect");
            self.remotes.write().await.remove(remote_name);
            return false;
        }

        true
    }

    /// Query cached/live job status for `job_name` on `remote_name`.
    /// If a cached entry with a pending note exists, it is returned and
    /// the note cleared (one-shot pending-to-live transition);
    /// otherwise every job status for `username` is refreshed and the
    /// cache atomically replaced.
    pub async fn job_stats(
        &self,
        remote_name: &str,
        username: &str,
        job_name: &str,
    ) -> Option<JobStat> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(stat) = cache.stats.get_mut(job_name) {
                if stat.note == JobNote::Pending {
                    stat.note = JobNote::Clear;
                    return Some(stat.clone());
                }
            }
        }

        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return None;
        };
        let fresh = adapter.job_status(username).await;
        drop(remotes);

        let mut cache = self.cache.lock().await;
        cache.stats = fresh.into_iter().map(|s| (s.name.clone(), s)).collect();
        cache.last_update = Utc::now();
        cache.stats.get(job_name).cloned()
    }

    /// Copy and submit `file_name` into `remote_folder` on
    /// `remote_name`.
    pub async fn submit(&self, remote_name: &str, remote_folder: &str, file_name: &str) -> String {
        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return String::new();
        };
        adapter.copy_and_submit(file_name, remote_folder).await
    }

    /// Cancel `job_id` on `remote_name`.
    pub async fn cancel(&self, remote_name: &str, job_id: &str) {
        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return;
        };
        adapter.cancel_job(job_id).await;
    }

    /// Query every job status for `user` on `remote_name` directly,
    /// bypassing the per-job-name cache `job_stats` maintains. Used by
    /// the Supervisor's poll cycle, which needs every row on every
    /// refresh rather than one cached entry at a time.
    pub async fn job_statuses(&self, remote_name: &str, user: &str) -> Vec<JobStat> {
        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return Vec::new();
        };
        adapter.job_status(user).await
    }

    /// Current time on `remote_name`, or `None` if unreachable/unparseable.
    pub async fn current_time(&self, remote_name: &str) -> Option<DateTime<Utc>> {
        let remotes = self.remotes.read().await;
        let adapter = remotes.get(remote_name)?;
        adapter.current_time().await
    }

    /// Run a raw command on `remote_name`.
    pub async fn run_on_remote(&self, remote_name: &str, cmd: &str) -> (bool, String) {
        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return (false, String::new());
        };
        adapter.run_command(cmd).await
    }

    /// Tail `job_id`'s log on `remote_name`.
    pub async fn tail_log(
        &self,
        remote_name: &str,
        job_id: &str,
        work_dir: &str,
        n: usize,
    ) -> Vec<String> {
        let remotes = self.remotes.read().await;
        let Some(adapter) = remotes.get(remote_name) else {
            tracing::error!("no remote object named {remote_name} is registered");
            return Vec::new();
        };
        adapter.tail_log(job_id, work_dir, n).await
    }

    /// Clear every registered remote and the status cache. A testing
    /// hook, mirroring `gateway.py`'s `reset()`.
    pub async fn reset(&self) {
        self.remotes.write().await.clear();
        let mut cache = self.cache.lock().await;
        cache.stats.clear();
        cache.last_update = DateTime::<Utc>::UNIX_EPOCH;
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}
