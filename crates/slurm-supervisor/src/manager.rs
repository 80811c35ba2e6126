//! The Job Manager: validates incoming job envelopes, routes each job
//! to its [`crate::specialist::Specialist`], and reports what was
//! accepted or declined.
//!
//! Grounded in
//! `examples/original_source/script/python/tools/auto_submitter/manager.py`.
//! The source's `Labor` class (a bare `ThreadPoolExecutor` wrapper) is
//! `crate::labor::Labor` here; `JobManager` keeps the same "hire labor,
//! then accept jobs" lifecycle (`take_office` before `add_jobs`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{SupervisorError, SupervisorResult};
use crate::job::JobRecord;
use crate::labor::Labor;
use crate::specialist::{create_specialist, Specialist};

/// Maximum allowed length for a job's `name`, per `SPEC_FULL.md` §2/§8.
const MAX_NAME_LEN: usize = 8;

const HEADER_FIELDS: &[&str] = &["title", "data"];
const REQUIRED_FIELDS: &[&str] = &[
    "name",
    "type",
    "remote",
    "batchType",
    "userId",
    "directory",
    "timeLimit",
    "numOfNodes",
    "numOfProcs",
    "numOfThrs",
    "partition",
];

/// Distributes incoming jobs to [`Specialist`]s and owns the shared
/// [`Labor`] pool once [`JobManager::take_office`] has been called.
pub struct JobManager {
    specialists: HashMap<String, Box<dyn Specialist>>,
    labor: Option<Arc<Labor>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            specialists: HashMap::new(),
            labor: None,
        }
    }

    /// Hire the worker pool. Must be called before jobs are expected to
    /// run any labor-backed work.
    pub fn take_office(&mut self, num_workers: usize) {
        self.labor = Some(Arc::new(Labor::new(num_workers)));
    }

    /// The shared worker pool, once [`JobManager::take_office`] has
    /// hired it. Cloning the `Arc` lets other front-ends (the
    /// [`crate::supervisor::AutoSubmitter`] control loop) dispatch
    /// through the same bounded pool this manager owns.
    pub fn labor(&self) -> Option<Arc<Labor>> {
        self.labor.clone()
    }

    fn check_job_header(envelope: &Value) -> bool {
        let Some(obj) = envelope.as_object() else {
            let err = SupervisorError::InvalidEnvelope("envelope is not a JSON object".to_string());
            tracing::error!("{err}");
            return false;
        };
        let mut ok = true;
        for field in HEADER_FIELDS {
            if !obj.contains_key(*field) {
                let err = SupervisorError::InvalidEnvelope(format!("no field [{field}] in header"));
                tracing::error!("{err}");
                ok = false;
            }
        }
        ok
    }

    fn check_job_metadata(item: &Value) -> bool {
        let Some(obj) = item.as_object() else {
            return false;
        };
        let mut ok = true;
        for field in REQUIRED_FIELDS {
            if !obj.contains_key(*field) {
                tracing::error!("invalid job: no required field [{field}]");
                ok = false;
            }
        }
        ok
    }

    fn add_job(&mut self, item: &Value) -> bool {
        if !Self::check_job_metadata(item) {
            tracing::error!("invalid job meta data");
            return false;
        }

        let job: JobRecord = match serde_json::from_value(item.clone()) {
            Ok(job) => job,
            Err(err) => {
                tracing::error!("invalid job payload: {err}");
                return false;
            }
        };

        if job.name.len() > MAX_NAME_LEN {
            let err = SupervisorError::Validation {
                job: job.name.clone(),
                reason: format!("name length > {MAX_NAME_LEN}"),
            };
            tracing::error!("{err}");
            return false;
        }

        if !self.specialists.contains_key(&job.job_type) {
            match create_specialist(&job.job_type) {
                Some(specialist) => {
                    self.specialists.insert(job.job_type.clone(), specialist);
                }
                None => return false,
            }
        }

        let specialist = self
            .specialists
            .get_mut(&job.job_type)
            .expect("just inserted or already present");

        let name = job.name.clone();
        if !specialist.add_job(job) {
            tracing::info!("job [{name}] declined");
            return false;
        }
        tracing::info!("job [{name}] added");
        true
    }

    fn header_invalid_string() -> String {
        format!(
            "Your jobs are rejected due to invalid header.\n\
             Job header should contain the following required fields:\n\t\t {}\n",
            HEADER_FIELDS.join("\t")
        )
    }

    fn add_jobs_result(accepted: &[String], declined: &[String]) -> String {
        format!(
            "ACCEPTED: {}\nDECLINED: {}\n",
            accepted.join(" "),
            declined.join(" ")
        )
    }

    /// Add every job in `envelope` (expected shape `{"title": ..., "data": [...]}`),
    /// returning a human-readable accept/decline report.
    pub fn add_jobs(&mut self, envelope: &Value) -> String {
        if !Self::check_job_header(envelope) {
            tracing::error!("invalid header type. rejected.");
            return Self::header_invalid_string();
        }

        let mut accepted = Vec::new();
        let mut declined = Vec::new();
        let items = envelope["data"].as_array().cloned().unwrap_or_default();
        for item in &items {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if self.add_job(item) {
                accepted.push(name);
            } else {
                declined.push(name);
            }
        }

        Self::add_jobs_result(&accepted, &declined)
    }

    /// Every job across every specialist, for snapshotting or display.
    pub fn all_jobs(&self) -> Vec<JobRecord> {
        self.specialists.values().flat_map(|s| s.jobs()).collect()
    }

    /// Remove `names` from whichever specialist currently manages each
    /// one. Best-effort: a name not found in any specialist is simply
    /// absent from the returned list, per `SPEC_FULL.md` §4.7.
    pub fn remove_jobs(&mut self, names: &[String]) -> Vec<String> {
        let mut removed = Vec::new();
        for name in names {
            for specialist in self.specialists.values_mut() {
                if specialist.remove_job(name) {
                    removed.push(name.clone());
                    break;
                }
            }
        }
        removed
    }

    /// Re-synchronize every specialist with remote state.
    pub fn sync_remote(&mut self) {
        for specialist in self.specialists.values_mut() {
            specialist.sync_remote();
        }
    }

    /// Write the current job table to `path` as a `{"title": "Snapshot",
    /// "data": [...]}` document, pretty-printed with sorted keys and
    /// published atomically (write to a sibling `.tmp` file, then
    /// rename) so a reader never observes a half-written snapshot.
    pub fn snapshot(&self, path: &Path) -> SupervisorResult<String> {
        let document = serde_json::json!({
            "title": "Snapshot",
            "data": self.all_jobs(),
        });
        let rendered = to_pretty_json(&document)?;
        atomic_write(path, &rendered)?;
        Ok(format!("snapshot dumped to file {}", path.display()))
    }
}

/// Render `value` the way the source's `json.dump(..., indent=4,
/// sort_keys=True)` does: four-space indentation, object keys sorted.
/// Key sorting falls out of `serde_json::Map`'s `BTreeMap` backing
/// (this crate does not enable the `preserve_order` feature); only the
/// indent width needs an explicit formatter.
pub(crate) fn to_pretty_json(value: &serde_json::Value) -> SupervisorResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut serializer)?;
    Ok(String::from_utf8(buf).expect("JSON output is always valid UTF-8"))
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `contents` to `path` by first writing a sibling `.tmp` file
/// and renaming it into place, per `SPEC_FULL.md` Design Decision D4.
pub(crate) fn atomic_write(path: &Path, contents: &str) -> SupervisorResult<()> {
    let tmp_path = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path).map_err(|err| SupervisorError::Snapshot(err.to_string()))?;
    Ok(())
}
