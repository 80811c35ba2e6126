//! Declarative units of work dispatched to the [`crate::labor::Labor`]
//! worker pool.
//!
//! `SPEC_FULL.md` §4.3 describes Requests as objects exposing
//! `action()`/`args()` observers - a callable bound to the Gateway plus
//! its positional arguments. Since the request shapes here have
//! genuinely different result types (a job-stats lookup yields
//! `Option<JobStat>`, a log tail yields `Vec<String>`, ...), the
//! idiomatic Rust rendering keeps `Request` generic over its output and
//! replaces the `action()`/`args()` pair with one already-bound future;
//! the named constructors below (`Request::job_stats`,
//! `Request::copy_and_submit`, ...) are the "factory shapes" from
//! `SPEC_FULL.md` §4.3, each binding a [`crate::gateway::Gateway`]
//! method the same way the source's `NetworkRequest` subclasses bind
//! `self._gateway.<method>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::gateway::Gateway;
use crate::job::JobStat;

/// A declarative unit of work: a label (for logging) plus a future
/// already bound to its arguments and, for network requests, to a
/// [`Gateway`].
pub struct Request<T> {
    /// Human-readable name of this request shape, used only for
    /// logging inside the worker pool.
    pub label: &'static str,
    future: Pin<Box<dyn Future<Output = T> + Send>>,
}

impl<T: Send + 'static> Request<T> {
    fn new(label: &'static str, future: impl Future<Output = T> + Send + 'static) -> Self {
        Self {
            label,
            future: Box::pin(future),
        }
    }

    /// Wrap an arbitrary computation not bound to the Gateway
    /// (`GeneralRequest` in `SPEC_FULL.md` §4.3).
    pub fn general(label: &'static str, future: impl Future<Output = T> + Send + 'static) -> Self {
        Self::new(label, future)
    }

    pub(crate) fn into_future(self) -> Pin<Box<dyn Future<Output = T> + Send>> {
        self.future
    }

    /// Drive this request to completion directly, bypassing the
    /// [`crate::labor::Labor`] pool. Used by callers (the CLI front-end,
    /// one-shot setup requests) that need a result inline rather than a
    /// pool slot and a completion callback.
    pub async fn run(self) -> T {
        self.future.await
    }
}

impl Request<Option<JobStat>> {
    /// `JobStatsRequest(remote, user, jobName)`.
    pub fn job_stats(gateway: Arc<Gateway>, remote: String, user: String, job_name: String) -> Self {
        Self::new("JobStatsRequest", async move {
            gateway.job_stats(&remote, &user, &job_name).await
        })
    }
}

impl Request<String> {
    /// `CopyAndSubmitRequest(remote, folder, file)`.
    pub fn copy_and_submit(
        gateway: Arc<Gateway>,
        remote: String,
        folder: String,
        file: String,
    ) -> Self {
        Self::new("CopyAndSubmitRequest", async move {
            gateway.submit(&remote, &folder, &file).await
        })
    }
}

impl Request<()> {
    /// `CancelJobRequest(remote, jobId)`.
    pub fn cancel_job(gateway: Arc<Gateway>, remote: String, job_id: String) -> Self {
        Self::new("CancelJobRequest", async move {
            gateway.cancel(&remote, &job_id).await
        })
    }

    /// `ResetNetworkRequest()`.
    pub fn reset_network(gateway: Arc<Gateway>) -> Self {
        Self::new("ResetNetworkRequest", async move { gateway.reset().await })
    }
}

impl Request<Vec<String>> {
    /// `LogRequest(remote, jobId, workDir, n=1)`.
    pub fn log(
        gateway: Arc<Gateway>,
        remote: String,
        job_id: String,
        work_dir: String,
        n: usize,
    ) -> Self {
        Self::new("LogRequest", async move {
            gateway.tail_log(&remote, &job_id, &work_dir, n).await
        })
    }
}

impl Request<(bool, String)> {
    /// `RemoteCommandRequest(remote, cmd)`.
    pub fn remote_command(gateway: Arc<Gateway>, remote: String, cmd: String) -> Self {
        Self::new("RemoteCommandRequest", async move {
            gateway.run_on_remote(&remote, &cmd).await
        })
    }
}

impl Request<bool> {
    /// `RequestRemoteRequest(remote, batchType)`.
    pub fn request_remote(gateway: Arc<Gateway>, remote: String, batch_type: String) -> Self {
        Self::new("RequestRemoteRequest", async move {
            gateway.request_remote(&remote, &batch_type, false).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn general_request_runs_its_future() {
        let request = Request::general("add", async { 1 + 2 });
        let result = request.into_future().await;
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn run_drives_a_request_without_the_pool() {
        let request = Request::general("add", async { 1 + 2 });
        assert_eq!(request.run().await, 3);
    }
}
