//! The worker pool ("Labor" in `SPEC_FULL.md` §2/§4.3): a fixed-size
//! parallel executor for [`Request`]s.
//!
//! Grounded in the teacher crate's concurrency style
//! (`crates/slurry/src/job_management/mod.rs::submit_job` spawns a
//! bounded `JoinSet` of uploads) generalized into a standing pool a
//! `Request` can be handed to at any time, with a completion callback
//! that fires exactly once - on success or failure - per
//! `SPEC_FULL.md` §4.3.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::request::Request;

/// Default number of concurrent workers, per `SPEC_FULL.md` §4.3/§5.
pub const DEFAULT_NUM_WORKERS: usize = 8;

/// A fixed-size pool of concurrent workers.
pub struct Labor {
    semaphore: Arc<Semaphore>,
}

impl Labor {
    /// Create a pool with `num_workers` concurrent slots.
    pub fn new(num_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(num_workers.max(1))),
        }
    }

    /// Submit `request` to the pool. If `callback` is provided, it runs
    /// exactly once, with the request's result or the [`JoinError`]
    /// from a panicked task, once the request completes - ordering
    /// between independently submitted requests is not guaranteed.
    pub fn perform<T, F>(&self, request: Request<T>, callback: Option<F>)
    where
        T: Send + 'static,
        F: FnOnce(Result<T, JoinError>) + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let label = request.label;
        let future = request.into_future();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("labor semaphore should never be closed");
            tracing::debug!("labor: running {label}");
            future.await
        });

        if let Some(callback) = callback {
            tokio::spawn(async move {
                let result = handle.await;
                callback(result);
            });
        }
    }
}

impl Default for Labor {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[tokio::test]
    async fn callback_runs_once_on_success() {
        let labor = Labor::new(2);
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request = Request::general("add", async { 1 + 2 });
        labor.perform(
            request,
            Some(move |result: Result<i32, JoinError>| {
                tx.send(result.unwrap()).unwrap();
            }),
        );
        assert_eq!(rx.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn callback_runs_once_on_panic() {
        let labor = Labor::new(2);
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request: Request<i32> = Request::general("boom", async { panic!("boom") });
        labor.perform(
            request,
            Some(move |result: Result<i32, JoinError>| {
                tx.send(result.is_err()).unwrap();
            }),
        );
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn pool_bounds_concurrency() {
        let labor = Labor::new(1);
        let running = Arc::new(AtomicI32::new(0));
        let max_seen = Arc::new(AtomicI32::new(0));

        for _ in 0..4 {
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            let request = Request::general("work", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
            labor.perform(request, None::<fn(Result<(), JoinError>)>);
        }
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
