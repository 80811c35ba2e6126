#![warn(rust_2018_idioms, missing_debug_implementations)]

//! Automated batch-job supervisor for long-running simulations on
//! SLURM-style HPC clusters.
//!
//! The crate is organized leaf-first, matching the component
//! dependency order in `SPEC_FULL.md` §2:
//!
//! 1. [`remote`] - transport-neutral proxy to one remote scheduler.
//! 2. [`gateway`] - the single coordination point for remote traffic.
//! 3. [`request`] - declarative units of work dispatched to the pool.
//! 4. [`labor`] - the fixed-size worker pool ("Labor").
//! 5. [`specialist`] - per-job-type validation and batch generation.
//! 6. [`manager`] - top-level job-envelope coordinator.
//! 7. [`supervisor`] - the periodic control loop ("AutoSubmitter").
//!
//! [`job`], [`batch`], [`config`] and [`error`] are the data model,
//! batch-script generation and ambient configuration/error types those
//! components share.

pub mod batch;
pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod labor;
pub mod manager;
pub mod remote;
pub mod request;
pub mod specialist;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use error::{SupervisorError, SupervisorResult};
pub use gateway::Gateway;
pub use job::{ExpCompletion, JobRecord, JobStat, JobState};
pub use labor::Labor;
pub use manager::JobManager;
pub use request::Request;
pub use supervisor::AutoSubmitter;
