//! Typed errors for the supervisor core.
//!
//! The error taxonomy follows the propagation policy fixed by the
//! supervisor design: transient transport failures never reach here as
//! `Err` (callers fold them into sentinel values at the Gateway boundary),
//! while validation, submission and snapshot failures are reported so a
//! caller can decide what to do with them.

use thiserror::Error;

/// Result alias used throughout the supervisor core.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors produced by the supervisor core.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A job was rejected at add-time: missing/invalid metadata, a
    /// duplicate name, a name that is too long, or an inconsistent
    /// GPU/process count.
    #[error("job [{job}] rejected: {reason}")]
    Validation {
        /// Name of the rejected job.
        job: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A remote command could not be completed (timeout, transport
    /// error, or unparseable output). Carried as an error only at the
    /// point it originates; callers following the propagation policy
    /// fold this into an empty/`None` sentinel rather than bubbling it
    /// further.
    #[error("remote transport failure: {0}")]
    Transport(String),

    /// `sbatch` (or equivalent) returned no usable job id.
    #[error("submission failed for job [{job}]")]
    Submission {
        /// Name of the job whose submission failed.
        job: String,
    },

    /// The job table could not be persisted to disk.
    #[error("snapshot failed: {0}")]
    Snapshot(String),

    /// A factory was asked for a variant it does not know about
    /// (unknown Specialist kind, unknown batch-system name, ...).
    #[error("unknown {of} variant: {kind}")]
    UnknownVariant {
        /// The requested (unknown) variant key.
        kind: String,
        /// What kind of factory was asked (e.g. "Specialist", "RemoteAdapter").
        of: &'static str,
    },

    /// The job envelope itself was malformed (missing `title`/`data`),
    /// a startup-only condition per the propagation policy.
    #[error("invalid job envelope: {0}")]
    InvalidEnvelope(String),

    /// Wrapped I/O error (e.g. writing the exclusion file or snapshot).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
