//! Closed registry of [`RemoteAdapter`] variants, keyed by batch-system
//! name. Mirrors the `SpecialistFactory` pattern used on the job-type
//! side (`SPEC_FULL.md` §4.4/§9): a flat match on a known set of
//! string keys, `None` plus a logged error for anything else.

use crate::error::SupervisorError;
use crate::remote::runner::ShellCommandRunner;
use crate::remote::slurm::SlurmAdapter;
use crate::remote::RemoteAdapter;

/// Create a [`RemoteAdapter`] for `batch_system` talking to
/// `server_name` over a shelled-out `ssh`/`scp` transport.
///
/// Returns `None` for an unrecognized batch-system name.
pub fn create_adapter(
    batch_system: &str,
    server_name: &str,
    shared: bool,
) -> Option<Box<dyn RemoteAdapter>> {
    match batch_system {
        "slurm" => {
            let runner = ShellCommandRunner::new(server_name, shared);
            Some(Box::new(SlurmAdapter::new(server_name, runner)))
        }
        other => {
            let err = SupervisorError::UnknownVariant {
                kind: other.to_string(),
                of: "RemoteAdapter",
            };
            tracing::error!("{err}");
            None
        }
    }
}

#[cfg(feature = "ssh")]
/// Create a [`RemoteAdapter`] backed by an already-authenticated SSH
/// client (the teacher crate's `async-ssh2-tokio::Client`).
pub fn create_ssh_adapter(
    batch_system: &str,
    server_name: &str,
    shared: bool,
    client: async_ssh2_tokio::client::Client,
) -> Option<Box<dyn RemoteAdapter>> {
    match batch_system {
        "slurm" => {
            let runner = crate::remote::runner::SshCommandRunner::new(client, shared);
            Some(Box::new(SlurmAdapter::new(server_name, runner)))
        }
        other => {
            let err = SupervisorError::UnknownVariant {
                kind: other.to_string(),
                of: "RemoteAdapter",
            };
            tracing::error!("{err}");
            None
        }
    }
}
