//! CLI front-end for `slurm-supervisor`.
//!
//! Deliberately thin, per `SPEC_FULL.md` §1: it loads a job envelope,
//! hands it to [`slurm_supervisor::JobManager`], registers one remote,
//! and either reports what was accepted/declined (`--test`) or drives
//! the [`slurm_supervisor::AutoSubmitter`] control loop. Argument
//! parsing, configuration-file loading and an RPC front-end are out of
//! scope for the core crate; this binary only exists so the crate is
//! runnable end to end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slurm_supervisor::{AutoSubmitter, Gateway, JobManager, Request, SupervisorConfig};
use tracing_subscriber::EnvFilter;

/// Automated batch-job supervisor for long-running HPC simulations.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a job envelope (`{"title": ..., "data": [...]}`).
    #[arg(long)]
    json: PathBuf,

    /// Name of the remote cluster to register and submit to.
    #[arg(long)]
    remote: String,

    /// Batch system used by `--remote` (e.g. "slurm").
    #[arg(long, default_value = "slurm")]
    batch_type: String,

    /// Remote username whose queue is polled.
    #[arg(long)]
    user: String,

    /// Validate and report on the envelope, then exit without
    /// starting the control loop.
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let envelope_raw = std::fs::read_to_string(&args.json)
        .with_context(|| format!("reading job envelope {}", args.json.display()))?;
    let envelope: serde_json::Value = serde_json::from_str(&envelope_raw)
        .with_context(|| format!("parsing job envelope {}", args.json.display()))?;

    let config = SupervisorConfig::default();
    let mut manager = JobManager::new();
    manager.take_office(slurm_supervisor::labor::DEFAULT_NUM_WORKERS);

    let report = manager.add_jobs(&envelope);
    print!("{report}");

    if args.test {
        return Ok(());
    }

    let gateway = Gateway::global();
    let registered = Request::request_remote(
        Arc::clone(&gateway),
        args.remote.clone(),
        args.batch_type.clone(),
    )
    .run()
    .await;
    if !registered {
        anyhow::bail!(
            "could not register remote [{}] with batch system [{}]",
            args.remote,
            args.batch_type
        );
    }

    let labor = manager
        .labor()
        .expect("take_office was called above, so a worker pool is hired");
    let jobs = manager.all_jobs();
    let supervisor = Arc::new(AutoSubmitter::new(
        gateway,
        config.clone(),
        args.remote.clone(),
        args.user.clone(),
        jobs,
        labor,
    ));

    if !supervisor.check_in().await {
        anyhow::bail!("job table failed check-in (see log for details)");
    }

    tracing::info!(
        "supervisor started for remote [{}] user [{}], polling every {:?}",
        args.remote,
        args.user,
        config.check_every
    );

    loop {
        supervisor.run_cycle().await;
        tokio::time::sleep(config.check_every).await;
    }
}
