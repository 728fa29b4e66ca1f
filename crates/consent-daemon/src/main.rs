//! consentd - Consent Grant Lifecycle Daemon
//!
//! Runs the background half of the consent engine: the expiry sweep over
//! the grant store and the revocation signal intake. The request path
//! (grant submission, access checks) lives in the data-serving layer,
//! which links `consent-core` directly; this daemon owns the time-driven
//! transitions that must keep happening whether or not any request
//! arrives.
//!
//! On startup the daemon verifies the audit ledger's hash chain and
//! refuses to run over a tampered ledger.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use consent_core::audit::{AuditLog, SqliteAuditLog};
use consent_core::revocation::RevocationTrigger;
use consent_core::store::SqliteContractStore;
use consent_core::sweep::ExpirySweeper;
use consent_daemon::config::DaemonConfig;
use consent_daemon::intake::{DEFAULT_QUEUE_DEPTH, RevocationIntake};
use consent_daemon::worker::{SweepWorker, SweepWorkerConfig};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// consentd - consent grant lifecycle daemon
#[derive(Parser, Debug)]
#[command(name = "consentd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "consentd.toml")]
    config: PathBuf,

    /// Override the sweep interval in seconds
    #[arg(long)]
    sweep_interval_secs: Option<u64>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        DaemonConfig::from_file(&args.config)
            .with_context(|| format!("loading config from {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "no config file, using defaults");
        DaemonConfig::default()
    };
    if let Some(secs) = args.sweep_interval_secs {
        config.sweep.interval_secs = secs;
    }
    config.validate().context("validating configuration")?;

    let store = Arc::new(
        SqliteContractStore::open(&config.database.grants_path).with_context(|| {
            format!(
                "opening grant store at {}",
                config.database.grants_path.display()
            )
        })?,
    );
    let audit = Arc::new(
        SqliteAuditLog::open(&config.database.audit_path).with_context(|| {
            format!(
                "opening audit ledger at {}",
                config.database.audit_path.display()
            )
        })?,
    );
    audit
        .verify_chain()
        .context("audit ledger failed chain verification")?;
    info!("audit chain verified");

    let sweeper = Arc::new(ExpirySweeper::new(
        Arc::clone(&store) as _,
        Arc::clone(&audit) as _,
    ));
    let trigger = Arc::new(RevocationTrigger::new(
        Arc::clone(&store) as _,
        Arc::clone(&audit) as _,
    ));

    let worker = SweepWorker::new(
        sweeper,
        SweepWorkerConfig::default().with_interval(config.sweep.interval()),
    );
    let shutdown = worker.shutdown_handle();
    let sweep_task = tokio::spawn(worker.run());

    // The operational layer pushes revocation signals through this sender;
    // dropping it on shutdown lets the intake drain and stop.
    let (signal_tx, intake) = RevocationIntake::channel(trigger, DEFAULT_QUEUE_DEPTH);
    let intake_task = tokio::spawn(intake.run());

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    info!("shutting down");
    shutdown.store(true, Ordering::Relaxed);
    drop(signal_tx);
    let _ = sweep_task.await;
    let _ = intake_task.await;
    info!("consentd stopped");

    Ok(())
}
