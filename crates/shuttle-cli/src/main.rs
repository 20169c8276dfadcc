mod args;
mod config;
mod handlers;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shuttle_core::app::{ControlFlags, WorkerBuilder, listen_for_signals};
use shuttle_core::domain::RestartToken;
use shuttle_core::impls::{FileMaintenanceMode, FileRestartStore, InMemoryQueue, InMemoryQueueManager};
use shuttle_core::ports::RestartSignalStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command, WorkArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match begin(args).await {
        Ok(code) => code,
        Err(error) => {
            error!(error = format!("{error:#}"), "encountered runtime error");
            ExitCode::FAILURE
        }
    }
}

async fn begin(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Work(ref work) => run_worker(&args, work).await,
        Command::Restart => {
            let store = FileRestartStore::new(args.restart_file.clone());
            let token = RestartToken::now();
            store
                .signal_restart(token)
                .await
                .with_context(|| format!("writing {}", store.path().display()))?;
            info!(%token, "broadcast restart signal");
            Ok(ExitCode::SUCCESS)
        }
        Command::Down => {
            let maintenance = FileMaintenanceMode::new(args.maintenance_file.clone());
            maintenance
                .down()
                .with_context(|| format!("creating {}", maintenance.marker().display()))?;
            info!("application is now in maintenance mode");
            Ok(ExitCode::SUCCESS)
        }
        Command::Up => {
            let maintenance = FileMaintenanceMode::new(args.maintenance_file.clone());
            maintenance
                .up()
                .with_context(|| format!("removing {}", maintenance.marker().display()))?;
            info!("application is now live");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_worker(args: &Args, work: &WorkArgs) -> Result<ExitCode> {
    let options = config::load_options(work)?;

    let registry = Arc::new(handlers::demo_registry()?);
    info!(handlers = ?registry.names(), "registered job handlers");

    let queue = Arc::new(InMemoryQueue::new(registry));
    if let Some(seed) = &work.seed {
        let pushed = config::seed_queue(&queue, seed).await?;
        info!(jobs = pushed, "seeded queue");
    }

    let manager = InMemoryQueueManager::new()
        .with_connection(work.connection.clone(), queue.clone())
        .with_maintenance(Arc::new(FileMaintenanceMode::new(
            args.maintenance_file.clone(),
        )));

    let flags = ControlFlags::new();
    let _signals =
        listen_for_signals(flags.clone()).context("could not install signal handlers")?;

    let worker = WorkerBuilder::new()
        .queue_manager(Arc::new(manager))
        .restart_store(Arc::new(FileRestartStore::new(args.restart_file.clone())))
        .control_flags(flags)
        .expect_connections(&[work.connection.as_str()])
        .build()?;

    if work.once {
        worker
            .run_next_job(&work.connection, &work.queue, &options)
            .await?;
        return Ok(ExitCode::SUCCESS);
    }

    let exit = worker
        .daemon(&work.connection, &work.queue, &options)
        .await?;
    let counts = queue.counts_by_state().await;
    info!(status = exit.code(), ?counts, "worker stopped");

    Ok(ExitCode::from(u8::try_from(exit.code()).unwrap_or(1)))
}
