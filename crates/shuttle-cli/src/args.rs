use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shuttle", about, long_about = None, version)]
pub(crate) struct Args {
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t, global = true)]
    pub(crate) debug: bool,
    /// File holding the last restart token.
    #[arg(long, default_value = "storage/shuttle/restart", global = true)]
    pub(crate) restart_file: PathBuf,
    /// Marker file; while it exists the application is down for maintenance.
    #[arg(long, default_value = "storage/shuttle/down", global = true)]
    pub(crate) maintenance_file: PathBuf,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Process jobs from the queue.
    Work(WorkArgs),
    /// Ask running workers to exit after their current job.
    Restart,
    /// Put the application into maintenance mode.
    Down,
    /// Bring the application out of maintenance mode.
    Up,
}

#[derive(ClapArgs, Debug, Default)]
pub(crate) struct WorkArgs {
    /// Queue connection to work on.
    #[arg(long, default_value = "memory")]
    pub(crate) connection: String,
    /// Queues to listen on, highest priority first (comma separated).
    #[arg(long, default_value = "default")]
    pub(crate) queue: String,
    /// Seconds to sleep when no job is available.
    #[arg(long)]
    pub(crate) sleep: Option<u64>,
    /// Memory limit in megabytes.
    #[arg(long)]
    pub(crate) memory: Option<u64>,
    /// Seconds a job may run.
    #[arg(long)]
    pub(crate) timeout: Option<u64>,
    /// Attempts before a job is failed (0 = unlimited).
    #[arg(long)]
    pub(crate) tries: Option<u32>,
    /// Seconds before a failed job is retried.
    #[arg(long)]
    pub(crate) delay: Option<u64>,
    /// Run even in maintenance mode.
    #[arg(long, default_value_t)]
    pub(crate) force: bool,
    /// Process a single job, then exit.
    #[arg(long, default_value_t)]
    pub(crate) once: bool,
    /// YAML file with worker options; flags override it.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
    /// JSON-lines file of jobs pushed before the worker starts.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}
