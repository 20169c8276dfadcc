use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use shuttle_core::domain::WorkerOptions;
use shuttle_core::impls::{InMemoryQueue, NewJob};

use crate::args::WorkArgs;

/// Worker options from the YAML file (if any), overridden by flags.
pub(crate) fn load_options(args: &WorkArgs) -> Result<WorkerOptions> {
    let mut options = match &args.config {
        Some(path) => from_file(path)?,
        None => WorkerOptions::default(),
    };

    if let Some(sleep) = args.sleep {
        options.sleep = sleep;
    }
    if let Some(memory) = args.memory {
        options.memory_limit = memory;
    }
    if let Some(timeout) = args.timeout {
        options.timeout = timeout;
    }
    if let Some(tries) = args.tries {
        options.max_tries = tries;
    }
    if let Some(delay) = args.delay {
        options.retry_delay = delay;
    }
    options.force |= args.force;

    Ok(options)
}

fn from_file(path: &Path) -> Result<WorkerOptions> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let options = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(options)
}

/// One line of a seed file.
#[derive(Debug, Deserialize)]
struct SeedJob {
    #[serde(default = "default_queue")]
    queue: String,
    /// Seconds before the job becomes available.
    #[serde(default)]
    delay: u64,
    #[serde(flatten)]
    job: NewJob,
}

fn default_queue() -> String {
    "default".to_string()
}

/// Push every job of a JSON-lines file; blank lines are skipped.
pub(crate) async fn seed_queue(queue: &InMemoryQueue, path: &Path) -> Result<usize> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;

    let mut pushed = 0;
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let seed: SeedJob = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid job", path.display(), number + 1))?;
        if seed.delay == 0 {
            queue.push(&seed.queue, seed.job).await;
        } else {
            queue
                .later(&seed.queue, seed.job, std::time::Duration::from_secs(seed.delay))
                .await;
        }
        pushed += 1;
    }
    Ok(pushed)
}
