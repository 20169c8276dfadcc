//! Worker options: immutable configuration for one daemon run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one invocation of the daemon loop.
///
/// Every field is expressed in whole seconds / megabytes, the same units the
/// command line accepts. Missing fields fall back to [`WorkerOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    /// Seconds to sleep when no job is available.
    pub sleep: u64,

    /// Resident memory (MB) at which the worker stops with status 12.
    pub memory_limit: u64,

    /// Default seconds a job may run before the watchdog kills the process.
    pub timeout: u64,

    /// Default maximum attempts per job. `0` means unlimited.
    pub max_tries: u32,

    /// Seconds a failed job waits before it becomes available again.
    pub retry_delay: u64,

    /// Run even while the application is in maintenance mode.
    pub force: bool,
}

impl WorkerOptions {
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn with_sleep(mut self, sleep: u64) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_memory_limit(mut self, megabytes: u64) -> Self {
        self.memory_limit = megabytes;
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: u64) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            sleep: 3,
            memory_limit: 128,
            timeout: 60,
            max_tries: 0,
            retry_delay: 0,
            force: false,
        }
    }
}
