//! Job processing states and worker exit statuses.

use serde::{Deserialize, Serialize};

/// Where a job ended up after one pass through the worker.
///
/// State transitions:
/// - Processing -> Succeeded
/// - Processing -> RetryScheduled (released back to the queue)
/// - Processing -> PermanentlyFailed (deleted, `failed` hook invoked)
///
/// On the two failure states the original cause is also returned to the
/// caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Processing,
    Succeeded,
    RetryScheduled,
    PermanentlyFailed,
}

impl JobState {
    /// Is this a terminal state (job removed from the queue or acknowledged)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::PermanentlyFailed)
    }
}

/// Status the worker process should exit with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerExit(i32);

impl WorkerExit {
    /// Normal stop, including restart-detected stops.
    pub const NORMAL: WorkerExit = WorkerExit(0);

    /// A job overran its timeout and the watchdog fired.
    pub const TIMED_OUT: WorkerExit = WorkerExit(1);

    /// Resident memory reached the configured limit.
    pub const MEMORY_EXCEEDED: WorkerExit = WorkerExit(12);

    pub fn from_code(code: i32) -> Self {
        Self(code)
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::succeeded(JobState::Succeeded, true)]
    #[case::failed(JobState::PermanentlyFailed, true)]
    #[case::retry(JobState::RetryScheduled, false)]
    #[case::processing(JobState::Processing, false)]
    fn terminal_states(#[case] state: JobState, #[case] terminal: bool) {
        assert_eq!(state.is_terminal(), terminal);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(WorkerExit::NORMAL.code(), 0);
        assert_eq!(WorkerExit::TIMED_OUT.code(), 1);
        assert_eq!(WorkerExit::MEMORY_EXCEEDED.code(), 12);
        assert_eq!(WorkerExit::from_code(3).code(), 3);
    }
}
