//! Terminator port - プロセスの強制終了

use crate::domain::WorkerExit;

/// Ends the process without unwinding or cleanup.
///
/// Used only by the watchdog. Production code exits the process; tests swap
/// in a recorder.
pub trait Terminator: Send + Sync {
    fn kill(&self, status: WorkerExit);
}

/// Exits the process immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn kill(&self, status: WorkerExit) {
        std::process::exit(status.code())
    }
}
