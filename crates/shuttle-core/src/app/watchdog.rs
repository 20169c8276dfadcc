//! Watchdog - 暴走したジョブからプロセスを守るタイマー
//!
//! The countdown runs on its own OS thread. A job that blocks the async
//! executor (a tight loop, a synchronous call that never returns) cannot stop
//! it from firing. When it fires, the process is killed through the
//! [`Terminator`] without any cleanup; the supervisor relaunches the worker
//! and the attempt counter takes care of the job.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::domain::WorkerExit;
use crate::ports::Terminator;

#[derive(Debug, Default)]
struct Countdown {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct Shared {
    countdown: Mutex<Countdown>,
    condvar: Condvar,
}

pub struct Watchdog {
    shared: Option<Arc<Shared>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start the watchdog thread.
    ///
    /// If no thread can be spawned the watchdog runs disabled: timeouts are
    /// not enforced, and the worker keeps going.
    pub fn spawn(terminator: Arc<dyn Terminator>) -> Self {
        let shared = Arc::new(Shared {
            countdown: Mutex::new(Countdown::default()),
            condvar: Condvar::new(),
        });

        let thread = std::thread::Builder::new()
            .name("shuttle-watchdog".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(&shared, terminator.as_ref())
            });

        match thread {
            Ok(thread) => Self {
                shared: Some(shared),
                thread: Some(thread),
            },
            Err(error) => {
                warn!(%error, "could not start watchdog thread; job timeouts are not enforced");
                Self::disabled()
            }
        }
    }

    /// A watchdog that never fires.
    pub fn disabled() -> Self {
        Self {
            shared: None,
            thread: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    /// (Re)start the countdown. A zero duration disarms it.
    pub fn arm(&self, after: Duration) {
        let Some(shared) = &self.shared else {
            return;
        };
        let mut countdown = shared.countdown.lock();
        countdown.deadline = if after.is_zero() {
            None
        } else {
            Some(Instant::now() + after)
        };
        debug!(seconds = after.as_secs(), "watchdog armed");
        shared.condvar.notify_one();
    }

    pub fn disarm(&self) {
        self.arm(Duration::ZERO);
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(shared) = &self.shared {
            shared.countdown.lock().shutdown = true;
            shared.condvar.notify_one();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(shared: &Shared, terminator: &dyn Terminator) {
    let mut countdown = shared.countdown.lock();
    loop {
        if countdown.shutdown {
            return;
        }
        match countdown.deadline {
            None => shared.condvar.wait(&mut countdown),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    countdown.deadline = None;
                    // ロックを持ったまま kill しない（テスト用 Terminator は戻ってくる）
                    drop(countdown);
                    error!("job exceeded its timeout; killing the worker");
                    terminator.kill(WorkerExit::TIMED_OUT);
                    countdown = shared.countdown.lock();
                } else {
                    let _ = shared.condvar.wait_for(&mut countdown, deadline - now);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTerminator;

    #[test]
    fn fires_after_the_countdown() {
        let terminator = Arc::new(RecordingTerminator::default());
        let watchdog = Watchdog::spawn(terminator.clone());
        assert!(watchdog.is_enabled());

        watchdog.arm(Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(300));

        assert_eq!(terminator.kills(), vec![WorkerExit::TIMED_OUT]);
    }

    #[test]
    fn rearming_pushes_the_deadline_back() {
        let terminator = Arc::new(RecordingTerminator::default());
        let watchdog = Watchdog::spawn(terminator.clone());

        watchdog.arm(Duration::from_millis(200));
        std::thread::sleep(Duration::from_millis(100));
        watchdog.arm(Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(250));

        assert!(terminator.kills().is_empty());
    }

    #[test]
    fn disarm_and_zero_never_fire() {
        let terminator = Arc::new(RecordingTerminator::default());
        let watchdog = Watchdog::spawn(terminator.clone());

        watchdog.arm(Duration::from_millis(50));
        watchdog.disarm();
        watchdog.arm(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(200));

        assert!(terminator.kills().is_empty());
    }

    #[test]
    fn disabled_watchdog_ignores_arming() {
        let watchdog = Watchdog::disabled();
        assert!(!watchdog.is_enabled());
        watchdog.arm(Duration::from_millis(1));
    }
}
