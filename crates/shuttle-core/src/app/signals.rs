//! Pause / resume / quit flags driven by OS signals.
//!
//! - SIGUSR2: pause (jobs stay on the queue, the loop idles)
//! - SIGCONT: resume
//! - SIGTERM: quit after the current iteration

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::info;

/// Process-wide control flags, read once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    paused: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

/// Install the signal handlers and spawn the task that flips `flags`.
///
/// Must be called from inside a tokio runtime.
#[cfg(unix)]
pub fn listen_for_signals(flags: ControlFlags) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut pause = signal(SignalKind::user_defined2())?;
    let mut resume = signal(SignalKind::from_raw(libc::SIGCONT))?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = pause.recv() => {
                    info!("received SIGUSR2, pausing");
                    flags.pause();
                }
                Some(()) = resume.recv() => {
                    info!("received SIGCONT, resuming");
                    flags.resume();
                }
                Some(()) = terminate.recv() => {
                    info!("received SIGTERM, stopping after the current job");
                    flags.request_quit();
                }
                else => break,
            }
        }
    }))
}

/// No asynchronous signals here: pause/resume/quit are only reachable through
/// [`ControlFlags`].
#[cfg(not(unix))]
pub fn listen_for_signals(_flags: ControlFlags) -> std::io::Result<JoinHandle<()>> {
    tracing::warn!("signal handling is not supported on this platform");
    Ok(tokio::spawn(async {}))
}
