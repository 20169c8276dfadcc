//! Failure causes: why a job left the happy path.
//!
//! Every failure the worker handles is one of a small, closed set of causes.
//! Keeping them in a tagged enum lets the state machine, events and reporters
//! match on the cause instead of inspecting error types at runtime.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// Error type returned by job business logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A job error shared between events, reporters and the caller.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum FailureCause {
    /// The job's own execution returned an error.
    #[error(transparent)]
    Error(SharedError),

    /// The job panicked while executing.
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The job was failed without an underlying error.
    #[error("job was manually failed")]
    ManuallyFailed,

    /// The job was already over its attempt budget when it was picked up.
    /// Usually this means a previous attempt was killed by the watchdog.
    #[error(
        "{job} has been attempted too many times or run too long ({attempts}/{max_tries}); \
         the job may have previously timed out"
    )]
    MaxAttemptsExceeded {
        job: String,
        attempts: u32,
        max_tries: u32,
    },
}

impl FailureCause {
    pub fn from_error(error: BoxError) -> Self {
        Self::Error(Arc::from(error))
    }

    /// Convert a panic payload caught around `Job::fire`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// The underlying job error, if the cause carries one.
    pub fn error(&self) -> Option<&SharedError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Panicked(_) => "panicked",
            Self::ManuallyFailed => "manually_failed",
            Self::MaxAttemptsExceeded { .. } => "max_attempts_exceeded",
        }
    }
}

impl From<BoxError> for FailureCause {
    fn from(error: BoxError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("smtp unavailable")]
    struct SmtpDown;

    #[test]
    fn error_cause_is_transparent() {
        let cause = FailureCause::from_error(Box::new(SmtpDown));
        assert_eq!(cause.to_string(), "smtp unavailable");
        assert!(cause.error().is_some());
        assert_eq!(cause.kind(), "error");
    }

    #[test]
    fn panic_payloads_are_stringified() {
        let cause = FailureCause::from_panic(Box::new("boom"));
        assert_eq!(cause.to_string(), "job panicked: boom");

        let cause = FailureCause::from_panic(Box::new(String::from("owned boom")));
        assert!(matches!(cause, FailureCause::Panicked(ref m) if m == "owned boom"));

        let cause = FailureCause::from_panic(Box::new(42_u8));
        assert!(matches!(cause, FailureCause::Panicked(ref m) if m == "non-string panic payload"));
    }

    #[test]
    fn max_attempts_message_mentions_counts() {
        let cause = FailureCause::MaxAttemptsExceeded {
            job: "send_email".to_string(),
            attempts: 4,
            max_tries: 3,
        };
        let msg = cause.to_string();
        assert!(msg.contains("send_email"));
        assert!(msg.contains("4/3"));
        assert!(cause.error().is_none());
    }
}
