//! ErrorReporter port - out-of-band error reporting.

/// Fire-and-forget sink for errors the worker swallows (pop failures, job
/// failures, failing listeners). Implementations must not panic.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn std::error::Error + 'static));
}
