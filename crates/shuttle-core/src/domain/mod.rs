//! Domain model (options, events, failure causes, states, ...).
//!
//! Pure data: nothing in here talks to a queue backend or the OS.

pub mod errors;
pub mod events;
pub mod failure;
pub mod ids;
pub mod options;
pub mod restart;
pub mod state;

pub use errors::WorkerError;
pub use events::{EventKind, JobDescriptor, Propagation, WorkerEvent};
pub use failure::{BoxError, FailureCause, SharedError};
pub use ids::JobId;
pub use options::WorkerOptions;
pub use restart::RestartToken;
pub use state::{JobState, WorkerExit};
