//! Restart token: an opaque marker for "someone asked the workers to restart".

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp of the last restart request.
///
/// The worker only ever compares tokens for equality; the timestamp is kept so
/// operators can read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestartToken(DateTime<Utc>);

impl RestartToken {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for RestartToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.to_rfc3339().fmt(f)
    }
}
