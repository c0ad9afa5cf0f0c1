//! Replaying adapter for the `Clock` port.

use chrono::{DateTime, Utc};

use super::{next_output, SharedReplayer};
use crate::ports::clock::Clock;

/// Answers `now()` with recorded instants.
pub struct ReplayingClock {
    replayer: SharedReplayer,
}

impl ReplayingClock {
    /// Creates a clock reading from `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl Clock for ReplayingClock {
    fn now(&self) -> DateTime<Utc> {
        let output = next_output(&self.replayer, "clock", "now");
        serde_json::from_value(output)
            .unwrap_or_else(|e| panic!("clock::now: recorded value is not a timestamp: {e}"))
    }
}
