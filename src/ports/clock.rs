//! Clock port for obtaining the current time.

use chrono::{DateTime, Utc};

/// Source of "now" for reopen-window decisions.
///
/// Swapping in a fixed or recorded clock makes the window check
/// deterministic in tests and cassette playback.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
