//! Live adapters for real external interactions.

pub mod clock;
pub mod tracker;

pub use clock::{FixedClock, LiveClock};
pub use tracker::JiraClient;
