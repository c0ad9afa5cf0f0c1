//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reconciliation core and an
//! external system (time, the issue tracker). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod tracker;

pub use clock::Clock;
pub use tracker::{
    ApiResponse, FieldValue, Issue, IssueDraft, IssueFields, IssueRef, IssueTracker, Resolution,
    SearchOptions, Status, StatusCategory, TrackerError, Transition,
};
