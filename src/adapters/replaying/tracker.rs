//! Replaying adapter for the `IssueTracker` port.

use super::{next_output, replay_result, SharedReplayer};
use crate::ports::{
    Issue, IssueDraft, IssueRef, IssueTracker, SearchOptions, TrackerError, Transition,
};

/// Answers tracker calls with recorded results, including recorded failures.
pub struct ReplayingTracker {
    replayer: SharedReplayer,
}

impl ReplayingTracker {
    /// Creates a tracker reading from `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }

    fn replay<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, TrackerError> {
        let output = next_output(&self.replayer, "tracker", method);
        replay_result("tracker", method, output)
    }
}

impl IssueTracker for ReplayingTracker {
    fn search(&self, _jql: &str, _options: &SearchOptions) -> Result<Vec<Issue>, TrackerError> {
        self.replay("search")
    }

    fn transitions(&self, _key: &str) -> Result<Vec<Transition>, TrackerError> {
        self.replay("transitions")
    }

    fn do_transition(&self, _key: &str, _transition_id: &str) -> Result<(), TrackerError> {
        self.replay("do_transition")
    }

    fn create(&self, _draft: &IssueDraft) -> Result<IssueRef, TrackerError> {
        self.replay("create")
    }
}
