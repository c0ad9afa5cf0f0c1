//! Recording adapter for the `IssueTracker` port.

use serde::Serialize;

use super::{record_result, SharedRecorder};
use crate::ports::{
    Issue, IssueDraft, IssueRef, IssueTracker, SearchOptions, TrackerError, Transition,
};

/// Records tracker calls while delegating to an inner tracker.
pub struct RecordingTracker {
    inner: Box<dyn IssueTracker>,
    recorder: SharedRecorder,
}

impl RecordingTracker {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn IssueTracker>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct SearchInput<'a> {
    jql: &'a str,
    options: &'a SearchOptions,
}

#[derive(Serialize)]
struct KeyInput<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct DoTransitionInput<'a> {
    key: &'a str,
    transition_id: &'a str,
}

impl IssueTracker for RecordingTracker {
    fn search(&self, jql: &str, options: &SearchOptions) -> Result<Vec<Issue>, TrackerError> {
        let result = self.inner.search(jql, options);
        let input = SearchInput { jql, options };
        record_result(&self.recorder, "tracker", "search", &input, &result);
        result
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError> {
        let result = self.inner.transitions(key);
        record_result(&self.recorder, "tracker", "transitions", &KeyInput { key }, &result);
        result
    }

    fn do_transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError> {
        let result = self.inner.do_transition(key, transition_id);
        let input = DoTransitionInput { key, transition_id };
        record_result(&self.recorder, "tracker", "do_transition", &input, &result);
        result
    }

    fn create(&self, draft: &IssueDraft) -> Result<IssueRef, TrackerError> {
        let result = self.inner.create(draft);
        record_result(&self.recorder, "tracker", "create", draft, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::adapters::live::JiraClient;
    use crate::cassette::{Cassette, CassetteRecorder};

    #[test]
    fn records_failed_call_with_structured_error() {
        let dir = std::env::temp_dir().join("ticketeer_rec_tracker_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tracker.cassette.yaml");

        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "jira-ab")));
        {
            // Nothing listens on port 1, so the call fails without a response.
            let inner = JiraClient::new("http://127.0.0.1:1", "alerts", "secret");
            let tracker = RecordingTracker::new(Box::new(inner), Arc::clone(&recorder));
            assert!(tracker.transitions("AB-1").is_err());
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.write().unwrap();

        let cassette = Cassette::load(&path).unwrap();
        let recorded = &cassette.interactions[0];
        assert_eq!(recorded.port, "tracker");
        assert_eq!(recorded.method, "transitions");
        assert_eq!(recorded.input["key"], "AB-1");
        assert!(recorded.output["Err"]["message"].is_string());
        assert!(recorded.output["Err"]["response"].is_null());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
