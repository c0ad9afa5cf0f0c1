//! Service context bundling the port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::adapters::live::{JiraClient, LiveClock};
use crate::adapters::recording::{RecordingClock, RecordingTracker, SharedRecorder};
use crate::adapters::replaying::{ReplayingClock, ReplayingTracker, SharedReplayer};
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::ReceiverConfig;
use crate::ports::clock::Clock;
use crate::ports::tracker::IssueTracker;

/// Bundles the ports a receiver talks to.
///
/// Constructors wire up the live, recording or replaying adapters.
pub struct ServiceContext {
    /// Clock deciding whether a resolution is recent.
    pub clock: Box<dyn Clock>,
    /// Issue tracker holding the alert issues.
    pub tracker: Box<dyn IssueTracker>,
    /// Optional cassette recorder; written to disk on drop.
    recorder: Option<SharedRecorder>,
    /// Cassette replayer when replaying.
    replayer: Option<SharedReplayer>,
}

impl ServiceContext {
    /// Creates a live context talking to the receiver's JIRA instance.
    #[must_use]
    pub fn live(config: &ReceiverConfig) -> Self {
        Self::from_parts(Box::new(LiveClock), Box::new(JiraClient::from_config(config)))
    }

    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn from_parts(clock: Box<dyn Clock>, tracker: Box<dyn IssueTracker>) -> Self {
        Self { clock, tracker, recorder: None, replayer: None }
    }

    /// Creates a live context that records every port call.
    ///
    /// The cassette is written to `path` when the context is dropped.
    #[must_use]
    pub fn recording(path: &Path, config: &ReceiverConfig) -> Self {
        let recorder: SharedRecorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            "ticketeer-notify",
            config.name.clone(),
        )));
        Self {
            clock: Box::new(RecordingClock::new(Box::new(LiveClock), Arc::clone(&recorder))),
            tracker: Box::new(RecordingTracker::new(
                Box::new(JiraClient::from_config(config)),
                Arc::clone(&recorder),
            )),
            recorder: Some(recorder),
            replayer: None,
        }
    }

    /// Creates a context that answers every port call from a cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        let replayer: SharedReplayer = Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));
        Ok(Self {
            clock: Box::new(ReplayingClock::new(Arc::clone(&replayer))),
            tracker: Box::new(ReplayingTracker::new(Arc::clone(&replayer))),
            recorder: None,
            replayer: Some(replayer),
        })
    }

    /// Recorded interactions a replaying context has not served yet.
    ///
    /// Always zero for live and recording contexts.
    #[must_use]
    pub fn unreplayed(&self) -> usize {
        self.replayer.as_ref().map_or(0, |replayer| {
            replayer.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remaining()
        })
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let written = match recorder.lock() {
            Ok(guard) => guard.write(),
            Err(poisoned) => poisoned.into_inner().write(),
        };
        match written {
            Ok(path) => tracing::info!(path = %path.display(), "cassette written"),
            Err(e) => tracing::warn!(error = %e, "failed to write cassette"),
        }
    }
}
