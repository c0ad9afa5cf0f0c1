//! Notification errors and tracker failure classification.

use tracing::debug;

use crate::ports::TrackerError;
use crate::template::RenderFailure;

/// Why a notification could not be reconciled.
///
/// Only [`NotifyError::is_retryable`] errors are worth resubmitting; every
/// other variant will fail the same way again.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A receiver template failed to render.
    #[error(transparent)]
    Render(#[from] RenderFailure),
    /// The tracker answered with a non-2xx status.
    #[error("JIRA request {url} returned status {status_line}, body {body:?}")]
    Rejected {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Status code and reason phrase.
        status_line: String,
        /// Response body, empty if unreadable.
        body: String,
    },
    /// The call failed without an error response.
    #[error("JIRA request {api} failed: {reason}")]
    Request {
        /// Tracker operation name.
        api: String,
        /// Underlying failure.
        reason: String,
    },
    /// The configured reopen transition is not available on the issue.
    #[error("JIRA state {state:?} does not exist or no transition possible for {key}")]
    MissingTransition {
        /// Configured transition name.
        state: String,
        /// Issue key.
        key: String,
    },
}

impl NotifyError {
    /// Whether the notification should be resubmitted later.
    ///
    /// True only for 500 and 503 responses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { status: 500 | 503, .. })
    }
}

/// Turns a failed tracker call into a [`NotifyError`].
///
/// A non-2xx response becomes [`NotifyError::Rejected`] with the URL, status
/// and body, which say more than the client's own message. Anything else
/// becomes [`NotifyError::Request`].
#[must_use]
pub fn classify(api: &str, err: TrackerError) -> NotifyError {
    match &err.response {
        Some(response) => debug!(api, error = %err, url = %response.url, "tracker call failed"),
        None => debug!(api, error = %err, "tracker call failed"),
    }

    match err.response {
        Some(response) if !response.is_success() => NotifyError::Rejected {
            status_line: response.status_line(),
            url: response.url,
            status: response.status,
            body: response.body,
        },
        _ => NotifyError::Request { api: api.to_string(), reason: err.message },
    }
}
