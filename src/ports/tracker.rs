//! Issue tracker port: the subset of the JIRA API the reconciler consumes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status category key JIRA uses for resolved issues. The set of categories
/// is fixed by JIRA, unlike status names.
pub const DONE_CATEGORY: &str = "done";

/// Options narrowing a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Upper bound on the number of issues returned.
    pub max_results: u32,
    /// Issue fields to fetch.
    pub fields: Vec<String>,
}

/// Category of an issue status (`new`, `indeterminate`, `done`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCategory {
    /// Stable category key.
    pub key: String,
}

/// Workflow status of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Display name, e.g. "In Progress".
    #[serde(default)]
    pub name: String,
    /// Category the status belongs to.
    #[serde(default)]
    pub status_category: StatusCategory,
}

/// How an issue was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolution name, e.g. "Fixed" or "Won't Fix".
    pub name: String,
}

/// Fields fetched for a searched issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    /// One-line summary.
    #[serde(default)]
    pub summary: String,
    /// Current workflow status.
    #[serde(default)]
    pub status: Status,
    /// Resolution, absent while unresolved.
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// When the issue was resolved.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub resolutiondate: Option<DateTime<Utc>>,
}

/// An existing issue, as returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Numeric id, as a string.
    pub id: String,
    /// Human key, e.g. `AB-12`.
    pub key: String,
    /// Requested fields.
    #[serde(default)]
    pub fields: IssueFields,
}

impl Issue {
    /// Whether the issue's status is in the "done" category.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.fields.status.status_category.key == DONE_CATEGORY
    }

    /// Name of the resolution, if any.
    #[must_use]
    pub fn resolution_name(&self) -> Option<&str> {
        self.fields.resolution.as_ref().map(|r| r.name.as_str())
    }
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition id to pass back when executing it.
    pub id: String,
    /// Transition name, e.g. "Reopen".
    pub name: String,
}

/// A custom field value. JIRA accepts many shapes; these are the ones the
/// reconciler writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A single string.
    Text(String),
    /// A list of strings.
    List(Vec<String>),
}

/// A new issue to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    /// Project key.
    pub project: String,
    /// Issue type name.
    pub issue_type: String,
    /// One-line summary.
    pub summary: String,
    /// Body text.
    pub description: String,
    /// Priority name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Component names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Issue labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Custom field id to value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, FieldValue>,
}

/// Identity assigned by the tracker to a created issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Numeric id, as a string.
    pub id: String,
    /// Human key, e.g. `AB-13`.
    pub key: String,
}

/// The HTTP response captured from a failed tracker call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Request URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase, e.g. "Service Unavailable".
    #[serde(default)]
    pub reason: String,
    /// Response body; empty when it could not be read.
    #[serde(default)]
    pub body: String,
}

impl ApiResponse {
    /// Status line in the form `503 Service Unavailable`.
    #[must_use]
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }
}

/// A failed tracker call.
///
/// `response` is present when the server answered; it is absent for
/// transport failures where no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct TrackerError {
    /// Description of the underlying failure.
    pub message: String,
    /// The response, if one was received.
    #[serde(default)]
    pub response: Option<ApiResponse>,
}

impl TrackerError {
    /// A failure with no response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self { message: message.into(), response: None }
    }

    /// A failure carrying the server's response.
    pub fn with_response(message: impl Into<String>, response: ApiResponse) -> Self {
        Self { message: message.into(), response: Some(response) }
    }
}

/// Manages issues in a remote tracker.
///
/// Calls are blocking. Timeouts and cancellation belong to the
/// implementation's transport.
pub trait IssueTracker: Send + Sync {
    /// Runs a JQL search.
    ///
    /// # Errors
    ///
    /// Returns an error if the search request fails.
    fn search(&self, jql: &str, options: &SearchOptions) -> Result<Vec<Issue>, TrackerError>;

    /// Lists transitions currently possible for an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be read.
    fn transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError>;

    /// Executes a transition on an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is rejected.
    fn do_transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError>;

    /// Creates an issue and returns its assigned identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be created.
    fn create(&self, draft: &IssueDraft) -> Result<IssueRef, TrackerError>;
}

/// Accepts JIRA's `2024-01-02T03:04:05.000+0000` as well as RFC 3339.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}
