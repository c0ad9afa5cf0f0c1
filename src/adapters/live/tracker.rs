//! Live adapter for the `IssueTracker` port using the JIRA REST API (v2).

use std::collections::BTreeMap;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ReceiverConfig;
use crate::ports::{
    ApiResponse, FieldValue, Issue, IssueDraft, IssueRef, IssueTracker, SearchOptions,
    TrackerError, Transition,
};

/// JIRA client authenticating with basic auth.
pub struct JiraClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl JiraClient {
    /// Creates a client for the given base URL.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Creates a client from a receiver's credentials.
    #[must_use]
    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self::new(&config.api_url, &config.user, &config.password)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, TrackerError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .map_err(|e| TrackerError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        // Body read is best-effort; the status alone still classifies.
        let body = response.text().unwrap_or_default();
        Err(TrackerError::with_response(
            format!("request failed with status {}", status.as_u16()),
            ApiResponse {
                url,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            },
        ))
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TrackerError> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response
            .text()
            .map_err(|e| TrackerError::transport(format!("failed to read response: {e}")))?;
        serde_json::from_str(&text).map_err(|e| {
            TrackerError::with_response(
                format!("failed to decode response: {e}"),
                ApiResponse {
                    url,
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                    body: text,
                },
            )
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<Transition>,
}

/// Named reference used for project, issue type, priority and components.
#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct ProjectRef<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct CreateFields<'a> {
    project: ProjectRef<'a>,
    issuetype: Named<'a>,
    summary: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Named<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<Named<'a>>,
    labels: &'a [String],
    #[serde(flatten)]
    custom: &'a BTreeMap<String, FieldValue>,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    fields: CreateFields<'a>,
}

impl<'a> CreateRequest<'a> {
    fn new(draft: &'a IssueDraft) -> Self {
        Self {
            fields: CreateFields {
                project: ProjectRef { key: &draft.project },
                issuetype: Named { name: &draft.issue_type },
                summary: &draft.summary,
                description: &draft.description,
                priority: draft.priority.as_deref().map(|name| Named { name }),
                components: draft.components.iter().map(|name| Named { name }).collect(),
                labels: &draft.labels,
                custom: &draft.custom_fields,
            },
        }
    }
}

impl IssueTracker for JiraClient {
    fn search(&self, jql: &str, options: &SearchOptions) -> Result<Vec<Issue>, TrackerError> {
        let max_results = options.max_results.to_string();
        let fields = options.fields.join(",");
        let request = self.client.get(self.url("search")).query(&[
            ("jql", jql),
            ("maxResults", max_results.as_str()),
            ("fields", fields.as_str()),
        ]);
        let response: SearchResponse = Self::decode(self.send(request)?)?;
        Ok(response.issues)
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError> {
        let request = self.client.get(self.url(&format!("issue/{key}/transitions")));
        let response: TransitionsResponse = Self::decode(self.send(request)?)?;
        Ok(response.transitions)
    }

    fn do_transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError> {
        let request = self
            .client
            .post(self.url(&format!("issue/{key}/transitions")))
            .json(&json!({ "transition": { "id": transition_id } }));
        self.send(request)?;
        Ok(())
    }

    fn create(&self, draft: &IssueDraft) -> Result<IssueRef, TrackerError> {
        let request = self.client.post(self.url("issue")).json(&CreateRequest::new(draft));
        let created: Value = Self::decode(self.send(request)?)?;
        let field = |name: &str| created.get(name).and_then(Value::as_str).map(str::to_string);
        match (field("id"), field("key")) {
            (Some(id), Some(key)) => Ok(IssueRef { id, key }),
            _ => Err(TrackerError::transport(format!(
                "create response missing id or key: {created}"
            ))),
        }
    }
}
