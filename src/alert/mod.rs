//! Alertmanager webhook payload model.
//!
//! Field names on the wire follow the Alertmanager webhook format, which is
//! also what templates see when they render.

pub mod group;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use group::{group_id, issue_label, LabelNotFound};

/// An ordered set of label (or annotation) name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kv(BTreeMap<String, String>);

/// A single label name/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    /// Label name.
    pub name: &'a str,
    /// Label value.
    pub value: &'a str,
}

impl Kv {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pairs sorted by name.
    #[must_use]
    pub fn sorted_pairs(&self) -> Vec<Pair<'_>> {
        self.0.iter().map(|(name, value)| Pair { name, value }).collect()
    }

    /// Looks up the value of one label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Sets a label, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Kv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One alert inside a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// `firing` or `resolved`.
    pub status: String,
    /// Alert labels.
    #[serde(default)]
    pub labels: Kv,
    /// Alert annotations.
    #[serde(default)]
    pub annotations: Kv,
    /// When the alert started firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert stopped firing, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Link back to the alert source.
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
}

/// A grouped notification as posted by Alertmanager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    /// Webhook payload version.
    #[serde(default)]
    pub version: String,
    /// Opaque key Alertmanager uses for the group.
    #[serde(default)]
    pub group_key: String,
    /// `firing` or `resolved`.
    #[serde(default)]
    pub status: String,
    /// Name of the receiver the notification is addressed to.
    #[serde(default)]
    pub receiver: String,
    /// Labels the alerts were grouped by.
    #[serde(default)]
    pub group_labels: Kv,
    /// Labels shared by every alert in the group.
    #[serde(default)]
    pub common_labels: Kv,
    /// Annotations shared by every alert in the group.
    #[serde(default)]
    pub common_annotations: Kv,
    /// Alertmanager's external URL.
    #[serde(default, rename = "externalURL")]
    pub external_url: String,
    /// The alerts in this group.
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Data {
    /// Creates a payload with only group labels set.
    #[must_use]
    pub fn with_group_labels(receiver: impl Into<String>, group_labels: Kv) -> Self {
        Self {
            version: "4".to_string(),
            group_key: String::new(),
            status: "firing".to_string(),
            receiver: receiver.into(),
            group_labels,
            common_labels: Kv::new(),
            common_annotations: Kv::new(),
            external_url: String::new(),
            alerts: Vec::new(),
        }
    }
}
