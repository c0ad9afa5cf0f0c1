//! Group identity and issue label derivation.

use super::Kv;

/// The configured label key is not among the group labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("label key {key:?} not found in group labels")]
pub struct LabelNotFound {
    /// The label name that was looked up.
    pub key: String,
}

/// Renders group labels as an `ALERT{name="value",...}` string with all
/// spaces removed.
///
/// Pairs are emitted in name order, so the result depends only on the label
/// set. This string is what ties an alert group to its issue.
#[must_use]
pub fn group_id(group_labels: &Kv) -> String {
    let pairs = group_labels
        .sorted_pairs()
        .iter()
        .map(|pair| format!("{}={:?}", pair.name, pair.value))
        .collect::<Vec<_>>()
        .join(",");
    format!("ALERT{{{pairs}}}").replace(' ', "")
}

/// Extracts the one group label used as the human-facing issue label.
///
/// # Errors
///
/// Returns [`LabelNotFound`] when `label_key` is not a group label.
pub fn issue_label(label_key: &str, group_labels: &Kv) -> Result<String, LabelNotFound> {
    group_labels
        .get(label_key)
        .map(str::to_string)
        .ok_or_else(|| LabelNotFound { key: label_key.to_string() })
}
