//! Cassette file layout.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call made through a port, with what went in and what came out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the whole recording, assigned by the recorder.
    pub seq: u64,
    /// Port name (`tracker`, `clock`).
    pub port: String,
    /// Port method, e.g. `search`.
    pub method: String,
    /// Call arguments.
    pub input: serde_json::Value,
    /// Return value; results use `{"Ok": ..}` / `{"Err": ..}`.
    pub output: serde_json::Value,
}

/// A recorded notification run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name.
    pub name: String,
    /// When the run was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Receiver the run was recorded for.
    #[serde(default)]
    pub receiver: String,
    /// Interactions in call order.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a YAML cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }
}
