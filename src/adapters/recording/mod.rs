//! Recording adapters that capture interactions to cassettes.

pub mod clock;
pub mod tracker;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::recorder::CassetteRecorder;

pub use clock::RecordingClock;
pub use tracker::RecordingTracker;

/// Recorder shared by every recording adapter of one run.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "unserializable": e.to_string() }))
}

/// Records a plain (non-`Result`) interaction.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let (input, output) = (to_value(input), to_value(output));
    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input, output),
        Err(_) => tracing::warn!(port, method, "cassette recorder poisoned, interaction dropped"),
    }
}

/// Records a `Result` as `{"Ok": value}` or `{"Err": error}`.
///
/// Errors are stored structurally so a replay can classify them exactly as
/// the live run did.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let output = match result {
        Ok(v) => json!({ "Ok": to_value(v) }),
        Err(e) => json!({ "Err": to_value(e) }),
    };
    record_interaction(recorder, port, method, input, &output);
}
