//! Replaying adapters that answer port calls from a cassette.

pub mod clock;
pub mod tracker;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::replayer::CassetteReplayer;

pub use clock::ReplayingClock;
pub use tracker::ReplayingTracker;

/// Replayer shared by every replaying adapter of one run.
pub type SharedReplayer = Arc<Mutex<CassetteReplayer>>;

/// Takes the recorded output of the next `port::method` call.
///
/// # Panics
///
/// Panics when the cassette has no such interaction left.
pub(crate) fn next_output(replayer: &SharedReplayer, port: &str, method: &str) -> Value {
    let mut guard = replayer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.next_interaction(port, method).output
}

/// Decodes a recorded `{"Ok": ..}` / `{"Err": ..}` output.
///
/// # Panics
///
/// Panics when the output does not match the expected types.
pub(crate) fn replay_result<T, E>(port: &str, method: &str, output: Value) -> Result<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    let decode = |value: Value| -> Result<Result<T, E>, serde_json::Error> {
        if let Some(ok) = value.get("Ok") {
            return serde_json::from_value(ok.clone()).map(Ok);
        }
        if let Some(err) = value.get("Err") {
            return serde_json::from_value(err.clone()).map(Err);
        }
        Err(serde::de::Error::custom("expected an Ok or Err entry"))
    };
    decode(output).unwrap_or_else(|e| panic!("{port}::{method}: malformed cassette output: {e}"))
}
