//! `ticketeer check-config` command.

use std::path::Path;

use crate::config::{Config, ReceiverConfig};

use super::CommandError;

/// Execute the `check-config` command.
///
/// # Errors
///
/// Returns an error if the configuration or its template is invalid.
pub fn run(path: &Path) -> Result<(), CommandError> {
    let config = Config::load(path).map_err(|e| e.to_string())?;
    config.load_template().map_err(|e| e.to_string())?;
    for receiver in &config.receivers {
        println!("{}", summarize(receiver));
    }
    Ok(())
}

fn summarize(receiver: &ReceiverConfig) -> String {
    format!(
        "{}\tproject={}\tapi_url={}\treopen_state={:?}\treopen_duration={}",
        receiver.name,
        receiver.project,
        receiver.api_url,
        receiver.reopen_state,
        humantime::format_duration(receiver.reopen_duration),
    )
}
