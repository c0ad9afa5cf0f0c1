//! `ticketeer notify` command.

use std::env;
use std::io::Read;
use std::path::Path;

use crate::alert::Data;
use crate::config::{Config, ReceiverConfig};
use crate::context::ServiceContext;
use crate::notify::{NotifyError, Outcome, Receiver};
use crate::template::Template;

use super::CommandError;

/// When set, a live run records its tracker and clock calls to this cassette path.
pub const RECORD_ENV: &str = "TICKETEER_RECORD";

/// Execute the `notify` command.
///
/// # Errors
///
/// Returns [`CommandError::Retryable`] when the tracker failed transiently and
/// [`CommandError::Failed`] for everything else.
pub fn run(
    config_path: &Path,
    receiver: Option<&str>,
    payload: &str,
    replay: Option<&Path>,
) -> Result<(), CommandError> {
    let config = Config::load(config_path).map_err(|e| e.to_string())?;
    let template = config.load_template().map_err(|e| e.to_string())?;
    let data = read_payload(payload)?;
    let receiver_config = select_receiver(&config, receiver, &data)?;

    let ctx = match replay {
        Some(path) => ServiceContext::replaying(path)?,
        None => match env::var(RECORD_ENV) {
            Ok(path) => ServiceContext::recording(Path::new(&path), receiver_config),
            Err(_) => ServiceContext::live(receiver_config),
        },
    };

    let result = execute(receiver_config, &template, &ctx, &data);
    let unreplayed = ctx.unreplayed();
    if unreplayed > 0 {
        tracing::warn!(unreplayed, "run ended before the cassette was fully replayed");
    }
    println!("{}", result?);
    Ok(())
}

/// Runs one notification against an already wired context.
///
/// # Errors
///
/// Returns the notification failure mapped to its exit class.
pub fn execute(
    config: &ReceiverConfig,
    template: &Template,
    ctx: &ServiceContext,
    data: &Data,
) -> Result<Outcome, CommandError> {
    Receiver::new(config, template, ctx).notify(data).map_err(into_command_error)
}

fn into_command_error(err: NotifyError) -> CommandError {
    if err.is_retryable() {
        CommandError::Retryable(err.to_string())
    } else {
        CommandError::Failed(err.to_string())
    }
}

fn read_payload(source: &str) -> Result<Data, String> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read payload from stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| format!("Failed to read payload file {source}: {e}"))?
    };
    parse_payload(&content)
}

fn parse_payload(content: &str) -> Result<Data, String> {
    serde_json::from_str(content).map_err(|e| format!("Invalid notification payload: {e}"))
}

fn select_receiver<'a>(
    config: &'a Config,
    requested: Option<&str>,
    data: &Data,
) -> Result<&'a ReceiverConfig, String> {
    let name = requested.unwrap_or(&data.receiver);
    if name.is_empty() {
        return Err("No receiver given and the payload names none".to_string());
    }
    config.receiver(name).ok_or_else(|| {
        let known: Vec<&str> = config.receivers.iter().map(|r| r.name.as_str()).collect();
        format!("Unknown receiver {name:?}. Configured: [{}]", known.join(", "))
    })
}
