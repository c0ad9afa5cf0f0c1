//! Command dispatch and handlers.

pub mod check_config;
pub mod notify;

use crate::cli::Command;

/// Exit status telling the caller to resubmit later (`EX_TEMPFAIL`).
pub const EXIT_RETRYABLE: u8 = 75;

/// A failed command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Resubmitting the same input will fail the same way.
    #[error("{0}")]
    Failed(String),
    /// A transient tracker failure; resubmitting may succeed.
    #[error("{0}")]
    Retryable(String),
}

impl CommandError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Failed(_) => 1,
            Self::Retryable(_) => EXIT_RETRYABLE,
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), CommandError> {
    match command {
        Command::Notify { config, receiver, payload, replay } => {
            notify::run(config, receiver.as_deref(), payload, replay.as_deref())
        }
        Command::CheckConfig { config } => check_config::run(config),
    }
}
