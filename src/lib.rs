//! Core library entry for the `ticketeer` CLI.
//!
//! `ticketeer` reconciles Alertmanager notifications against JIRA: each alert
//! group owns one issue, which is left alone while open, reopened when it was
//! resolved recently, and replaced by a new issue otherwise.

pub mod adapters;
pub mod alert;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod notify;
pub mod ports;
pub mod template;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::CommandError;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), CommandError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string().into()),
    };
    init_tracing(cli.log_level.as_deref());
    commands::dispatch(&cli.command)
}

/// Installs a stderr log subscriber.
///
/// `directive` wins over `RUST_LOG`; without either, `info` and above are shown.
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(directive: Option<&str>) {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = match directive {
        Some(directive) => builder.parse_lossy(directive),
        None => builder.from_env_lossy(),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
