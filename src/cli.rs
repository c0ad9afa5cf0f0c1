//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `ticketeer`.
#[derive(Debug, Parser)]
#[command(name = "ticketeer", version, about = "Reconcile alert groups with JIRA issues")]
pub struct Cli {
    /// Log filter directive, e.g. `debug` or `ticketeer=trace`. Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile one Alertmanager notification with its JIRA issue.
    Notify {
        /// Receiver configuration file.
        #[arg(long)]
        config: PathBuf,
        /// Receiver to notify; defaults to the payload's `receiver`.
        #[arg(long)]
        receiver: Option<String>,
        /// Notification payload file, `-` for stdin.
        #[arg(long, default_value = "-")]
        payload: String,
        /// Answer tracker and clock calls from a recorded cassette.
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Validate the configuration and template, then list receivers.
    CheckConfig {
        /// Receiver configuration file.
        #[arg(long)]
        config: PathBuf,
    },
}
