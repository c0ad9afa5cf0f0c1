//! Binary entrypoint for the `ticketeer` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine; real deployments pass the environment directly.
    let _ = dotenvy::dotenv();

    match ticketeer::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
