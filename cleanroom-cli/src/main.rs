//! `cleanroom` binary.
//!
//! Usage:
//!   cleanroom encrypt people.csv --schema schema.json --id <UUID> \
//!       --collaboration-settings settings.json --output people.enc.csv
//!   cleanroom decrypt results.csv --schema schema.json --id <UUID> \
//!       --collaboration-settings settings.json --output results.clear.csv
//!
//! The shared secret is read from `CLEANROOM_SHARED_SECRET` (base64) unless
//! `--secret-env` names another variable.

use clap::Parser;
use cleanroom_cli::{execute, Cli};
use std::process::ExitCode;
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match execute(&cli.command) {
        Ok(report) => {
            if !report.failures.is_empty() {
                warn!(skipped = report.failures.len(), "rows were skipped");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
