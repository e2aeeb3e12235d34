//! Notifier - per-organization notification broker
//!
//! Operator command line over the authorization engine.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

use commands::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("{}", error_line(&e));
        std::process::exit(1);
    }
}

/// What the operator sees; internal detail stays in the log
fn error_line(e: &notifier_core::Error) -> String {
    format!("Error [{}]: {}", e.kind().code(), e.public_message())
}
