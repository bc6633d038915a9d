//! Cycle-accurate pipeline simulator CLI.
//!
//! Parses a hardware description and a program, simulates the compiled
//! program against the described processor, and prints the resulting
//! utilization table as tab-separated values.

use std::process::ExitCode;

use clap::Parser;
use procsim_cli::config::{Cli, COLUMN_SEPARATOR};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| tracing_subscriber::EnvFilter::new("info"),
        ))
        .init();

    let cli = Cli::parse();
    match procsim_cli::run(&cli.processor, &cli.program) {
        Ok(rows) => {
            for row in rows {
                println!("{}", row.join(&COLUMN_SEPARATOR.to_string()));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
