//! Command-line surface and display constants.

use std::path::PathBuf;

use clap::Parser;
use procsim_core::sim::StallState;

/// Cycle-accurate simulation of a user-described microprocessor pipeline.
#[derive(Parser, Debug)]
#[command(name = "procsim", author, version, about)]
pub struct Cli {
    /// Hardware description file (YAML): processor microarchitecture plus
    /// the ISA mnemonic-to-capability table.
    #[arg(long = "processor", value_name = "PROCESSORFILE")]
    pub processor: PathBuf,

    /// Assembly program file.
    #[arg(value_name = "PROGRAMFILE")]
    pub program: PathBuf,
}

/// Field separator used in the rendered utilization table.
pub const COLUMN_SEPARATOR: char = '\t';

/// Maps a stall classification to the single letter used in a rendered
/// table cell (`<letter>:<unit-name>`).
#[must_use]
pub fn stall_letter(stalled: StallState) -> char {
    match stalled {
        StallState::NoStall => 'U',
        StallState::Structural => 'S',
        StallState::Data => 'D',
    }
}
