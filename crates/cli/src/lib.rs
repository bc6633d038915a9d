//! Driver library for the processor pipeline simulator: loads a hardware
//! description and a program, simulates them, and renders the result.
//!
//! This crate owns everything format-specific (YAML, assembly text, TSV
//! output) so that [`procsim_core`] itself never depends on a file
//! format or a terminal.

pub mod config;
pub mod error;
pub mod output;
pub mod program;
pub mod yaml;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use procsim_core::common::ident::ICaseString;
use procsim_core::loader::load_processor;
use procsim_core::sim::Simulator;

use error::DriverError;

/// Loads `processor_path` and `program_path`, simulates the compiled
/// program against the processor, and renders the result as a table of
/// cells (header row first).
///
/// # Errors
///
/// Returns [`DriverError`] if either file cannot be read, the hardware
/// description YAML cannot be parsed, the processor description fails
/// validation, the program fails to compile, or the simulation
/// deadlocks.
pub fn run(processor_path: &Path, program_path: &Path) -> Result<Vec<Vec<String>>, DriverError> {
    let hw_text = fs::read_to_string(processor_path)?;
    let hw_desc: yaml::RawHardwareDesc = serde_yaml::from_str(&hw_text)?;
    let desc = load_processor(&hw_desc.microarch)?;

    let isa: HashMap<String, ICaseString> = hw_desc
        .isa
        .into_iter()
        .map(|(mnemonic, categ)| (mnemonic.to_uppercase(), ICaseString::from(categ)))
        .collect();

    let prog_text = fs::read_to_string(program_path)?;
    let prog_instrs = program::read_program(&prog_text)?;
    let program = program::compile_program(&prog_instrs, &isa)?;

    let sim = Simulator::new(&desc);
    let util_tbl = sim.simulate(&program)?;

    Ok(output::render(program.len(), &util_tbl))
}
