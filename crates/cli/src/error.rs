//! The driver's single error type: every way `run` can fail, collapsed
//! into one enum so `main` has exactly one thing to `Display` and one
//! exit path.

use procsim_core::common::error::{LoaderError, SimError};
use thiserror::Error;

/// Anything that can go wrong loading a processor, compiling a program,
/// or simulating it.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The processor description or program file could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The hardware description YAML could not be parsed.
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The processor description failed validation.
    #[error("{0}")]
    Loader(#[from] LoaderError),

    /// The program failed to compile or the simulation could not
    /// complete.
    #[error("{0}")]
    Sim(#[from] SimError),
}
