//! Processor description loading and cycle-accurate pipeline simulation.
//!
//! This crate has no notion of a command line or a file format: it takes a
//! [`loader::RawProcessorDesc`] and a slice of [`program::HwInstruction`]s
//! and produces the cycle-by-cycle [`sim::Utilization`] history. Parsing
//! YAML, assembly-like programs, and rendering results are all driver
//! concerns that live above this crate.

pub mod common;
pub mod loader;
pub mod program;
pub mod reg_access;
pub mod sim;
pub mod units;
