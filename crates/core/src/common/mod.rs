//! Shared primitives used across the loader and the simulation engine.

pub mod error;
pub mod ident;
pub mod indexed_set;
