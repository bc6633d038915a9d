//! Error taxonomy for processor loading and pipeline simulation.
//!
//! Every fallible step in [`crate::loader`] and [`crate::sim`] returns one
//! of these two enums rather than a bare string or a dynamic error object,
//! so callers can match on failure kind.

use crate::common::ident::ICaseString;
use thiserror::Error;

/// The kind of lock a [`PathLock`](LoaderError::PathLock) violation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// A read-register lock.
    Read,
    /// A write-register lock.
    Write,
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// The kind of element a [`DupElem`](LoaderError::DupElem) or
/// [`UndefElem`](LoaderError::UndefElem) violation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    /// A functional unit name.
    Unit,
    /// A capability name.
    Capability,
}

impl std::fmt::Display for ElemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit => f.write_str("unit"),
            Self::Capability => f.write_str("capability"),
        }
    }
}

/// Errors raised while loading and validating a processor description.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoaderError {
    /// A unit's declared width was not positive.
    #[error("unit '{unit}' has non-positive width {width}")]
    BadWidth {
        /// The offending unit.
        unit: ICaseString,
        /// The declared width.
        width: i64,
    },

    /// A `dataPath` entry did not have exactly two endpoints.
    #[error("edge {edge:?} does not have exactly two endpoints")]
    BadEdge {
        /// The raw endpoint list that failed the arity check.
        edge: Vec<String>,
    },

    /// An edge or memory-access entry referenced an undefined element.
    #[error("{kind} '{name}' was never defined")]
    UndefElem {
        /// Whether the undefined reference was a unit or a capability.
        kind: ElemKind,
        /// The undefined name.
        name: ICaseString,
    },

    /// The same unit or capability name was declared twice (case-folded).
    #[error("'{new_elem}' duplicates previously defined '{old_elem}'")]
    DupElem {
        /// The element already registered.
        old_elem: ICaseString,
        /// The element just discovered, colliding under case-folding.
        new_elem: ICaseString,
    },

    /// The unit graph contains a cycle.
    #[error("processor unit graph contains a cycle")]
    NotDAG,

    /// After optimization, no input ports remain.
    #[error("processor has no input ports after optimization")]
    EmptyProc,

    /// An originally defined input port lost its path to every output.
    #[error("input port '{port}' has no path to any output after optimization")]
    DeadInput {
        /// The dead input port.
        port: ICaseString,
    },

    /// A capability cannot flow from an input port to any output with
    /// nonzero width.
    #[error("capability '{capability}' is blocked from port '{port}'")]
    BlockedCap {
        /// The blocked capability.
        capability: ICaseString,
        /// The input port from which it cannot flow.
        port: ICaseString,
    },

    /// A single-capability path carries more than one lock of a kind, or
    /// sibling paths at a branch disagree, or a required lock count along
    /// an input-port path was not exactly one.
    #[error("path starting at '{start}' has a {lock_type} lock conflict for capability '{capability}'")]
    PathLock {
        /// The unit at which the offending path begins.
        start: ICaseString,
        /// Which lock kind is in conflict.
        lock_type: LockKind,
        /// The capability the path was computed for.
        capability: ICaseString,
    },
}

/// Errors raised while compiling a program or simulating it on a loaded
/// processor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// An instruction line could not be parsed: a missing operand, an
    /// empty operand, or an unrecognized mnemonic.
    #[error("line {line}: {reason}")]
    CodeError {
        /// 1-based source line number.
        line: usize,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A simulation cycle reproduced the previous snapshot exactly while
    /// instructions remained to be issued or in flight.
    #[error("simulation deadlocked at cycle {cycle}: no progress was made")]
    Stall {
        /// The cycle at which no progress occurred.
        cycle: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{ElemKind, LoaderError};
    use crate::common::ident::ICaseString;

    #[test]
    fn bad_width_message_names_unit_and_width() {
        let err = LoaderError::BadWidth {
            unit: ICaseString::from("core1"),
            width: -1,
        };
        assert_eq!(err.to_string(), "unit 'core1' has non-positive width -1");
    }

    #[test]
    fn undef_elem_reports_kind() {
        let err = LoaderError::UndefElem {
            kind: ElemKind::Capability,
            name: ICaseString::from("FMA"),
        };
        assert_eq!(err.to_string(), "capability 'FMA' was never defined");
    }
}
