//! The format-neutral shape of a processor description as the loader
//! receives it.
//!
//! These types carry `serde::Deserialize` derives so that a driver crate
//! can parse them directly out of YAML (or any other `serde` format)
//! without this crate taking a dependency on a specific format. Nothing
//! here performs validation beyond what `serde` does structurally; all
//! semantic checks (width positivity, duplicate names, edge arity, ...)
//! happen in [`crate::loader::graph`].

use serde::Deserialize;

/// A capability entry, in either its plain form or the legacy
/// memory-access-annotated record form.
///
/// A legacy entry normalizes into the unit's top-level `memory_access`
/// list by the caller (see [`RawUnit::normalized_capabilities`]) rather
/// than at deserialization time, so that a unit's `capabilities` sequence
/// may freely mix bare strings and legacy records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCapability {
    /// `"ALU"` — a bare capability name.
    Bare(String),
    /// `{name: "MEM", memoryAccess: true}` — the legacy record form.
    Legacy {
        /// The capability name.
        name: String,
        /// Whether this capability requires the shared memory resource.
        #[serde(rename = "memoryAccess")]
        memory_access: bool,
    },
}

/// One unit record as it appears under the top-level `units` sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUnit {
    /// The unit's name.
    pub name: String,
    /// The unit's declared width; stored as a signed integer so an
    /// out-of-range (non-positive) value can be reported rather than
    /// rejected at the parsing layer.
    pub width: i64,
    /// The unit's capabilities, in either bare or legacy form.
    pub capabilities: Vec<RawCapability>,
    /// Whether this unit requires a read lock on entry. Defaults to
    /// `false` when absent.
    #[serde(rename = "readLock", default)]
    pub read_lock: bool,
    /// Whether this unit requires a write lock on entry. Defaults to
    /// `false` when absent.
    #[serde(rename = "writeLock", default)]
    pub write_lock: bool,
    /// Capabilities requiring the shared memory resource, given in the
    /// non-legacy top-level form. Defaults to empty when absent.
    #[serde(rename = "memoryAccess", default)]
    pub memory_access: Vec<String>,
}

impl RawUnit {
    /// Splits `capabilities` into plain capability names and the
    /// memory-access names implied by legacy records, merging the latter
    /// into a copy of `memory_access`.
    ///
    /// # Returns
    ///
    /// `(capability_names, memory_access_names)`.
    #[must_use]
    pub fn normalized_capabilities(&self) -> (Vec<String>, Vec<String>) {
        let mut names = Vec::with_capacity(self.capabilities.len());
        let mut mem_access = self.memory_access.clone();
        for cap in &self.capabilities {
            match cap {
                RawCapability::Bare(name) => names.push(name.clone()),
                RawCapability::Legacy { name, memory_access } => {
                    names.push(name.clone());
                    if *memory_access {
                        mem_access.push(name.clone());
                    }
                }
            }
        }
        (names, mem_access)
    }
}

/// The full raw processor description: unit records plus the edges
/// connecting them.
///
/// `data_path` entries are kept as variable-length string vectors (rather
/// than a fixed 2-tuple) specifically so a malformed edge with an
/// unexpected arity can be reported as [`crate::common::error::LoaderError::BadEdge`]
/// instead of failing deserialization itself.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProcessorDesc {
    /// The processor's functional units.
    pub units: Vec<RawUnit>,
    /// Directed edges between unit names.
    #[serde(rename = "dataPath")]
    pub data_path: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::{RawCapability, RawUnit};

    #[test]
    fn legacy_capability_feeds_memory_access() {
        let unit = RawUnit {
            name: "lsu".to_string(),
            width: 1,
            capabilities: vec![
                RawCapability::Bare("ALU".to_string()),
                RawCapability::Legacy {
                    name: "MEM".to_string(),
                    memory_access: true,
                },
            ],
            read_lock: false,
            write_lock: false,
            memory_access: Vec::new(),
        };
        let (names, mem_access) = unit.normalized_capabilities();
        assert_eq!(names, vec!["ALU", "MEM"]);
        assert_eq!(mem_access, vec!["MEM"]);
    }

    #[test]
    fn explicit_memory_access_is_preserved_alongside_legacy() {
        let unit = RawUnit {
            name: "lsu".to_string(),
            width: 1,
            capabilities: vec![RawCapability::Legacy {
                name: "MEM".to_string(),
                memory_access: true,
            }],
            read_lock: false,
            write_lock: false,
            memory_access: vec!["ALU".to_string()],
        };
        let (_, mem_access) = unit.normalized_capabilities();
        assert_eq!(mem_access, vec!["ALU", "MEM"]);
    }
}
