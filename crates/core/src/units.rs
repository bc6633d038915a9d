//! The processor's structural building blocks: capabilities, lock
//! attributes, unit models, and functional units as they appear in a
//! validated [`crate::loader::ProcessorDesc`].

use std::collections::HashSet;
use std::rc::Rc;

use crate::common::ident::ICaseString;

/// A named class of instructions a unit can execute (e.g. `ALU`, `MEM`).
pub type Capability = ICaseString;

/// Register-lock attributes of a unit.
///
/// `rd_lock` requires instructions entering the unit to have already
/// acquired read tokens for their source registers; `wr_lock` is the same
/// for the destination register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockInfo {
    /// Whether this unit requires a read lock on entry.
    pub rd_lock: bool,
    /// Whether this unit requires a write lock on entry.
    pub wr_lock: bool,
}

/// The static description of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitModel {
    /// The unit's name, unique case-insensitively across the processor.
    pub name: ICaseString,
    /// Maximum number of in-flight instructions this unit can hold.
    pub width: u64,
    /// The set of capabilities this unit can execute.
    pub capabilities: HashSet<Capability>,
    /// Register-lock attributes.
    pub lock_info: LockInfo,
    /// The subset of `capabilities` that require the single shared memory
    /// resource; always a subset of `capabilities`.
    pub mem_acl: HashSet<Capability>,
}

impl UnitModel {
    /// Returns `true` if this unit can execute instructions of capability
    /// `cap`.
    #[must_use]
    pub fn supports(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns `true` if executing capability `cap` on this unit requires
    /// the shared memory resource.
    #[must_use]
    pub fn needs_mem(&self, cap: &Capability) -> bool {
        self.mem_acl.contains(cap)
    }

    /// Returns `true` if a unit currently hosting `occupancy` instructions
    /// has no room left for another.
    #[must_use]
    pub fn is_full(&self, occupancy: usize) -> bool {
        u64::try_from(occupancy).is_ok_and(|n| n >= self.width)
    }
}

/// A functional unit as it appears inside a validated processor: a model
/// plus its direct predecessors.
///
/// Predecessors are kept as `Rc<UnitModel>` handles rather than plain
/// values so that equality between `FuncUnit`s can require *reference*
/// identity of predecessors, not merely value equality — two functional
/// units reachable via structurally identical but distinct predecessor
/// unit records are not the same `FuncUnit`. The loader itself builds the
/// graph over plain arena indices (see [`crate::loader::graph`]) and only
/// resolves indices into these `Rc` handles once the graph is fully
/// validated.
#[derive(Debug, Clone)]
pub struct FuncUnit {
    /// This unit's own model.
    pub model: Rc<UnitModel>,
    /// Direct predecessors, sorted by model name for determinism.
    pub predecessors: Vec<Rc<UnitModel>>,
}

impl PartialEq for FuncUnit {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.predecessors.len() == other.predecessors.len()
            && self
                .predecessors
                .iter()
                .zip(other.predecessors.iter())
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

impl Eq for FuncUnit {}

#[cfg(test)]
mod tests {
    use super::{FuncUnit, LockInfo, UnitModel};
    use std::collections::HashSet;
    use std::rc::Rc;

    fn model(name: &str) -> Rc<UnitModel> {
        Rc::new(UnitModel {
            name: name.into(),
            width: 1,
            capabilities: HashSet::from(["ALU".into()]),
            lock_info: LockInfo::default(),
            mem_acl: HashSet::new(),
        })
    }

    #[test]
    fn func_units_with_identical_but_distinct_predecessors_are_unequal() {
        let shared_model = model("out");
        let pred_a = model("in");
        let pred_b = model("in"); // distinct Rc, same contents

        let a = FuncUnit {
            model: Rc::clone(&shared_model),
            predecessors: vec![pred_a.clone()],
        };
        let b = FuncUnit {
            model: Rc::clone(&shared_model),
            predecessors: vec![pred_b],
        };
        assert_ne!(a, b);

        let c = FuncUnit {
            model: shared_model,
            predecessors: vec![pred_a],
        };
        assert_eq!(a, c);
    }

    #[test]
    fn supports_and_needs_mem() {
        let u = UnitModel {
            name: "lsu".into(),
            width: 2,
            capabilities: HashSet::from(["MEM".into(), "ALU".into()]),
            lock_info: LockInfo::default(),
            mem_acl: HashSet::from(["MEM".into()]),
        };
        assert!(u.supports(&"ALU".into()));
        assert!(!u.supports(&"FPU".into()));
        assert!(u.needs_mem(&"MEM".into()));
        assert!(!u.needs_mem(&"ALU".into()));
    }
}
