//! Candidate gathering and instruction movement for the downstream sweep.
//!
//! Every destination visited during a cycle's sweep (an output boundary, or
//! a functional unit pulling from its predecessors) shares the same shape:
//! gather candidates from one or more donor units, pick as many as fit, and
//! let the caller clear them from their old hosts afterward.

use crate::common::ident::ICaseString;
use crate::program::HwInstruction;
use crate::sim::{InstrState, StallState, Utilization};
use crate::units::FuncUnit;

/// An instruction as found resident in one of its donor units, identified
/// by that unit's name and its position within that unit's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostedInstr {
    /// The donor unit currently hosting the instruction.
    pub host: ICaseString,
    /// The instruction's index within `host`'s utilization list.
    pub index_in_host: usize,
}

/// The outcome of filling one destination: which instructions moved, and
/// whether any of them required the shared memory resource.
#[derive(Debug, Clone, Default)]
pub struct InstrMovStatus {
    /// Instructions pulled from their donors this sweep step, in the order
    /// they were accepted.
    pub moved: Vec<HostedInstr>,
    /// Whether any accepted instruction needed the shared memory resource.
    pub mem_used: bool,
}

/// Gathers every instruction in `donors` whose stall state is not DATA and
/// for which `accepts` holds, in donor order and then index-within-donor
/// order.
fn candidates(
    donors: impl Iterator<Item = ICaseString>,
    util: &Utilization,
    accepts: impl Fn(usize) -> bool,
) -> Vec<HostedInstr> {
    let mut found = Vec::new();
    for donor in donors {
        for (index_in_host, state) in util.unit(&donor).iter().enumerate() {
            if state.stalled != StallState::Data && accepts(state.instr) {
                found.push(HostedInstr {
                    host: donor.clone(),
                    index_in_host,
                });
            }
        }
    }
    found
}

/// Fills `unit` from its predecessors, moving in as many capability-
/// matching, non-DATA-stalled candidates (earliest program index first) as
/// fit within its width, honoring memory exclusivity against `mem_busy`.
pub fn fill_unit(
    unit: &FuncUnit,
    program: &[HwInstruction],
    mem_busy: bool,
    util: &mut Utilization,
) -> InstrMovStatus {
    let mut candidates = candidates(
        unit.predecessors.iter().map(|pred| pred.name.clone()),
        util,
        |instr| unit.model.supports(&program[instr].categ),
    );
    candidates.sort_by_key(|candid| util.unit(&candid.host)[candid.index_in_host].instr);

    let mut mov_res = InstrMovStatus::default();
    let mut candidates = candidates.into_iter();
    loop {
        if unit.model.is_full(util.unit(&unit.model.name).len()) {
            break;
        }
        let Some(candid) = candidates.next() else {
            break;
        };

        let instr_index = util.unit(&candid.host)[candid.index_in_host].instr;
        let mem_access = unit.model.needs_mem(&program[instr_index].categ);
        if (mem_busy || mov_res.mem_used) && mem_access {
            continue;
        }
        if mem_access {
            mov_res.mem_used = true;
        }

        util.unit_mut(&candid.host)[candid.index_in_host].stalled = StallState::NoStall;
        let state = util.unit(&candid.host)[candid.index_in_host];
        util.unit_mut(&unit.model.name).push(state);
        mov_res.moved.push(candid);
    }
    mov_res
}

/// Removes every moved instruction from its old host, in descending
/// index-within-host order so earlier indices stay valid as later ones are
/// removed.
pub fn clear_src_units(moved: &[HostedInstr], util: &mut Utilization) {
    let mut moved: Vec<HostedInstr> = moved.to_vec();
    moved.sort_by_key(|h| std::cmp::Reverse(h.index_in_host));
    for hosted in moved {
        let _ = util.unit_mut(&hosted.host).remove(hosted.index_in_host);
    }
}

#[cfg(test)]
mod tests {
    use super::{clear_src_units, fill_unit};
    use crate::program::HwInstruction;
    use crate::sim::{InstrState, Utilization};
    use crate::units::{FuncUnit, LockInfo, UnitModel};
    use std::collections::HashSet;
    use std::rc::Rc;

    fn model(name: &str, width: u64, caps: &[&str]) -> Rc<UnitModel> {
        Rc::new(UnitModel {
            name: name.into(),
            width,
            capabilities: caps.iter().map(|c| (*c).into()).collect(),
            lock_info: LockInfo::default(),
            mem_acl: HashSet::new(),
        })
    }

    fn instr(categ: &str) -> HwInstruction {
        HwInstruction::new([], "dst".into(), categ.into())
    }

    #[test]
    fn fill_unit_moves_earliest_candidate_first_and_respects_width() {
        let pred = model("pred", 4, &["ALU"]);
        let unit = FuncUnit {
            model: model("exec", 1, &["ALU"]),
            predecessors: vec![pred.clone()],
        };
        let program = vec![instr("ALU"), instr("ALU")];
        let mut util = Utilization::default();
        util.unit_mut(&pred.name)
            .extend([InstrState::new(1), InstrState::new(0)]);

        let mov_res = fill_unit(&unit, &program, false, &mut util);
        assert_eq!(mov_res.moved.len(), 1);
        assert_eq!(util.unit(&unit.model.name)[0].instr, 0);

        clear_src_units(&mov_res.moved, &mut util);
        assert_eq!(util.unit(&pred.name).len(), 1);
        assert_eq!(util.unit(&pred.name)[0].instr, 1);
    }

    #[test]
    fn fill_unit_skips_mismatched_capability() {
        let pred = model("pred", 2, &["ALU", "MEM"]);
        let unit = FuncUnit {
            model: model("exec", 1, &["ALU"]),
            predecessors: vec![pred.clone()],
        };
        let program = vec![instr("MEM")];
        let mut util = Utilization::default();
        util.unit_mut(&pred.name).push(InstrState::new(0));

        let mov_res = fill_unit(&unit, &program, false, &mut util);
        assert!(mov_res.moved.is_empty());
    }
}
