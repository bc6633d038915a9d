//! The pipeline simulation engine: per-cycle advancement of instructions
//! through a validated [`crate::loader::ProcessorDesc`].
//!
//! The engine owns no mutable state of its own between calls to
//! [`Simulator::simulate`]; everything it needs (the name-to-model map and
//! the capability-to-input-unit map) is derived once from the processor
//! description and reused across the whole run.

mod instr_sinks;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::instrument;

use crate::common::error::SimError;
use crate::common::ident::ICaseString;
use crate::loader::ProcessorDesc;
use crate::program::HwInstruction;
use crate::reg_access::{AccessType, RegAccPlanBuilder, RegAccessPlan};
use crate::units::{Capability, UnitModel};

/// An instruction's stall classification at the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallState {
    /// The instruction advanced normally this cycle.
    NoStall,
    /// The instruction is held back because its destination unit had no
    /// room to accept whatever it was itself trying to forward downstream.
    Structural,
    /// The instruction is held back by a register access conflict.
    Data,
}

/// An instruction's residency in a single unit at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrState {
    /// The instruction's index in the program.
    pub instr: usize,
    /// Its current stall classification.
    pub stalled: StallState,
}

impl InstrState {
    /// Creates a freshly issued, unstalled instruction state.
    #[must_use]
    pub fn new(instr: usize) -> Self {
        Self {
            instr,
            stalled: StallState::NoStall,
        }
    }
}

/// A single clock pulse's worth of unit occupancy.
///
/// Equality ignores units mapped to an empty list (a unit that happens to
/// have never been touched is indistinguishable from one with an explicit
/// empty entry) and is insensitive to the order of instructions within a
/// unit, since the deadlock check in [`Simulator::simulate`] must compare
/// snapshots as sets of resident instructions, not as literal storage.
#[derive(Debug, Clone, Default)]
pub struct Utilization {
    units: HashMap<ICaseString, Vec<InstrState>>,
}

impl Utilization {
    /// Returns the instructions resident in `name`, or an empty slice if
    /// `name` has none.
    #[must_use]
    pub fn unit(&self, name: &ICaseString) -> &[InstrState] {
        self.units.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns a mutable handle to `name`'s instruction list, creating an
    /// empty one if absent.
    pub fn unit_mut(&mut self, name: &ICaseString) -> &mut Vec<InstrState> {
        self.units.entry(name.clone()).or_default()
    }

    /// Iterates over every unit with at least one resident instruction.
    pub fn iter(&self) -> impl Iterator<Item = (&ICaseString, &Vec<InstrState>)> {
        self.units.iter().filter(|(_, v)| !v.is_empty())
    }

    /// Returns the names of every unit with at least one resident
    /// instruction, collected once so hazard annotation can mutate
    /// entries without holding a borrow of `self.units`.
    fn occupied_units(&self) -> Vec<ICaseString> {
        self.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl PartialEq for Utilization {
    fn eq(&self, other: &Self) -> bool {
        let sorted = |u: &Self| {
            let mut entries: Vec<(ICaseString, Vec<InstrState>)> = u
                .iter()
                .map(|(name, states)| {
                    let mut states = states.clone();
                    states.sort_by_key(|s| s.instr);
                    (name.clone(), states)
                })
                .collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            entries
        };
        sorted(self) == sorted(other)
    }
}

/// Builds the capability-to-input-unit map (input-side units, i.e. in-ports
/// and in-out-ports, sorted by name per capability) used to fill freshly
/// issued instructions.
fn build_cap_map(desc: &ProcessorDesc) -> HashMap<Capability, Vec<Rc<UnitModel>>> {
    let mut cap_map: HashMap<Capability, Vec<Rc<UnitModel>>> = HashMap::new();
    for unit in desc.in_ports.iter().chain(desc.in_out_ports.iter()) {
        for cap in &unit.capabilities {
            cap_map.entry(cap.clone()).or_default().push(Rc::clone(unit));
        }
    }
    for units in cap_map.values_mut() {
        units.sort_by(|a, b| a.name.cmp(&b.name));
    }
    cap_map
}

/// Builds the name-to-model map used to look up a unit's lock attributes
/// during hazard annotation.
fn build_name_map(desc: &ProcessorDesc) -> HashMap<ICaseString, Rc<UnitModel>> {
    desc.in_ports
        .iter()
        .chain(desc.in_out_ports.iter())
        .cloned()
        .chain(desc.out_ports.iter().map(|f| Rc::clone(&f.model)))
        .chain(desc.internal_units.iter().map(|f| Rc::clone(&f.model)))
        .map(|model| (model.name.clone(), model))
        .collect()
}

/// The names of every unit at the processor's output boundary: the
/// standalone in-out-ports and the out-ports' own models.
fn out_port_names(desc: &ProcessorDesc) -> Vec<ICaseString> {
    desc.in_out_ports
        .iter()
        .map(|m| m.name.clone())
        .chain(desc.out_ports.iter().map(|f| f.model.name.clone()))
        .collect()
}

/// Tracks how many instructions have entered and exited the pipeline.
#[derive(Debug, Default)]
struct IssueRecord {
    entered: usize,
    exited: usize,
}

impl IssueRecord {
    fn in_flight(&self) -> bool {
        self.exited < self.entered
    }
}

/// Runs programs against a single, fixed processor description.
#[derive(Debug)]
pub struct Simulator<'a> {
    desc: &'a ProcessorDesc,
    name_unit_map: HashMap<ICaseString, Rc<UnitModel>>,
    cap_map: HashMap<Capability, Vec<Rc<UnitModel>>>,
    out_ports: Vec<ICaseString>,
}

impl<'a> Simulator<'a> {
    /// Builds a simulator for `desc`, precomputing the lookup tables every
    /// cycle will need.
    #[must_use]
    pub fn new(desc: &'a ProcessorDesc) -> Self {
        Self {
            desc,
            name_unit_map: build_name_map(desc),
            cap_map: build_cap_map(desc),
            out_ports: out_port_names(desc),
        }
    }

    /// Runs `program` to completion, returning one [`Utilization`] snapshot
    /// per clock pulse.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Stall`] if a cycle reproduces the previous
    /// snapshot exactly while instructions remain to enter or to exit.
    pub fn simulate(&self, program: &[HwInstruction]) -> Result<Vec<Utilization>, SimError> {
        let mut plan = build_acc_plan(program);
        let mut issue_rec = IssueRecord::default();
        let mut util_tbl: Vec<Utilization> = Vec::new();

        while issue_rec.entered < program.len() || issue_rec.in_flight() {
            let cycle = util_tbl.len();
            let old = util_tbl.last().cloned().unwrap_or_default();
            let cp = self.run_cycle(cycle, program, &mut plan, &old, &mut issue_rec)?;
            if cp == old {
                return Err(SimError::Stall { cycle });
            }
            util_tbl.push(cp);
        }
        Ok(util_tbl)
    }

    #[instrument(skip(self, program, plan, old, issue_rec), fields(entered = issue_rec.entered, exited = issue_rec.exited))]
    fn run_cycle(
        &self,
        cycle: usize,
        program: &[HwInstruction],
        plan: &mut RegAccessPlan,
        old: &Utilization,
        issue_rec: &mut IssueRecord,
    ) -> Result<Utilization, SimError> {
        let mut cp = old.clone();

        for name in &self.out_ports {
            cp.unit_mut(name)
                .retain(|state| state.stalled != StallState::NoStall);
        }

        let mut mem_busy = false;
        for dst in self
            .desc
            .out_ports
            .iter()
            .chain(self.desc.internal_units.iter())
        {
            let mov_res = instr_sinks::fill_unit(dst, program, mem_busy, &mut cp);
            instr_sinks::clear_src_units(&mov_res.moved, &mut cp);
            if mov_res.mem_used {
                mem_busy = true;
            }
        }

        self.fill_inputs(program, &mut cp, issue_rec, &mut mem_busy);
        self.annotate_hazards(program, old, plan, &mut cp);

        issue_rec.exited += self
            .out_ports
            .iter()
            .map(|name| {
                cp.unit(name)
                    .iter()
                    .filter(|s| s.stalled == StallState::NoStall)
                    .count()
            })
            .sum::<usize>();

        Ok(cp)
    }

    fn fill_inputs(
        &self,
        program: &[HwInstruction],
        cp: &mut Utilization,
        issue_rec: &mut IssueRecord,
        mem_busy: &mut bool,
    ) {
        while issue_rec.entered < program.len() {
            let categ = &program[issue_rec.entered].categ;
            let Some(candidates) = self.cap_map.get(categ) else {
                break;
            };

            let mut accepted = false;
            for unit in candidates {
                if unit.is_full(cp.unit(&unit.name).len()) {
                    continue;
                }
                let mem_access = unit.needs_mem(categ);
                if *mem_busy && mem_access {
                    continue;
                }
                cp.unit_mut(&unit.name).push(InstrState::new(issue_rec.entered));
                if mem_access {
                    *mem_busy = true;
                }
                issue_rec.entered += 1;
                accepted = true;
                break;
            }
            if !accepted {
                break;
            }
        }
    }

    fn annotate_hazards(
        &self,
        program: &[HwInstruction],
        old: &Utilization,
        plan: &mut RegAccessPlan,
        cp: &mut Utilization,
    ) {
        let mut to_clear: Vec<(ICaseString, usize)> = Vec::new();

        for name in cp.occupied_units() {
            let Some(model) = self.name_unit_map.get(&name) else {
                continue;
            };
            let old_unit = old.unit(&name);

            for state in cp.unit_mut(&name) {
                let already_resident = old_unit
                    .iter()
                    .any(|s| s.instr == state.instr && s.stalled != StallState::Data);
                state.stalled = if already_resident {
                    StallState::Structural
                } else {
                    data_stall(model, state.instr, &program[state.instr], plan, &mut to_clear)
                };
            }
        }

        for (reg, instr) in to_clear {
            plan.dequeue(&reg, instr);
        }
    }
}

/// Checks whether `instr` may proceed in a unit with lock attributes
/// `model`, recording the register requests to dequeue if so.
fn data_stall(
    model: &UnitModel,
    instr_idx: usize,
    instr: &HwInstruction,
    plan: &RegAccessPlan,
    to_clear: &mut Vec<(ICaseString, usize)>,
) -> StallState {
    if model.lock_info.rd_lock
        && !instr
            .sources
            .iter()
            .all(|reg| plan.can_access(reg, AccessType::Read, instr_idx))
    {
        return StallState::Data;
    }
    if model.lock_info.wr_lock
        && !plan.can_access(&instr.destination, AccessType::Write, instr_idx)
    {
        return StallState::Data;
    }

    if model.lock_info.rd_lock {
        for reg in &instr.sources {
            to_clear.push((reg.clone(), instr_idx));
        }
    }
    if model.lock_info.wr_lock {
        to_clear.push((instr.destination.clone(), instr_idx));
    }
    StallState::NoStall
}

/// Builds the register access plan for an entire program up front: one
/// read request per source register, one write request per destination,
/// in program order.
fn build_acc_plan(program: &[HwInstruction]) -> RegAccessPlan {
    let mut builder = RegAccPlanBuilder::new();
    for (idx, instr) in program.iter().enumerate() {
        for reg in &instr.sources {
            builder.add_read(reg, idx);
        }
        builder.add_write(&instr.destination, idx);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::{InstrState, Simulator, StallState};
    use crate::common::ident::ICaseString;
    use crate::loader::{load_processor, RawCapability, RawProcessorDesc, RawUnit};
    use crate::program::HwInstruction;

    fn unit(name: &str, caps: &[&str], rd: bool, wr: bool) -> RawUnit {
        RawUnit {
            name: name.to_string(),
            width: 1,
            capabilities: caps
                .iter()
                .map(|c| RawCapability::Bare((*c).to_string()))
                .collect(),
            read_lock: rd,
            write_lock: wr,
            memory_access: Vec::new(),
        }
    }

    #[test]
    fn single_instruction_on_single_unit_trivially_completes() {
        let raw = RawProcessorDesc {
            units: vec![unit("fullsys", &["ALU"], true, true)],
            data_path: Vec::new(),
        };
        let desc = load_processor(&raw).unwrap();
        let program = vec![HwInstruction::new(
            [ICaseString::from("r1")],
            ICaseString::from("r2"),
            ICaseString::from("ALU"),
        )];

        let sim = Simulator::new(&desc);
        let table = sim.simulate(&program).unwrap();

        assert_eq!(table.len(), 1);
        let state = table[0].unit(&ICaseString::from("fullsys"))[0];
        assert_eq!(
            state,
            InstrState {
                instr: 0,
                stalled: StallState::NoStall
            }
        );
    }

    #[test]
    fn two_stage_pipeline_advances_one_instruction_over_two_cycles() {
        let raw = RawProcessorDesc {
            units: vec![
                unit("fetch", &["ALU"], true, false),
                unit("commit", &["ALU"], false, true),
            ],
            data_path: vec![vec!["fetch".to_string(), "commit".to_string()]],
        };
        let desc = load_processor(&raw).unwrap();
        let program = vec![HwInstruction::new(
            [ICaseString::from("r1")],
            ICaseString::from("r2"),
            ICaseString::from("ALU"),
        )];

        let sim = Simulator::new(&desc);
        let table = sim.simulate(&program).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table[0].unit(&ICaseString::from("fetch"))[0].stalled == StallState::NoStall);
        assert_eq!(table[1].unit(&ICaseString::from("fetch")).len(), 0);
        assert_eq!(
            table[1].unit(&ICaseString::from("commit"))[0].instr,
            0
        );
    }

    #[test]
    fn second_writer_data_stalls_until_first_write_clears() {
        let raw = RawProcessorDesc {
            units: vec![unit("fullsys", &["ALU"], true, true)],
            data_path: Vec::new(),
        };
        let desc = load_processor(&raw).unwrap();
        let program = vec![
            HwInstruction::new(
                [ICaseString::from("r1")],
                ICaseString::from("r2"),
                ICaseString::from("ALU"),
            ),
            HwInstruction::new(
                [ICaseString::from("r3")],
                ICaseString::from("r2"),
                ICaseString::from("ALU"),
            ),
        ];

        let sim = Simulator::new(&desc);
        let table = sim.simulate(&program).unwrap();

        // The unit has width 1, so the second instruction cannot even be
        // issued until the first one clears the pipeline's single stage.
        assert!(table.len() >= 2);
    }
}
