//! Register access planning.
//!
//! The planner statically linearizes conflicting register usages across an
//! entire program up front, so that the simulation engine can test register
//! readiness locally per instruction without any cross-cycle bookkeeping:
//! it only ever consults the head of a register's access queue.

use std::collections::{HashMap, VecDeque};

use crate::common::ident::ICaseString;

/// Whether an access request is a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// A source-register read.
    Read,
    /// A destination-register write.
    Write,
}

/// A run of same-kind, same-register access requests.
///
/// Adjacent reads on the same register coalesce into a single group;
/// writes never coalesce, so two consecutive writes remain two groups even
/// though they are adjacent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGroup {
    kind: AccessType,
    owners: Vec<usize>,
}

impl AccessGroup {
    fn new(kind: AccessType, owner: usize) -> Self {
        Self {
            kind,
            owners: vec![owner],
        }
    }
}

/// Per-register ordered queues of access groups, built once from a whole
/// program and consumed head-first as the simulation advances.
#[derive(Debug, Default)]
pub struct RegAccessPlan {
    queues: HashMap<ICaseString, VecDeque<AccessGroup>>,
}

impl RegAccessPlan {
    /// Returns `true` if instruction `instr` may currently access register
    /// `reg` for `kind`.
    ///
    /// Only the head group of `reg`'s queue is ever consulted: if it
    /// matches `kind` and lists `instr` among its owners, the access is
    /// permitted.
    #[must_use]
    pub fn can_access(&self, reg: &ICaseString, kind: AccessType, instr: usize) -> bool {
        self.queues
            .get(reg)
            .and_then(VecDeque::front)
            .is_some_and(|group| group.kind == kind && group.owners.contains(&instr))
    }

    /// Removes `instr` from the head group of `reg`'s queue. Once a head
    /// group's owners are all cleared, the group itself is popped and the
    /// next group (if any) becomes eligible.
    ///
    /// Does nothing if `reg` has no queue, an empty queue, or `instr` is
    /// not present in the head group.
    pub fn dequeue(&mut self, reg: &ICaseString, instr: usize) {
        let Some(queue) = self.queues.get_mut(reg) else {
            return;
        };
        let Some(group) = queue.front_mut() else {
            return;
        };
        group.owners.retain(|&owner| owner != instr);
        if group.owners.is_empty() {
            let _ = queue.pop_front();
        }
    }
}

/// Builds a [`RegAccessPlan`] by walking a program in order, enqueuing one
/// read request per source register and one write request per destination
/// register, coalescing adjacent reads on the same register as it goes.
#[derive(Debug, Default)]
pub struct RegAccPlanBuilder {
    plan: RegAccessPlan,
}

impl RegAccPlanBuilder {
    /// Creates a builder with an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a read request for `reg` on behalf of instruction `instr`.
    pub fn add_read(&mut self, reg: &ICaseString, instr: usize) {
        self.add(reg, AccessType::Read, instr);
    }

    /// Enqueues a write request for `reg` on behalf of instruction `instr`.
    pub fn add_write(&mut self, reg: &ICaseString, instr: usize) {
        self.add(reg, AccessType::Write, instr);
    }

    fn add(&mut self, reg: &ICaseString, kind: AccessType, instr: usize) {
        let queue = self.plan.queues.entry(reg.clone()).or_default();
        match queue.back_mut() {
            Some(tail) if tail.kind == AccessType::Read && kind == AccessType::Read => {
                tail.owners.push(instr);
            }
            _ => queue.push_back(AccessGroup::new(kind, instr)),
        }
    }

    /// Consumes the builder, producing the finished plan.
    #[must_use]
    pub fn build(self) -> RegAccessPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessType, RegAccPlanBuilder};
    use crate::common::ident::ICaseString;

    fn reg(name: &str) -> ICaseString {
        ICaseString::from(name)
    }

    #[test]
    fn adjacent_reads_coalesce_into_one_group() {
        let mut builder = RegAccPlanBuilder::new();
        builder.add_read(&reg("r1"), 0);
        builder.add_read(&reg("r1"), 1);
        let mut plan = builder.build();

        // Both readers are eligible simultaneously, in the same group.
        assert!(plan.can_access(&reg("r1"), AccessType::Read, 0));
        assert!(plan.can_access(&reg("r1"), AccessType::Read, 1));

        plan.dequeue(&reg("r1"), 0);
        // Group is not yet empty: instr 1 is still eligible.
        assert!(plan.can_access(&reg("r1"), AccessType::Read, 1));
    }

    #[test]
    fn consecutive_writes_stay_separate_groups() {
        let mut builder = RegAccPlanBuilder::new();
        builder.add_write(&reg("r1"), 0);
        builder.add_write(&reg("r1"), 1);
        let mut plan = builder.build();

        assert!(plan.can_access(&reg("r1"), AccessType::Write, 0));
        assert!(!plan.can_access(&reg("r1"), AccessType::Write, 1));

        plan.dequeue(&reg("r1"), 0);
        assert!(plan.can_access(&reg("r1"), AccessType::Write, 1));
    }

    #[test]
    fn write_terminates_an_open_read_run() {
        let mut builder = RegAccPlanBuilder::new();
        builder.add_read(&reg("r1"), 0);
        builder.add_write(&reg("r1"), 1);
        builder.add_read(&reg("r1"), 2);
        let mut plan = builder.build();

        assert!(plan.can_access(&reg("r1"), AccessType::Read, 0));
        assert!(!plan.can_access(&reg("r1"), AccessType::Write, 1));

        plan.dequeue(&reg("r1"), 0);
        assert!(plan.can_access(&reg("r1"), AccessType::Write, 1));
        assert!(!plan.can_access(&reg("r1"), AccessType::Read, 2));

        plan.dequeue(&reg("r1"), 1);
        assert!(plan.can_access(&reg("r1"), AccessType::Read, 2));
    }

    #[test]
    fn unknown_register_never_grants_access() {
        let plan = RegAccPlanBuilder::new().build();
        assert!(!plan.can_access(&reg("rX"), AccessType::Read, 0));
    }
}
