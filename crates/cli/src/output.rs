//! Rendering a simulation run as a tab-separated utilization table.

use procsim_core::sim::Utilization;

use crate::config::stall_letter;

/// Renders `util_tbl` (one snapshot per cycle) for a program of
/// `program_len` instructions into a table of cells, header row first.
///
/// The header row is `["", "1", "2", …, "N"]`. Row *k* (1-based `I{k}`)
/// holds an empty cell for every cycle before the instruction first
/// appears, and `<stall-letter>:<unit-name>` for every cycle it is
/// resident.
#[must_use]
pub fn render(program_len: usize, util_tbl: &[Utilization]) -> Vec<Vec<String>> {
    let cycles = util_tbl.len();

    let mut header = vec![String::new()];
    header.extend((1..=cycles).map(|tick| tick.to_string()));

    let mut rows = vec![header];
    for instr in 0..program_len {
        let mut row = vec![format!("I{}", instr + 1)];
        for cp in util_tbl {
            row.push(cell_for(cp, instr));
        }
        rows.push(row);
    }
    rows
}

fn cell_for(cp: &Utilization, instr: usize) -> String {
    for (unit_name, states) in cp.iter() {
        if let Some(state) = states.iter().find(|s| s.instr == instr) {
            return format!("{}:{unit_name}", stall_letter(state.stalled));
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::render;
    use procsim_core::common::ident::ICaseString;
    use procsim_core::sim::{InstrState, StallState, Utilization};

    #[test]
    fn empty_run_has_only_the_header() {
        let rows = render(0, &[]);
        assert_eq!(rows, vec![vec![String::new()]]);
    }

    #[test]
    fn cell_shows_stall_letter_and_unit_name() {
        let mut cp = Utilization::default();
        cp.unit_mut(&ICaseString::from("fullsys"))
            .push(InstrState {
                instr: 0,
                stalled: StallState::NoStall,
            });
        let rows = render(1, std::slice::from_ref(&cp));
        assert_eq!(rows[0], vec![String::new(), "1".to_string()]);
        assert_eq!(rows[1], vec!["I1".to_string(), "U:fullsys".to_string()]);
    }
}
