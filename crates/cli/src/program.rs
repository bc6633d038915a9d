//! Reading assembly text and compiling it against an ISA table.
//!
//! This is the driver-level counterpart to [`procsim_core::program`]:
//! [`ProgInstruction`] is what the text reader produces, before mnemonics
//! are resolved to capabilities and register names are interned.

use std::collections::HashMap;

use procsim_core::common::error::SimError;
use procsim_core::common::ident::ICaseString;
use procsim_core::program::HwInstruction;

/// One instruction as read from a program's source text, before its
/// mnemonic has been resolved to a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgInstruction {
    /// Source (read) register names, in the order written.
    pub sources: Vec<ICaseString>,
    /// Destination (write) register name.
    pub destination: ICaseString,
    /// The instruction's mnemonic, as written.
    pub name: String,
    /// 1-based source line number, for error reporting.
    pub line: usize,
}

/// Reads a program's source text into instructions.
///
/// One instruction per non-blank line: `MNEMONIC DST, SRC1, SRC2, …`. The
/// mnemonic is separated from its operands by whitespace; operands are
/// separated by commas with optional surrounding whitespace.
///
/// # Errors
///
/// Returns [`SimError::CodeError`] for a line with no operands, or with an
/// operand that is empty after trimming.
pub fn read_program(text: &str) -> Result<Vec<ProgInstruction>, SimError> {
    text.lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| create_instr(idx + 1, line))
        .collect()
}

fn create_instr(line_num: usize, line_txt: &str) -> Result<ProgInstruction, SimError> {
    let mut parts = line_txt.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().unwrap_or_default();
    let Some(operands_txt) = parts.next().map(str::trim_start) else {
        return Err(SimError::CodeError {
            line: line_num,
            reason: format!("no operands provided for instruction {mnemonic}"),
        });
    };

    let mut operands = operands_txt.split(',').map(str::trim);
    let Some(dst_txt) = operands.next() else {
        return Err(SimError::CodeError {
            line: line_num,
            reason: format!("no operands provided for instruction {mnemonic}"),
        });
    };
    let destination = get_reg_name(1, dst_txt, line_num, mnemonic)?;

    let mut sources = Vec::new();
    for (idx, op) in operands.enumerate() {
        sources.push(get_reg_name(idx + 2, op, line_num, mnemonic)?);
    }

    Ok(ProgInstruction {
        sources,
        destination,
        name: mnemonic.to_string(),
        line: line_num,
    })
}

fn get_reg_name(
    op_idx: usize,
    op_name: &str,
    line_num: usize,
    mnemonic: &str,
) -> Result<ICaseString, SimError> {
    if op_name.is_empty() {
        return Err(SimError::CodeError {
            line: line_num,
            reason: format!("operand {op_idx} empty for instruction {mnemonic}"),
        });
    }
    Ok(ICaseString::from(op_name))
}

/// Compiles a read program against an ISA mnemonic table, resolving each
/// instruction's mnemonic to a capability.
///
/// # Errors
///
/// Returns [`SimError::CodeError`] if an instruction's mnemonic is not a
/// key of `isa` (case-insensitively).
pub fn compile_program(
    prog: &[ProgInstruction],
    isa: &HashMap<String, ICaseString>,
) -> Result<Vec<HwInstruction>, SimError> {
    prog.iter()
        .map(|instr| {
            let categ = isa.get(&instr.name.to_uppercase()).cloned().ok_or_else(|| {
                SimError::CodeError {
                    line: instr.line,
                    reason: format!("unsupported instruction {}", instr.name),
                }
            })?;
            Ok(HwInstruction::new(
                instr.sources.clone(),
                instr.destination.clone(),
                categ,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compile_program, read_program};
    use procsim_core::common::ident::ICaseString;
    use std::collections::HashMap;

    #[test]
    fn reads_a_simple_instruction() {
        let prog = read_program("ADD R14, R11, R15\n").unwrap();
        assert_eq!(prog.len(), 1);
        assert_eq!(prog[0].name, "ADD");
        assert_eq!(prog[0].destination, ICaseString::from("R14"));
        assert_eq!(
            prog[0].sources,
            vec![ICaseString::from("R11"), ICaseString::from("R15")]
        );
        assert_eq!(prog[0].line, 1);
    }

    #[test]
    fn blank_lines_are_skipped_and_line_numbers_preserved() {
        let prog = read_program("\nADD R1, R2\n\nADD R3, R4\n").unwrap();
        assert_eq!(prog.len(), 2);
        assert_eq!(prog[0].line, 2);
        assert_eq!(prog[1].line, 4);
    }

    #[test]
    fn missing_operands_is_a_code_error() {
        assert!(read_program("ADD\n").is_err());
    }

    #[test]
    fn empty_operand_is_a_code_error() {
        assert!(read_program("ADD R1, \n").is_err());
    }

    #[test]
    fn unsupported_mnemonic_is_a_code_error() {
        let prog = read_program("SUB R1, R2\n").unwrap();
        let isa = HashMap::from([("ADD".to_string(), ICaseString::from("ALU"))]);
        assert!(compile_program(&prog, &isa).is_err());
    }

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        let prog = read_program("add R1, R2\n").unwrap();
        let isa = HashMap::from([("ADD".to_string(), ICaseString::from("ALU"))]);
        let compiled = compile_program(&prog, &isa).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].categ, ICaseString::from("ALU"));
    }
}
