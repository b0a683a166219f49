//! Parsed program representation.
//!
//! A [`Program`] is the validated, fully constructed instruction list produced
//! by [`parse`](super::assembler::parse). Branch operands inside it are
//! already absolute instruction indices.

use crate::virtual_machine::isa::{Mnemonic, Opcode, OpcodeDef};
use std::fmt;

/// One constructed instruction bound to its registry definition.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// 1-based source line.
    pub line: usize,
    pub def: &'static OpcodeDef,
    pub op: Opcode,
}

impl Instruction {
    pub fn mnemonic(&self) -> Mnemonic {
        self.def.key
    }
}

/// Validated program ready for execution.
#[derive(Debug, Clone)]
pub struct Program {
    /// Version declared by the leading pragma.
    pub version: u8,
    /// Instructions in source order. Index 0 is always the version pragma.
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }
}

impl fmt::Display for Program {
    /// Renders an indexed listing, one instruction per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instr) in self.instructions.iter().enumerate() {
            writeln!(
                f,
                "{index:>4}  line {:<4} {}",
                instr.line,
                instr.def.mnemonic
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::virtual_machine::assembler::parse;
    use crate::virtual_machine::isa::Mnemonic;

    #[test]
    fn accessors() {
        let program = parse("#pragma version 2\nint 1\nreturn").unwrap();
        assert_eq!(program.len(), 3);
        assert!(!program.is_empty());
        assert_eq!(program.get(2).unwrap().mnemonic(), Mnemonic::Return);
        assert!(program.get(3).is_none());
    }

    #[test]
    fn listing() {
        let program = parse("#pragma version 1\n\nint 1").unwrap();
        let text = program.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("#pragma"));
        assert!(lines[1].contains("line 3"));
        assert!(lines[1].ends_with("int"));
    }
}
