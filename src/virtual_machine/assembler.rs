//! TEAL source parser.
//!
//! Turns tokenized source into a validated [`Program`]. Uses
//! [`for_each_opcode!`](crate::for_each_opcode) to generate `build_opcode`,
//! which parses each operand according to its registry kind.
//!
//! # Syntax
//!
//! ```text
//! #pragma version 4
//! label: MNEMONIC operand1 operand2 ...  // optional comment
//! ```
//!
//! - The first line must be the version pragma
//! - Labels end with `:` and may share a line with an instruction
//! - Branch operands are labels or signed instruction offsets
//!
//! Parsing runs in two passes: the first records label positions, the second
//! constructs every instruction with version gating, operand-count checks and
//! typed operand parsing. Any failure aborts the whole parse.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{MAX_VERSION, Mnemonic, Opcode};
use crate::virtual_machine::operand::Operands;
use crate::virtual_machine::program::{Instruction, Program};
use crate::virtual_machine::tokenizer::{Token, tokenize};
use std::collections::HashMap;
use std::fmt::Write;

const LABEL_SUFFIX: char = ':';
const PRAGMA: &str = "#pragma";

/// Version from which branches may jump backwards.
const BACKWARD_BRANCH_VERSION: u8 = 4;

/// Label table and program facts needed while constructing instructions.
pub struct AsmContext {
    /// Label definitions mapping names to instruction indices.
    pub(crate) labels: HashMap<String, usize>,
    /// Declared program version.
    pub(crate) version: u8,
    /// Number of instructions; a branch to `len` ends the program.
    pub(crate) len: usize,
}

impl AsmContext {
    pub fn new(version: u8, len: usize) -> Self {
        Self {
            labels: HashMap::new(),
            version,
            len,
        }
    }

    /// Registers a label at the given instruction index.
    pub(crate) fn define_label(&mut self, name: String, index: usize) -> Result<(), VMError> {
        if self.labels.contains_key(&name) {
            return Err(VMError::DuplicateLabel { label: name });
        }
        self.labels.insert(name, index);
        Ok(())
    }

    /// Resolves a label to its instruction index.
    pub(crate) fn resolve_label(&self, name: &str) -> Result<usize, VMError> {
        self.labels
            .get(name)
            .copied()
            .ok_or(VMError::UndefinedLabel {
                label: name.to_string(),
            })
    }

    /// Resolves a branch operand of the instruction at `index` to an absolute target.
    ///
    /// An integer operand is an offset relative to the following instruction.
    pub(crate) fn resolve_branch(&self, tok: &str, index: usize) -> Result<usize, VMError> {
        let target = match tok.parse::<i64>() {
            Ok(offset) => {
                let target = (index as i64).saturating_add(1).saturating_add(offset);
                if target < 1 || target > self.len as i64 {
                    return Err(VMError::BranchOutOfRange {
                        target,
                        len: self.len,
                    });
                }
                target as usize
            }
            Err(_) => self.resolve_label(tok)?,
        };
        if target <= index && self.version < BACKWARD_BRANCH_VERSION {
            return Err(VMError::BackwardBranch { target });
        }
        Ok(target)
    }
}

/// Checks if a token is a label definition (ends with `:`)
fn is_label_def(tok: &str) -> bool {
    tok.ends_with(LABEL_SUFFIX) && tok.len() > 1
}

/// Extracts the label name from a label definition token.
fn label_name(tok: &str) -> &str {
    &tok[..tok.len() - 1]
}

macro_rules! define_construct {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], since $version:literal, cost $cost:tt, args $arity:tt, stack $stack:literal
        ),* $(,)?
    ) => {
        /// Builds the [`Opcode`] for `key`, parsing each operand by its kind.
        fn build_opcode(
            key: Mnemonic,
            operands: &mut Operands<'_>,
            ctx: &AsmContext,
            index: usize,
        ) -> Result<Opcode, VMError> {
            match key {
                $(
                    Mnemonic::$name => Ok(Opcode::$name {
                        $( $field: define_construct!(@parse $kind, operands, ctx, index)?, )*
                    }),
                )*
            }
        }
    };

    (@parse Uint, $ops:ident, $ctx:ident, $index:ident)         => { $ops.uint() };
    (@parse Index, $ops:ident, $ctx:ident, $index:ident)        => { $ops.index() };
    (@parse Label, $ops:ident, $ctx:ident, $index:ident)        => { $ops.label($ctx, $index) };
    (@parse Field, $ops:ident, $ctx:ident, $index:ident)        => { $ops.field() };
    (@parse HoldingField, $ops:ident, $ctx:ident, $index:ident) => { $ops.holding_field() };
    (@parse ParamsField, $ops:ident, $ctx:ident, $index:ident)  => { $ops.params_field() };
    (@parse Curve, $ops:ident, $ctx:ident, $index:ident)        => { $ops.curve() };
    (@parse Bytes, $ops:ident, $ctx:ident, $index:ident)        => { $ops.bytes() };
    (@parse Addr, $ops:ident, $ctx:ident, $index:ident)         => { $ops.addr() };
    (@parse Uints, $ops:ident, $ctx:ident, $index:ident)        => { $ops.uints() };
    (@parse ByteList, $ops:ident, $ctx:ident, $index:ident)     => { $ops.byte_list() };
    (@parse Version, $ops:ident, $ctx:ident, $index:ident)      => { $ops.version() };
}

crate::for_each_opcode!(define_construct);

/// Constructs the instruction at `index` from its token.
fn construct(ctx: &AsmContext, token: &Token<'_>, index: usize) -> Result<Instruction, VMError> {
    let key = Mnemonic::lookup(token.opcode).ok_or_else(|| VMError::UnknownOpcode {
        mnemonic: token.opcode.to_string(),
    })?;
    let def = key.def();

    if key == Mnemonic::Pragma && index != 0 {
        return Err(VMError::MisplacedPragma);
    }
    if def.version > ctx.version {
        return Err(VMError::OpcodeUnavailable {
            mnemonic: def.mnemonic,
            since: def.version,
            version: ctx.version,
        });
    }
    if !def.operands.accepts(token.operands.len()) {
        return Err(VMError::OperandCountMismatch {
            opcode: def.mnemonic,
            expected: def.operands.describe(),
            actual: token.operands.len(),
        });
    }

    let mut operands = Operands::new(def.mnemonic, &token.operands);
    let op = build_opcode(key, &mut operands, ctx, index)?;
    Ok(Instruction {
        line: token.line,
        def,
        op,
    })
}

/// Reads the program version from the first token, which must be the pragma.
fn read_version(first: Option<&Token<'_>>) -> Result<u8, VMError> {
    let token = first
        .filter(|t| t.opcode == PRAGMA)
        .ok_or(VMError::MissingPragma)?;
    let version = Operands::new(PRAGMA, &token.operands)
        .version()
        .map_err(|e| e.at_line(token.line))?;
    match u8::try_from(version) {
        Ok(v) if (1..=MAX_VERSION).contains(&v) => Ok(v),
        _ => Err(VMError::UnsupportedVersion {
            version,
            max: MAX_VERSION,
        }
        .at_line(token.line)),
    }
}

/// Parses TEAL source into a validated [`Program`].
///
/// Pass 1 splits label definitions from instructions and records each label
/// at the index of the instruction that follows it. Pass 2 constructs every
/// instruction. Errors carry the source line they were raised on.
pub fn parse(source: &str) -> Result<Program, VMError> {
    let tokens = tokenize(source);
    let version = read_version(tokens.first())?;

    // First pass: separate labels, remembering (name, index, line)
    let mut lines: Vec<Token<'_>> = Vec::with_capacity(tokens.len());
    let mut pending_labels: Vec<(String, usize, usize)> = Vec::new();
    for token in tokens {
        if is_label_def(token.opcode) {
            pending_labels.push((label_name(token.opcode).to_string(), lines.len(), token.line));
            if let Some((opcode, operands)) = token.operands.split_first() {
                lines.push(Token {
                    line: token.line,
                    opcode: *opcode,
                    operands: operands.to_vec(),
                });
            }
        } else {
            lines.push(token);
        }
    }

    let mut ctx = AsmContext::new(version, lines.len());
    for (name, index, line) in pending_labels {
        ctx.define_label(name, index).map_err(|e| e.at_line(line))?;
    }

    // Second pass: construct instructions
    let mut instructions = Vec::with_capacity(lines.len());
    let mut seen_intcblock = false;
    let mut seen_bytecblock = false;
    for (index, token) in lines.iter().enumerate() {
        let instr = construct(&ctx, token, index).map_err(|e| e.at_line(token.line))?;
        let seen = match instr.mnemonic() {
            Mnemonic::Intcblock => Some(&mut seen_intcblock),
            Mnemonic::Bytecblock => Some(&mut seen_bytecblock),
            _ => None,
        };
        if let Some(seen) = seen {
            if *seen {
                return Err(VMError::DuplicateConstantBlock {
                    opcode: instr.def.mnemonic,
                }
                .at_line(token.line));
            }
            *seen = true;
        }
        instructions.push(instr);
    }

    Ok(Program {
        version,
        instructions,
    })
}

/// Formats a compiler-style diagnostic pointing at the line an error was raised on.
pub fn render_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {}", err.root());
    let Some(line) = err.line() else {
        let _ = writeln!(diag, " --> {file}");
        return diag;
    };
    let _ = writeln!(diag, " --> {file}:{line}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let indent = line_text.len() - line_text.trim_start().len();
        let width = line_text.trim().len().max(1);
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}{}", " ".repeat(indent), "^".repeat(width));
    }

    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::{AssetParamsField, EcdsaCurve};

    fn ops(source: &str) -> Vec<Opcode> {
        parse(source)
            .expect("parse failed")
            .instructions
            .into_iter()
            .map(|i| i.op)
            .collect()
    }

    fn parse_err(source: &str) -> VMError {
        parse(source).expect_err("expected parse error")
    }

    // ==================== Pragma ====================

    #[test]
    fn pragma_sets_version() {
        let program = parse("#pragma version 3\nint 1").unwrap();
        assert_eq!(program.version, 3);
        assert_eq!(program.instructions[0].op, Opcode::Pragma { version: 3 });
    }

    #[test]
    fn missing_pragma() {
        assert!(matches!(parse_err("int 1"), VMError::MissingPragma));
        assert!(matches!(parse_err(""), VMError::MissingPragma));
        assert!(matches!(
            parse_err("start:\n#pragma version 2\nint 1"),
            VMError::MissingPragma
        ));
    }

    #[test]
    fn misplaced_pragma() {
        let err = parse_err("#pragma version 2\nint 1\n#pragma version 2");
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.root(), VMError::MisplacedPragma));
    }

    #[test]
    fn unsupported_version() {
        for source in ["#pragma version 0", "#pragma version 6", "#pragma version 300"] {
            assert!(matches!(
                parse_err(source).root(),
                VMError::UnsupportedVersion { max: MAX_VERSION, .. }
            ));
        }
    }

    #[test]
    fn malformed_pragma() {
        assert!(matches!(
            parse_err("#pragma mode 2").root(),
            VMError::InvalidPragma { .. }
        ));
        assert!(matches!(
            parse_err("#pragma version").root(),
            VMError::OperandCountMismatch { .. }
        ));
    }

    // ==================== Construction ====================

    #[test]
    fn unknown_opcode() {
        let err = parse_err("#pragma version 2\nint 1\nfoo");
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.root(), VMError::UnknownOpcode { mnemonic } if mnemonic == "foo"));
    }

    #[test]
    fn version_gating() {
        let err = parse_err("#pragma version 2\nint 1\nint 2\nswap");
        assert!(matches!(
            err.root(),
            VMError::OpcodeUnavailable {
                mnemonic: "swap",
                since: 3,
                version: 2
            }
        ));
        assert!(parse("#pragma version 3\nint 1\nint 2\nswap").is_ok());
    }

    #[test]
    fn operand_count() {
        let err = parse_err("#pragma version 1\nint 1 2");
        assert!(matches!(
            err.root(),
            VMError::OperandCountMismatch { opcode: "int", actual: 2, .. }
        ));
        let err = parse_err("#pragma version 1\nbyte base64 aGk= extra");
        assert!(err.to_string().contains("1 or 2"));
    }

    #[test]
    fn typed_operands() {
        let parsed = ops(
            "#pragma version 5\n\
             int 0x10\n\
             byte \"hi\"\n\
             txna Accounts 1\n\
             asset_params_get AssetTotal\n\
             ecdsa_verify 0",
        );
        assert_eq!(parsed[1], Opcode::Int { value: 16 });
        assert_eq!(parsed[2], Opcode::Byte { value: b"hi".to_vec() });
        assert_eq!(
            parsed[3],
            Opcode::Txna {
                field: "Accounts".to_string(),
                index: 1
            }
        );
        assert_eq!(
            parsed[4],
            Opcode::AssetParamsGet {
                field: AssetParamsField::AssetTotal
            }
        );
        assert_eq!(
            parsed[5],
            Opcode::EcdsaVerify {
                curve: EcdsaCurve::Secp256k1
            }
        );
    }

    #[test]
    fn scratch_slot_out_of_range() {
        let err = parse_err("#pragma version 1\nint 1\nstore 256");
        assert!(matches!(err.root(), VMError::IndexOutOfRange { max: 255, .. }));
        assert!(parse("#pragma version 1\nint 1\nstore 255").is_ok());
    }

    #[test]
    fn one_constant_block_each() {
        assert!(parse("#pragma version 1\nintcblock 1 2\nbytecblock 0x01\nint 1").is_ok());
        let err = parse_err("#pragma version 1\nintcblock 1\nintcblock 2");
        assert_eq!(err.line(), Some(3));
        assert!(matches!(
            err.root(),
            VMError::DuplicateConstantBlock { opcode: "intcblock" }
        ));
    }

    // ==================== Labels ====================

    #[test]
    fn label_resolves_to_next_instruction() {
        let parsed = ops("#pragma version 2\nint 1\nbnz done\nint 0\ndone:\nint 7");
        assert_eq!(parsed[2], Opcode::Bnz { target: 4 });
        assert_eq!(parsed[4], Opcode::Int { value: 7 });
    }

    #[test]
    fn label_sharing_a_line() {
        let parsed = ops("#pragma version 2\nint 1\nbnz label\nint 0\nlabel: int 7");
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[2], Opcode::Bnz { target: 4 });
    }

    #[test]
    fn label_at_end_halts() {
        let parsed = ops("#pragma version 2\nint 1\nbnz end\nerr\nend:");
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[2], Opcode::Bnz { target: 4 });
    }

    #[test]
    fn duplicate_label() {
        let err = parse_err("#pragma version 2\nx: int 1\nx: int 2");
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.root(), VMError::DuplicateLabel { label } if label == "x"));
    }

    #[test]
    fn undefined_label() {
        let err = parse_err("#pragma version 2\nb missing");
        assert!(matches!(err.root(), VMError::UndefinedLabel { label } if label == "missing"));
    }

    #[test]
    fn is_label_def_rules() {
        assert!(is_label_def("start:"));
        assert!(is_label_def("_loop:"));
        assert!(!is_label_def(":"));
        assert!(!is_label_def("label"));
    }

    // ==================== Branches ====================

    #[test]
    fn relative_offsets() {
        let parsed = ops("#pragma version 2\nint 1\nbnz 1\nerr\nint 1");
        assert_eq!(parsed[2], Opcode::Bnz { target: 4 });
    }

    #[test]
    fn offset_out_of_range() {
        let err = parse_err("#pragma version 2\nint 1\nbnz 5");
        assert!(matches!(
            err.root(),
            VMError::BranchOutOfRange { target: 8, len: 3 }
        ));
    }

    #[test]
    fn backward_branch_needs_v4() {
        let source = "#pragma version 3\ntop: int 0\nbnz top\nint 1";
        assert!(matches!(
            parse_err(source).root(),
            VMError::BackwardBranch { target: 1 }
        ));
        assert!(parse(&source.replace("version 3", "version 4")).is_ok());
    }

    // ==================== Diagnostics ====================

    #[test]
    fn diagnostic_points_at_line() {
        let source = "#pragma version 2\n  foo 1";
        let err = parse_err(source);
        let diag = render_diagnostic("prog.teal", source, &err);
        assert!(diag.starts_with("error: unknown opcode \"foo\""));
        assert!(diag.contains(" --> prog.teal:2"));
        assert!(diag.contains("   2 |   foo 1"));
        assert!(diag.contains("  |   ^^^^^"));
    }

    #[test]
    fn diagnostic_without_line() {
        let err = parse_err("int 1");
        let diag = render_diagnostic("prog.teal", "int 1", &err);
        assert!(diag.contains(" --> prog.teal\n"));
    }
}
