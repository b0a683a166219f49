use crate::crypto::signatures::SignatureError;
use crate::types::encoding::EncodingError;

/// Broad category of a [`VMError`].
///
/// `Rejected` marks program-authored failures (`err`, failed `assert`) as
/// opposed to faults detected by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Stack,
    Arithmetic,
    Config,
    Crypto,
    Budget,
    Rejected,
    Runtime,
}

/// Errors that can occur while parsing or executing a TEAL program.
#[derive(Debug, thiserror::Error)]
pub enum VMError {
    // ==================== Parse ====================
    /// Unrecognized mnemonic.
    #[error("unknown opcode \"{mnemonic}\"")]
    UnknownOpcode { mnemonic: String },
    /// Wrong number of operands for an opcode.
    #[error("opcode {opcode} expects {expected} operands, instead found {actual} operands")]
    OperandCountMismatch {
        opcode: &'static str,
        expected: String,
        actual: usize,
    },
    /// Operand is not a valid integer literal or named constant.
    #[error("opcode {opcode} expected an integer operand, got \"{token}\"")]
    InvalidInteger { opcode: &'static str, token: String },
    /// Integer operand does not fit the allowed range.
    #[error("opcode {opcode} operand {value} is outside the range {min}..={max}")]
    IndexOutOfRange {
        opcode: &'static str,
        value: String,
        min: u64,
        max: u64,
    },
    /// Malformed byte literal.
    #[error("opcode {opcode} has an invalid byte literal \"{literal}\": {source}")]
    InvalidByteLiteral {
        opcode: &'static str,
        literal: String,
        source: EncodingError,
    },
    /// Malformed or mis-checksummed account address.
    #[error("invalid address \"{literal}\": {source}")]
    InvalidAddress {
        literal: String,
        source: EncodingError,
    },
    /// Program does not start with `#pragma version N`.
    #[error("program must begin with \"#pragma version N\"")]
    MissingPragma,
    /// Version pragma found after the first instruction.
    #[error("#pragma version may only appear as the first instruction")]
    MisplacedPragma,
    /// Pragma is not of the form `#pragma version N`.
    #[error("malformed pragma \"{text}\", expected \"#pragma version N\"")]
    InvalidPragma { text: String },
    /// Version outside the supported range.
    #[error("unsupported TEAL version {version}, expected 1..={max}")]
    UnsupportedVersion { version: u64, max: u8 },
    /// Opcode introduced in a later version than the program declares.
    #[error("{mnemonic} is not available before TEAL version {since} (program version is {version})")]
    OpcodeUnavailable {
        mnemonic: &'static str,
        since: u8,
        version: u8,
    },
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to undefined label.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Branch target lies outside the program.
    #[error("branch target {target} is outside the program (1..={len})")]
    BranchOutOfRange { target: i64, len: usize },
    /// Backward branch in a program that predates version 4.
    #[error("backward branch to instruction {target} requires TEAL version 4 or later")]
    BackwardBranch { target: usize },
    /// Second `intcblock` or `bytecblock` in the same program.
    #[error("{opcode} may only appear once per program")]
    DuplicateConstantBlock { opcode: &'static str },
    /// Unsupported ECDSA curve index.
    #[error("unsupported ECDSA curve \"{token}\"")]
    InvalidCurve { token: String },
    /// Unknown field name for a field-taking opcode.
    #[error("opcode {opcode} does not support field \"{field}\"")]
    InvalidField { opcode: &'static str, field: String },

    // ==================== Stack ====================
    /// Not enough values on the stack.
    #[error(
        "expected {required} stack-based arguments on the stack for opcode {opcode}, found only {actual} values on the stack"
    )]
    StackUnderflow {
        opcode: &'static str,
        required: usize,
        actual: usize,
    },
    /// Value has the wrong type for the opcode.
    #[error("opcode {opcode} expected {expected} but got {actual}")]
    TypeMismatch {
        opcode: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    // ==================== Arithmetic ====================
    #[error("opcode {opcode} overflowed")]
    Overflow { opcode: &'static str },
    #[error("opcode {opcode} underflowed")]
    Underflow { opcode: &'static str },
    #[error("opcode {opcode} divided by zero")]
    DivisionByZero { opcode: &'static str },
    /// Byte value exceeds the opcode's size limit.
    #[error("opcode {opcode} received {actual} bytes, at most {max} are allowed")]
    BytesTooLong {
        opcode: &'static str,
        max: usize,
        actual: usize,
    },
    /// Operand value the opcode cannot work with (`0 exp 0`, shift of 64 or more).
    #[error("opcode {opcode}: {reason}")]
    InvalidOperand { opcode: &'static str, reason: String },
    /// Byte or bit range lies outside the operand.
    #[error("opcode {opcode} range {start}..{end} is outside a value of length {len}")]
    OutOfBounds {
        opcode: &'static str,
        start: u64,
        end: u64,
        len: usize,
    },

    // ==================== Runtime ====================
    /// Constant-pool index beyond the declared block.
    #[error("opcode {opcode} index {index} is outside the constant block of size {len}")]
    ConstantIndexOutOfRange {
        opcode: &'static str,
        index: usize,
        len: usize,
    },
    /// Program argument index beyond the supplied args.
    #[error("argument {index} requested but only {len} arguments were supplied")]
    ArgIndexOutOfRange { index: usize, len: usize },
    /// `retsub` with an empty call stack.
    #[error("retsub without callsub")]
    ReturnWithoutCall,
    /// `callsub` nested deeper than the engine allows.
    #[error("call stack overflow: more than {max} nested callsub frames")]
    CallStackOverflow { max: usize },
    /// Too many or too large `log` calls.
    #[error("log limit exceeded: {reason}")]
    LogLimitExceeded { reason: String },
    /// Program ended with anything but a single integer on the stack.
    #[error("program must end with exactly one uint64 on the stack, found {found}")]
    InvalidFinalStack { found: String },
    /// Crypto input with the wrong length.
    #[error("opcode {opcode}: {source}")]
    InvalidInputLength {
        opcode: &'static str,
        source: SignatureError,
    },

    // ==================== Budget ====================
    #[error("cost budget exceeded: used {used}, budget {budget}")]
    BudgetExceeded { used: u64, budget: u64 },

    // ==================== Config ====================
    #[error(
        "field \"{field}\" has not been supplied with transaction {txn}, please adjust your configuration to include this field"
    )]
    MissingTxnField { field: String, txn: String },
    #[error("expected field \"{field}\" to be an array when used with opcode {opcode}")]
    NotAnArrayField { field: String, opcode: &'static str },
    #[error("expected field \"{field}\" to be a single value when used with opcode {opcode}")]
    NotAScalarField { field: String, opcode: &'static str },
    #[error(
        "field index {index} is outside the range of {len} for field \"{field}\", please adjust your configuration to include this field index"
    )]
    FieldIndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    #[error(
        "group transaction {index} requested but the group only has {len} transactions, please add it to \"gtxn\" in your configuration"
    )]
    GroupIndexOutOfRange { index: u64, len: usize },
    #[error(
        "global \"{field}\" has not been supplied, please add it to \"globals\" in your configuration"
    )]
    MissingGlobal { field: String },
    #[error(
        "account \"{account}\" not found, please add this to \"accounts\" in your configuration"
    )]
    AccountNotFound { account: String },
    #[error(
        "\"balance\" not set for account \"{account}\", please add field \"balance\" to this account in your configuration"
    )]
    BalanceNotSet { account: String },
    #[error(
        "\"min_balance\" not set for account \"{account}\", please add field \"min_balance\" to this account in your configuration"
    )]
    MinBalanceNotSet { account: String },
    #[error(
        "application {app_id} not found, please add it to \"application\" in your configuration"
    )]
    ApplicationNotFound { app_id: u64 },
    #[error(
        "account \"{account}\" has no local state for application {app_id}, please add it to the account's \"applications\" in your configuration"
    )]
    LocalStateNotFound { account: String, app_id: u64 },
    #[error(
        "asset {asset_id} has no parameter \"{field}\", please add it to \"assets\" in your configuration"
    )]
    MissingAssetParam { asset_id: u64, field: String },

    // ==================== Rejected ====================
    /// The `err` opcode was executed.
    #[error("err opcode executed")]
    ProgramError,
    /// `assert` popped a zero.
    #[error("assertion failed")]
    AssertionFailed,

    /// Error with source-line context.
    #[error("line {line}: {source}")]
    AtLine { line: usize, source: Box<VMError> },
}

impl VMError {
    /// Wraps the error with the 1-based source line, unless it already has one.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            err @ VMError::AtLine { .. } => err,
            err => VMError::AtLine {
                line,
                source: Box::new(err),
            },
        }
    }

    /// Returns the innermost error, skipping line context.
    pub fn root(&self) -> &VMError {
        match self {
            VMError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the source line the error was raised on, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            VMError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use VMError::*;
        match self.root() {
            UnknownOpcode { .. }
            | OperandCountMismatch { .. }
            | InvalidInteger { .. }
            | IndexOutOfRange { .. }
            | InvalidByteLiteral { .. }
            | InvalidAddress { .. }
            | MissingPragma
            | MisplacedPragma
            | InvalidPragma { .. }
            | UnsupportedVersion { .. }
            | OpcodeUnavailable { .. }
            | DuplicateLabel { .. }
            | UndefinedLabel { .. }
            | BranchOutOfRange { .. }
            | BackwardBranch { .. }
            | DuplicateConstantBlock { .. }
            | InvalidCurve { .. }
            | InvalidField { .. } => ErrorKind::Parse,
            StackUnderflow { .. } | TypeMismatch { .. } => ErrorKind::Stack,
            Overflow { .. }
            | Underflow { .. }
            | DivisionByZero { .. }
            | InvalidOperand { .. }
            | BytesTooLong { .. }
            | OutOfBounds { .. } => ErrorKind::Arithmetic,
            ConstantIndexOutOfRange { .. }
            | ArgIndexOutOfRange { .. }
            | ReturnWithoutCall
            | CallStackOverflow { .. }
            | LogLimitExceeded { .. }
            | InvalidFinalStack { .. } => ErrorKind::Runtime,
            InvalidInputLength { .. } => ErrorKind::Crypto,
            BudgetExceeded { .. } => ErrorKind::Budget,
            MissingTxnField { .. }
            | NotAnArrayField { .. }
            | NotAScalarField { .. }
            | FieldIndexOutOfRange { .. }
            | GroupIndexOutOfRange { .. }
            | MissingGlobal { .. }
            | AccountNotFound { .. }
            | BalanceNotSet { .. }
            | MinBalanceNotSet { .. }
            | ApplicationNotFound { .. }
            | LocalStateNotFound { .. }
            | MissingAssetParam { .. } => ErrorKind::Config,
            ProgramError | AssertionFailed => ErrorKind::Rejected,
            AtLine { .. } => ErrorKind::Runtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_line_wraps_once() {
        let err = VMError::ProgramError.at_line(3).at_line(9);
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.root(), VMError::ProgramError));
        assert_eq!(err.to_string(), "line 3: err opcode executed");
    }

    #[test]
    fn kind_sees_through_line_context() {
        let err = VMError::AccountNotFound {
            account: "alice".into(),
        }
        .at_line(2);
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("\"alice\""));
    }

    #[test]
    fn rejections_are_tagged_separately() {
        assert_eq!(VMError::AssertionFailed.kind(), ErrorKind::Rejected);
        assert_eq!(
            VMError::DivisionByZero { opcode: "/" }.kind(),
            ErrorKind::Arithmetic
        );
    }
}
