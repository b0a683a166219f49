use crate::types::address::{ADDRESS_LEN, Address};
use crate::types::value::TypedValue;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::state::Ledger;
use crate::virtual_machine::vm::cost::DEFAULT_COST_BUDGET;
use std::collections::BTreeMap;

/// Number of scratch slots.
pub const SCRATCH_SIZE: usize = 256;
/// Maximum number of `log` calls per run.
pub const MAX_LOG_CALLS: usize = 32;
/// Maximum total bytes logged per run.
pub const MAX_LOG_SIZE: usize = 1024;

const SENDER_FIELD: &str = "Sender";
const ACCOUNTS_FIELD: &str = "Accounts";
const GROUP_SIZE_FIELD: &str = "GroupSize";

/// A transaction field: one value, or an array read with `txna`-style opcodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(TypedValue),
    Array(Vec<TypedValue>),
}

/// Transaction fields keyed by field name.
pub type TxnFields = BTreeMap<String, FieldValue>;

/// Call stack frame storing the instruction to resume at after `retsub`.
#[derive(Clone, Debug)]
pub(super) struct CallFrame {
    pub(super) return_addr: usize,
}

/// Mutable run-time state of one program run.
///
/// Everything the program can observe is supplied here by the caller before
/// [`execute`](super::execute) starts; the engine never loads data itself.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub stack: Vec<TypedValue>,
    /// Exactly [`SCRATCH_SIZE`] slots, all starting as `Uint64(0)`.
    pub scratch: Box<[TypedValue; SCRATCH_SIZE]>,
    pub intcblock: Vec<u64>,
    pub bytecblock: Vec<Vec<u8>>,
    /// Program arguments for `arg`.
    pub args: Vec<TypedValue>,
    /// The current transaction.
    pub txn: TxnFields,
    /// The transaction group, in group order.
    pub gtxn: Vec<TxnFields>,
    pub globals: BTreeMap<String, TypedValue>,
    pub ledger: Ledger,
    pub logs: Vec<Vec<u8>>,
    /// Active program version, set by the pragma.
    pub version: u8,
    pub budget: u64,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            scratch: Box::new(std::array::from_fn(|_| TypedValue::zero())),
            intcblock: Vec::new(),
            bytecblock: Vec::new(),
            args: Vec::new(),
            txn: TxnFields::new(),
            gtxn: Vec::new(),
            globals: BTreeMap::new(),
            ledger: Ledger::default(),
            logs: Vec::new(),
            version: 0,
            budget: DEFAULT_COST_BUDGET,
        }
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    // ==================== Stack ====================

    pub fn push(&mut self, value: impl Into<TypedValue>) {
        self.stack.push(value.into());
    }

    pub fn pop(&mut self, instr: &'static str) -> Result<TypedValue, VMError> {
        self.stack.pop().ok_or(VMError::StackUnderflow {
            opcode: instr,
            required: 1,
            actual: 0,
        })
    }

    pub fn pop_uint(&mut self, instr: &'static str) -> Result<u64, VMError> {
        match self.pop(instr)? {
            TypedValue::Uint64(v) => Ok(v),
            other => Err(VMError::TypeMismatch {
                opcode: instr,
                expected: "uint64",
                actual: other.type_name(),
            }),
        }
    }

    pub fn pop_bytes(&mut self, instr: &'static str) -> Result<Vec<u8>, VMError> {
        match self.pop(instr)? {
            TypedValue::Bytes(v) => Ok(v),
            other => Err(VMError::TypeMismatch {
                opcode: instr,
                expected: "bytes",
                actual: other.type_name(),
            }),
        }
    }

    /// Checks that at least `required` values are on the stack.
    pub fn require(&self, instr: &'static str, required: usize) -> Result<(), VMError> {
        if self.stack.len() < required {
            return Err(VMError::StackUnderflow {
                opcode: instr,
                required,
                actual: self.stack.len(),
            });
        }
        Ok(())
    }

    // ==================== Transaction fields ====================

    /// Returns group transaction `index`.
    pub fn group_txn(&self, index: u64) -> Result<&TxnFields, VMError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.gtxn.get(i))
            .ok_or(VMError::GroupIndexOutOfRange {
                index,
                len: self.gtxn.len(),
            })
    }

    /// Reads a global field; `GroupSize` defaults to the number of group transactions.
    pub fn global(&self, field: &str) -> Result<TypedValue, VMError> {
        if let Some(value) = self.globals.get(field) {
            return Ok(value.clone());
        }
        if field == GROUP_SIZE_FIELD {
            return Ok(TypedValue::Uint64(self.gtxn.len() as u64));
        }
        Err(VMError::MissingGlobal {
            field: field.to_string(),
        })
    }

    // ==================== Ledger ====================

    /// Resolves an account reference popped from the stack to its ledger key.
    ///
    /// `Uint64(0)` is the sender, `Uint64(i)` is `Accounts[i-1]` of the current
    /// transaction. Byte values name the account directly: 32 bytes are
    /// rendered as address text, anything else as UTF-8.
    pub fn resolve_account(&self, instr: &'static str, value: TypedValue) -> Result<String, VMError> {
        let bytes = match value {
            TypedValue::Uint64(0) => scalar_field(&self.txn, "txn", SENDER_FIELD, instr)?.clone(),
            TypedValue::Uint64(i) => {
                let index = usize::try_from(i - 1).unwrap_or(usize::MAX);
                array_field(&self.txn, "txn", ACCOUNTS_FIELD, index, instr)?.clone()
            }
            bytes => bytes,
        };
        Ok(account_name(&bytes))
    }

    /// Appends a log entry, enforcing the per-run limits.
    pub fn log(&mut self, entry: Vec<u8>) -> Result<(), VMError> {
        if self.logs.len() >= MAX_LOG_CALLS {
            return Err(VMError::LogLimitExceeded {
                reason: format!("more than {MAX_LOG_CALLS} log calls"),
            });
        }
        let total: usize = self.logs.iter().map(Vec::len).sum::<usize>() + entry.len();
        if total > MAX_LOG_SIZE {
            return Err(VMError::LogLimitExceeded {
                reason: format!("{total} bytes logged, at most {MAX_LOG_SIZE} are allowed"),
            });
        }
        self.logs.push(entry);
        Ok(())
    }
}

/// Ledger key for an account given as a stack value.
fn account_name(value: &TypedValue) -> String {
    match value {
        TypedValue::Uint64(v) => v.to_string(),
        TypedValue::Bytes(b) if b.len() == ADDRESS_LEN => Address::from_slice(b)
            .map(|a| a.to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(b).into_owned()),
        TypedValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// Reads a scalar transaction field; `txn` names the transaction in error messages.
pub fn scalar_field<'a>(
    fields: &'a TxnFields,
    txn: &str,
    field: &str,
    opcode: &'static str,
) -> Result<&'a TypedValue, VMError> {
    match fields.get(field) {
        Some(FieldValue::Scalar(v)) => Ok(v),
        Some(FieldValue::Array(_)) => Err(VMError::NotAScalarField {
            field: field.to_string(),
            opcode,
        }),
        None => Err(VMError::MissingTxnField {
            field: field.to_string(),
            txn: txn.to_string(),
        }),
    }
}

/// Reads element `index` of an array transaction field.
pub fn array_field<'a>(
    fields: &'a TxnFields,
    txn: &str,
    field: &str,
    index: usize,
    opcode: &'static str,
) -> Result<&'a TypedValue, VMError> {
    match fields.get(field) {
        Some(FieldValue::Array(items)) => items.get(index).ok_or(VMError::FieldIndexOutOfRange {
            field: field.to_string(),
            index,
            len: items.len(),
        }),
        Some(FieldValue::Scalar(_)) => Err(VMError::NotAnArrayField {
            field: field.to_string(),
            opcode,
        }),
        None => Err(VMError::MissingTxnField {
            field: field.to_string(),
            txn: txn.to_string(),
        }),
    }
}
