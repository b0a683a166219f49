//! TEAL interpreter library.
//!
//! Parses TEAL assembly and evaluates it against a simulated transaction and
//! ledger context, producing an approve/reject verdict.

pub mod config;
pub mod crypto;
pub mod types;
pub mod utils;
pub mod virtual_machine;

pub use types::value::TypedValue;
pub use virtual_machine::assembler::parse;
pub use virtual_machine::errors::VMError;
pub use virtual_machine::vm::context::ExecutionContext;
pub use virtual_machine::vm::{ExecuteResult, execute};
