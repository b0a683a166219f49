//! TEAL assembler and stack interpreter.
//!
//! A program goes through two stages:
//!
//! - **Parse**: [`assembler::parse`] tokenizes the source, reads the version
//!   pragma, resolves labels and builds a [`program::Program`] of typed
//!   instructions. Every structural error is reported here, before anything runs.
//! - **Execute**: [`vm::execute`] runs the program against an
//!   [`vm::context::ExecutionContext`] supplied by the caller and returns the
//!   verdict, the final stack and scratch space, logs and the cost charged.
//!
//! # Modules
//!
//! - [`assembler`]: Two-pass parser and source diagnostics
//! - [`errors`]: Parse and execution error types
//! - [`isa`]: Opcode table with versions, costs and operand shapes
//! - [`operand`]: Typed operand parsing
//! - [`program`]: Parsed program representation
//! - [`state`]: Caller-supplied ledger view
//! - [`tokenizer`]: Line tokenizer
//! - [`vm`]: Execution engine and cost metering

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod state;
pub mod tokenizer;
pub mod vm;
