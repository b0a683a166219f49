//! TEAL execution engine.
//!
//! The engine walks a parsed [`Program`] with an instruction pointer. For each
//! instruction it checks the required stack depth, charges the opcode's
//! version-tiered cost against the budget and dispatches to an `op_*` handler.
//! Handlers either fall through to the next instruction or produce a [`Flow`]
//! that jumps or halts.
//!
//! A run succeeds only if the final stack holds exactly one `uint64`; the
//! verdict is whether that value is non-zero. Integer arithmetic never wraps:
//! overflow, underflow and division by zero are errors.

mod bytemath;
pub mod context;
pub mod cost;

use crate::crypto::hashes::{keccak256, sha256, sha512_256};
use crate::crypto::signatures::{SignatureError, ed25519_verify, secp256k1_verify};
use crate::types::value::TypedValue;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::operand::{AssetHoldingField, AssetParamsField, EcdsaCurve};
use crate::virtual_machine::program::{Instruction, Program};
use context::{CallFrame, ExecutionContext, array_field, scalar_field};
use cost::{CostMeter, CostProfile};
use std::cmp::Ordering;
use std::ops::Range;

/// Largest byte string `concat` and `bzero` may produce.
pub const MAX_BYTES_LEN: usize = 4096;

/// Deepest `callsub` nesting before the run faults.
pub const MAX_CALL_DEPTH: usize = 1024;

/// What the engine does after an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Jump to an absolute instruction index; the program length ends the run.
    Jump(usize),
    /// Stop and judge the stack as it is.
    Halt,
}

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct ExecuteResult {
    pub verdict: bool,
    pub stack: Vec<TypedValue>,
    pub scratch: Vec<TypedValue>,
    pub logs: Vec<Vec<u8>>,
    /// Total opcode cost charged.
    pub cost: u64,
    pub profile: CostProfile,
}

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        op = $op:expr,
        instr = $instr:ident,
        {
            $(
                $variant:ident => $handler:ident ( $( $field:ident : $how:ident ),* $(,)? ) $( -> $flow:ident )?
            ),* $(,)?
        }
        fixed {
            $( $fvariant:ident => $fhandler:ident ( $( $arg:expr ),* ) ),* $(,)?
        }
    ) => {{
        match $op {
            $(
                Opcode::$variant { $( $field ),* } => {
                    exec_vm!(@ret [ $( $flow )? ] $vm.$handler($instr $( , exec_vm!(@arg $how $field) )* ))
                }
            )*
            $(
                Opcode::$fvariant {} => $vm.$fhandler($instr $( , $arg )*).map(|()| Flow::Continue),
            )*
        }
    }};

    // Operand passed by value
    (@arg Copy $field:ident) => { *$field };
    // Operand passed by reference
    (@arg Ref $field:ident) => { $field };

    // Handler decides the flow itself
    (@ret [ flow ] $call:expr) => { $call };
    // Handler always falls through
    (@ret [] $call:expr) => { $call.map(|()| Flow::Continue) };
}

/// Runs `program` against `ctx` to completion.
///
/// The context keeps the final stack, scratch space, logs and any ledger
/// mutations; the result carries copies plus the verdict and cost.
pub fn execute(program: &Program, ctx: &mut ExecutionContext) -> Result<ExecuteResult, VMError> {
    let meter = {
        let mut vm = VM::new(ctx);
        vm.run(program)?;
        vm.meter
    };
    let verdict = final_verdict(&ctx.stack)?;
    Ok(ExecuteResult {
        verdict,
        stack: ctx.stack.clone(),
        scratch: ctx.scratch.to_vec(),
        logs: ctx.logs.clone(),
        cost: meter.used(),
        profile: meter.into_profile(),
    })
}

/// Judges the final stack: exactly one `uint64`, true if non-zero.
fn final_verdict(stack: &[TypedValue]) -> Result<bool, VMError> {
    match stack {
        [value] => value.is_truthy().ok_or_else(|| VMError::InvalidFinalStack {
            found: format!("a {} value", value.type_name()),
        }),
        [] => Err(VMError::InvalidFinalStack {
            found: "an empty stack".to_string(),
        }),
        values => Err(VMError::InvalidFinalStack {
            found: format!("{} values", values.len()),
        }),
    }
}

/// Checks `start..end` lies within a value of length `len`.
fn byte_range(instr: &'static str, len: usize, start: u64, end: u64) -> Result<Range<usize>, VMError> {
    if start > end || end > len as u64 {
        return Err(VMError::OutOfBounds {
            opcode: instr,
            start,
            end,
            len,
        });
    }
    Ok(start as usize..end as usize)
}

fn crypto_input(instr: &'static str) -> impl FnOnce(SignatureError) -> VMError {
    move |source| VMError::InvalidInputLength {
        opcode: instr,
        source,
    }
}

/// Stack interpreter for one run.
pub struct VM<'c> {
    ctx: &'c mut ExecutionContext,
    /// Index of the instruction being executed.
    ip: usize,
    call_stack: Vec<CallFrame>,
    meter: CostMeter,
}

impl<'c> VM<'c> {
    pub fn new(ctx: &'c mut ExecutionContext) -> Self {
        let meter = CostMeter::new(ctx.budget);
        Self {
            ctx,
            ip: 0,
            call_stack: Vec::new(),
            meter,
        }
    }

    /// Executes instructions until the end of the program or a halt.
    ///
    /// Errors are tagged with the source line of the failing instruction.
    pub fn run(&mut self, program: &Program) -> Result<(), VMError> {
        self.ip = 0;
        while let Some(instr) = program.get(self.ip) {
            let flow = self.step(instr).map_err(|e| e.at_line(instr.line))?;
            match flow {
                Flow::Continue => self.ip += 1,
                Flow::Jump(target) => self.ip = target,
                Flow::Halt => break,
            }
        }
        Ok(())
    }

    fn step(&mut self, instr: &Instruction) -> Result<Flow, VMError> {
        let def = instr.def;
        self.ctx.require(def.mnemonic, def.stack)?;
        self.meter.charge(def.key, def.cost.at(self.ctx.version))?;
        crate::trace!(
            "{:>4} line {:<4} {:<18} stack={} cost={}",
            self.ip,
            instr.line,
            def.mnemonic,
            self.ctx.stack.len(),
            self.meter.used()
        );
        self.exec(def.mnemonic, &instr.op)
    }

    /// Executes a single instruction.
    fn exec(&mut self, name: &'static str, op: &Opcode) -> Result<Flow, VMError> {
        exec_vm! {
            vm = self,
            op = op,
            instr = name,
            {
                // Directives and pseudo-ops
                Pragma => op_pragma(version: Copy),
                Int => op_push_uint(value: Copy),
                PushInt => op_push_uint(value: Copy),
                Byte => op_push_bytes(value: Ref),
                PushBytes => op_push_bytes(value: Ref),
                Addr => op_push_bytes(value: Ref),
                // Flow control
                Fail => op_err() -> flow,
                Bnz => op_bnz(target: Copy) -> flow,
                Bz => op_bz(target: Copy) -> flow,
                Branch => op_b(target: Copy) -> flow,
                Return => op_return() -> flow,
                Assert => op_assert(),
                Callsub => op_callsub(target: Copy) -> flow,
                Retsub => op_retsub() -> flow,
                // Cryptography
                Sha256 => op_sha256(),
                Keccak256 => op_keccak256(),
                Sha512_256 => op_sha512_256(),
                Ed25519Verify => op_ed25519verify(),
                EcdsaVerify => op_ecdsa_verify(curve: Copy),
                // Integer arithmetic
                Add => op_add(),
                Sub => op_sub(),
                Div => op_div(),
                Mul => op_mul(),
                Mod => op_mod(),
                Mulw => op_mulw(),
                Addw => op_addw(),
                Sqrt => op_sqrt(),
                Exp => op_exp(),
                Expw => op_expw(),
                Bitlen => op_bitlen(),
                // Comparison and logic
                Lt => op_lt(),
                Gt => op_gt(),
                Le => op_le(),
                Ge => op_ge(),
                And => op_and(),
                Or => op_or(),
                Eq => op_eq(),
                Neq => op_neq(),
                Not => op_not(),
                // Bitwise
                BitOr => op_bit_or(),
                BitAnd => op_bit_and(),
                BitXor => op_bit_xor(),
                BitNot => op_bit_not(),
                Shl => op_shl(),
                Shr => op_shr(),
                // Conversions and bytes
                Len => op_len(),
                Itob => op_itob(),
                Btoi => op_btoi(),
                Concat => op_concat(),
                Substring => op_substring(start: Copy, end: Copy),
                Substring3 => op_substring3(),
                GetBit => op_getbit(),
                SetBit => op_setbit(),
                GetByte => op_getbyte(),
                SetByte => op_setbyte(),
                Bzero => op_bzero(),
                Extract => op_extract(start: Copy, length: Copy),
                Extract3 => op_extract3(),
                // Byte-string math
                BAdd => op_bmath_add(),
                BSub => op_bmath_sub(),
                BMul => op_bmath_mul(),
                BDiv => op_bmath_div(),
                BMod => op_bmath_mod(),
                BLt => op_bmath_lt(),
                BGt => op_bmath_gt(),
                BLe => op_bmath_le(),
                BGe => op_bmath_ge(),
                BEq => op_bmath_eq(),
                BNeq => op_bmath_neq(),
                BOr => op_bmath_or(),
                BAnd => op_bmath_and(),
                BXor => op_bmath_xor(),
                BNot => op_bmath_not(),
                // Stack manipulation
                Pop => op_pop(),
                Dup => op_dup(),
                Dup2 => op_dup2(),
                Swap => op_swap(),
                Select => op_select(),
                Dig => op_dig(depth: Copy),
                Cover => op_cover(depth: Copy),
                Uncover => op_uncover(depth: Copy),
                // Constants and arguments
                Intcblock => op_intcblock(values: Ref),
                Intc => op_intc(index: Copy),
                Bytecblock => op_bytecblock(values: Ref),
                Bytec => op_bytec(index: Copy),
                Arg => op_arg(index: Copy),
                // Scratch space
                Load => op_load(slot: Copy),
                Store => op_store(slot: Copy),
                // Transaction and global fields
                Txn => op_txn(field: Ref),
                Global => op_global(field: Ref),
                Gtxn => op_gtxn(group: Copy, field: Ref),
                Txna => op_txna(field: Ref, index: Copy),
                Gtxna => op_gtxna(group: Copy, field: Ref, index: Copy),
                Gtxns => op_gtxns(field: Ref),
                Gtxnsa => op_gtxnsa(field: Ref, index: Copy),
                // Ledger state
                Balance => op_balance(),
                MinBalance => op_min_balance(),
                AppOptedIn => op_app_opted_in(),
                AppLocalGet => op_app_local_get(),
                AppLocalGetEx => op_app_local_get_ex(),
                AppGlobalGet => op_app_global_get(),
                AppGlobalGetEx => op_app_global_get_ex(),
                AppLocalPut => op_app_local_put(),
                AppGlobalPut => op_app_global_put(),
                AppLocalDel => op_app_local_del(),
                AppGlobalDel => op_app_global_del(),
                AssetHoldingGet => op_asset_holding_get(field: Copy),
                AssetParamsGet => op_asset_params_get(field: Copy),
                Log => op_log(),
            }
            fixed {
                Intc0 => op_intc(0),
                Intc1 => op_intc(1),
                Intc2 => op_intc(2),
                Intc3 => op_intc(3),
                Bytec0 => op_bytec(0),
                Bytec1 => op_bytec(1),
                Bytec2 => op_bytec(2),
                Bytec3 => op_bytec(3),
                Arg0 => op_arg(0),
                Arg1 => op_arg(1),
                Arg2 => op_arg(2),
                Arg3 => op_arg(3),
                ExtractUint16 => op_extract_uint(2),
                ExtractUint32 => op_extract_uint(4),
                ExtractUint64 => op_extract_uint(8),
            }
        }
    }

    // ==================== Helpers ====================

    /// Pops `B` then `A` and pushes `f(A, B)`.
    fn binary_uint(
        &mut self,
        instr: &'static str,
        f: impl FnOnce(u64, u64) -> Result<TypedValue, VMError>,
    ) -> Result<(), VMError> {
        let b = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_uint(instr)?;
        let result = f(a, b)?;
        self.ctx.push(result);
        Ok(())
    }

    /// Pops byte strings `B` then `A` and pushes `f(A, B)`.
    fn binary_bytes(
        &mut self,
        instr: &'static str,
        f: impl FnOnce(&[u8], &[u8]) -> Result<TypedValue, VMError>,
    ) -> Result<(), VMError> {
        let b = self.ctx.pop_bytes(instr)?;
        let a = self.ctx.pop_bytes(instr)?;
        let result = f(&a, &b)?;
        self.ctx.push(result);
        Ok(())
    }

    fn compare_bytes(&mut self, instr: &'static str, accept: fn(Ordering) -> bool) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| {
            Ok(TypedValue::from(accept(bytemath::compare(instr, a, b)?)))
        })
    }

    /// Pops `B` then `A`, requiring both to have the same type.
    fn pop_same_type(&mut self, instr: &'static str) -> Result<(TypedValue, TypedValue), VMError> {
        let b = self.ctx.pop(instr)?;
        let a = self.ctx.pop(instr)?;
        if std::mem::discriminant(&a) != std::mem::discriminant(&b) {
            return Err(VMError::TypeMismatch {
                opcode: instr,
                expected: a.type_name(),
                actual: b.type_name(),
            });
        }
        Ok((a, b))
    }

    fn pop_account(&mut self, instr: &'static str) -> Result<String, VMError> {
        let value = self.ctx.pop(instr)?;
        self.ctx.resolve_account(instr, value)
    }

    /// Pushes a looked-up value (or zero) followed by a found flag.
    fn push_with_flag(&mut self, value: Option<TypedValue>) {
        let found = value.is_some();
        self.ctx.push(value.unwrap_or_default());
        self.ctx.push(found);
    }

    fn split_u128(&mut self, v: u128) {
        self.ctx.push((v >> 64) as u64);
        self.ctx.push(v as u64);
    }

    /// Number of stack values an immediate depth operand reaches.
    fn require_depth(&self, instr: &'static str, depth: u8) -> Result<usize, VMError> {
        let reach = depth as usize + 1;
        self.ctx.require(instr, reach)?;
        Ok(self.ctx.stack.len() - reach)
    }

    // ==================== Directives and pseudo-ops ====================

    fn op_pragma(&mut self, _instr: &'static str, version: u64) -> Result<(), VMError> {
        self.ctx.version = version as u8;
        Ok(())
    }

    fn op_push_uint(&mut self, _instr: &'static str, value: u64) -> Result<(), VMError> {
        self.ctx.push(value);
        Ok(())
    }

    fn op_push_bytes(&mut self, _instr: &'static str, value: &[u8]) -> Result<(), VMError> {
        self.ctx.push(value);
        Ok(())
    }

    // ==================== Flow control ====================

    fn op_err(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        Err(VMError::ProgramError)
    }

    fn op_bnz(&mut self, instr: &'static str, target: usize) -> Result<Flow, VMError> {
        if self.ctx.pop_uint(instr)? != 0 {
            return Ok(Flow::Jump(target));
        }
        Ok(Flow::Continue)
    }

    fn op_bz(&mut self, instr: &'static str, target: usize) -> Result<Flow, VMError> {
        if self.ctx.pop_uint(instr)? == 0 {
            return Ok(Flow::Jump(target));
        }
        Ok(Flow::Continue)
    }

    fn op_b(&mut self, _instr: &'static str, target: usize) -> Result<Flow, VMError> {
        Ok(Flow::Jump(target))
    }

    fn op_return(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }

    fn op_assert(&mut self, instr: &'static str) -> Result<(), VMError> {
        if self.ctx.pop_uint(instr)? == 0 {
            return Err(VMError::AssertionFailed);
        }
        Ok(())
    }

    fn op_callsub(&mut self, _instr: &'static str, target: usize) -> Result<Flow, VMError> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(VMError::CallStackOverflow {
                max: MAX_CALL_DEPTH,
            });
        }
        self.call_stack.push(CallFrame {
            return_addr: self.ip + 1,
        });
        Ok(Flow::Jump(target))
    }

    fn op_retsub(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let frame = self.call_stack.pop().ok_or(VMError::ReturnWithoutCall)?;
        Ok(Flow::Jump(frame.return_addr))
    }

    // ==================== Cryptography ====================

    fn op_sha256(&mut self, instr: &'static str) -> Result<(), VMError> {
        let data = self.ctx.pop_bytes(instr)?;
        self.ctx.push(sha256(&data).to_vec());
        Ok(())
    }

    fn op_keccak256(&mut self, instr: &'static str) -> Result<(), VMError> {
        let data = self.ctx.pop_bytes(instr)?;
        self.ctx.push(keccak256(&data).to_vec());
        Ok(())
    }

    fn op_sha512_256(&mut self, instr: &'static str) -> Result<(), VMError> {
        let data = self.ctx.pop_bytes(instr)?;
        self.ctx.push(sha512_256(&data).to_vec());
        Ok(())
    }

    fn op_ed25519verify(&mut self, instr: &'static str) -> Result<(), VMError> {
        let public_key = self.ctx.pop_bytes(instr)?;
        let signature = self.ctx.pop_bytes(instr)?;
        let data = self.ctx.pop_bytes(instr)?;
        let valid = ed25519_verify(&data, &signature, &public_key).map_err(crypto_input(instr))?;
        self.ctx.push(valid);
        Ok(())
    }

    fn op_ecdsa_verify(&mut self, instr: &'static str, curve: EcdsaCurve) -> Result<(), VMError> {
        let y = self.ctx.pop_bytes(instr)?;
        let x = self.ctx.pop_bytes(instr)?;
        let s = self.ctx.pop_bytes(instr)?;
        let r = self.ctx.pop_bytes(instr)?;
        let data = self.ctx.pop_bytes(instr)?;
        let valid = match curve {
            EcdsaCurve::Secp256k1 => secp256k1_verify(&data, &r, &s, &x, &y),
        }
        .map_err(crypto_input(instr))?;
        self.ctx.push(valid);
        Ok(())
    }

    // ==================== Integer arithmetic ====================

    fn op_add(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            a.checked_add(b)
                .map(TypedValue::Uint64)
                .ok_or(VMError::Overflow { opcode: instr })
        })
    }

    fn op_sub(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            a.checked_sub(b)
                .map(TypedValue::Uint64)
                .ok_or(VMError::Underflow { opcode: instr })
        })
    }

    fn op_mul(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            a.checked_mul(b)
                .map(TypedValue::Uint64)
                .ok_or(VMError::Overflow { opcode: instr })
        })
    }

    fn op_div(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            a.checked_div(b)
                .map(TypedValue::Uint64)
                .ok_or(VMError::DivisionByZero { opcode: instr })
        })
    }

    fn op_mod(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            a.checked_rem(b)
                .map(TypedValue::Uint64)
                .ok_or(VMError::DivisionByZero { opcode: instr })
        })
    }

    fn op_mulw(&mut self, instr: &'static str) -> Result<(), VMError> {
        let b = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_uint(instr)?;
        self.split_u128(a as u128 * b as u128);
        Ok(())
    }

    fn op_addw(&mut self, instr: &'static str) -> Result<(), VMError> {
        let b = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_uint(instr)?;
        self.split_u128(a as u128 + b as u128);
        Ok(())
    }

    fn op_sqrt(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_uint(instr)?;
        self.ctx.push(a.isqrt());
        Ok(())
    }

    fn op_exp(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| {
            if a == 0 && b == 0 {
                return Err(VMError::InvalidOperand {
                    opcode: instr,
                    reason: "0 raised to 0 is undefined".to_string(),
                });
            }
            u32::try_from(b)
                .ok()
                .and_then(|b| a.checked_pow(b))
                .or_else(|| (a <= 1).then_some(a))
                .map(TypedValue::Uint64)
                .ok_or(VMError::Overflow { opcode: instr })
        })
    }

    fn op_expw(&mut self, instr: &'static str) -> Result<(), VMError> {
        let b = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_uint(instr)?;
        if a == 0 && b == 0 {
            return Err(VMError::InvalidOperand {
                opcode: instr,
                reason: "0 raised to 0 is undefined".to_string(),
            });
        }
        let result = u32::try_from(b)
            .ok()
            .and_then(|b| (a as u128).checked_pow(b))
            .or_else(|| (a <= 1).then_some(a as u128))
            .ok_or(VMError::Overflow { opcode: instr })?;
        self.split_u128(result);
        Ok(())
    }

    fn op_bitlen(&mut self, instr: &'static str) -> Result<(), VMError> {
        let bits = match self.ctx.pop(instr)? {
            TypedValue::Uint64(v) => (u64::BITS - v.leading_zeros()) as u64,
            TypedValue::Bytes(b) => match b.iter().position(|x| *x != 0) {
                Some(i) => ((b.len() - i - 1) * 8) as u64 + (u8::BITS - b[i].leading_zeros()) as u64,
                None => 0,
            },
        };
        self.ctx.push(bits);
        Ok(())
    }

    // ==================== Comparison and logic ====================

    fn op_lt(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a < b).into()))
    }

    fn op_gt(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a > b).into()))
    }

    fn op_le(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a <= b).into()))
    }

    fn op_ge(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a >= b).into()))
    }

    fn op_and(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a != 0 && b != 0).into()))
    }

    fn op_or(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a != 0 || b != 0).into()))
    }

    fn op_eq(&mut self, instr: &'static str) -> Result<(), VMError> {
        let (a, b) = self.pop_same_type(instr)?;
        self.ctx.push(a == b);
        Ok(())
    }

    fn op_neq(&mut self, instr: &'static str) -> Result<(), VMError> {
        let (a, b) = self.pop_same_type(instr)?;
        self.ctx.push(a != b);
        Ok(())
    }

    fn op_not(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_uint(instr)?;
        self.ctx.push(a == 0);
        Ok(())
    }

    // ==================== Bitwise ====================

    fn op_bit_or(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a | b).into()))
    }

    fn op_bit_and(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a & b).into()))
    }

    fn op_bit_xor(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| Ok((a ^ b).into()))
    }

    fn op_bit_not(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_uint(instr)?;
        self.ctx.push(!a);
        Ok(())
    }

    fn op_shl(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| shift(instr, b).map(|s| (a << s).into()))
    }

    fn op_shr(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_uint(instr, |a, b| shift(instr, b).map(|s| (a >> s).into()))
    }

    // ==================== Conversions and bytes ====================

    fn op_len(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_bytes(instr)?;
        self.ctx.push(a.len() as u64);
        Ok(())
    }

    fn op_itob(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_uint(instr)?;
        self.ctx.push(a.to_be_bytes().to_vec());
        Ok(())
    }

    fn op_btoi(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_bytes(instr)?;
        if a.len() > 8 {
            return Err(VMError::BytesTooLong {
                opcode: instr,
                max: 8,
                actual: a.len(),
            });
        }
        let value = a.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        self.ctx.push(value);
        Ok(())
    }

    fn op_concat(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| {
            let len = a.len() + b.len();
            if len > MAX_BYTES_LEN {
                return Err(VMError::BytesTooLong {
                    opcode: instr,
                    max: MAX_BYTES_LEN,
                    actual: len,
                });
            }
            Ok([a, b].concat().into())
        })
    }

    fn op_substring(&mut self, instr: &'static str, start: u8, end: u8) -> Result<(), VMError> {
        let a = self.ctx.pop_bytes(instr)?;
        let range = byte_range(instr, a.len(), start as u64, end as u64)?;
        self.ctx.push(&a[range]);
        Ok(())
    }

    fn op_substring3(&mut self, instr: &'static str) -> Result<(), VMError> {
        let end = self.ctx.pop_uint(instr)?;
        let start = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_bytes(instr)?;
        let range = byte_range(instr, a.len(), start, end)?;
        self.ctx.push(&a[range]);
        Ok(())
    }

    fn op_getbit(&mut self, instr: &'static str) -> Result<(), VMError> {
        let index = self.ctx.pop_uint(instr)?;
        let bit = match self.ctx.pop(instr)? {
            TypedValue::Uint64(v) => {
                byte_range(instr, u64::BITS as usize, index, index.saturating_add(1))?;
                (v >> index) & 1
            }
            TypedValue::Bytes(b) => {
                byte_range(instr, b.len() * 8, index, index.saturating_add(1))?;
                let byte = b[(index / 8) as usize];
                ((byte >> (7 - index % 8)) & 1) as u64
            }
        };
        self.ctx.push(bit);
        Ok(())
    }

    fn op_setbit(&mut self, instr: &'static str) -> Result<(), VMError> {
        let bit = self.ctx.pop_uint(instr)?;
        let index = self.ctx.pop_uint(instr)?;
        if bit > 1 {
            return Err(VMError::InvalidOperand {
                opcode: instr,
                reason: format!("bit value must be 0 or 1, got {bit}"),
            });
        }
        let result = match self.ctx.pop(instr)? {
            TypedValue::Uint64(v) => {
                byte_range(instr, u64::BITS as usize, index, index.saturating_add(1))?;
                let mask = 1u64 << index;
                TypedValue::Uint64(if bit == 1 { v | mask } else { v & !mask })
            }
            TypedValue::Bytes(mut b) => {
                byte_range(instr, b.len() * 8, index, index.saturating_add(1))?;
                let mask = 0x80u8 >> (index % 8);
                let byte = &mut b[(index / 8) as usize];
                *byte = if bit == 1 { *byte | mask } else { *byte & !mask };
                TypedValue::Bytes(b)
            }
        };
        self.ctx.push(result);
        Ok(())
    }

    fn op_getbyte(&mut self, instr: &'static str) -> Result<(), VMError> {
        let index = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_bytes(instr)?;
        let range = byte_range(instr, a.len(), index, index.saturating_add(1))?;
        self.ctx.push(a[range.start] as u64);
        Ok(())
    }

    fn op_setbyte(&mut self, instr: &'static str) -> Result<(), VMError> {
        let value = self.ctx.pop_uint(instr)?;
        let index = self.ctx.pop_uint(instr)?;
        let mut a = self.ctx.pop_bytes(instr)?;
        let value = u8::try_from(value).map_err(|_| VMError::InvalidOperand {
            opcode: instr,
            reason: format!("byte value must be at most 255, got {value}"),
        })?;
        let range = byte_range(instr, a.len(), index, index.saturating_add(1))?;
        a[range.start] = value;
        self.ctx.push(a);
        Ok(())
    }

    fn op_bzero(&mut self, instr: &'static str) -> Result<(), VMError> {
        let len = self.ctx.pop_uint(instr)?;
        if len > MAX_BYTES_LEN as u64 {
            return Err(VMError::BytesTooLong {
                opcode: instr,
                max: MAX_BYTES_LEN,
                actual: usize::try_from(len).unwrap_or(usize::MAX),
            });
        }
        self.ctx.push(vec![0u8; len as usize]);
        Ok(())
    }

    fn op_extract(&mut self, instr: &'static str, start: u8, length: u8) -> Result<(), VMError> {
        let a = self.ctx.pop_bytes(instr)?;
        let start = start as u64;
        let end = match length {
            0 => (a.len() as u64).max(start),
            n => start + n as u64,
        };
        let range = byte_range(instr, a.len(), start, end)?;
        self.ctx.push(&a[range]);
        Ok(())
    }

    fn op_extract3(&mut self, instr: &'static str) -> Result<(), VMError> {
        let length = self.ctx.pop_uint(instr)?;
        let start = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_bytes(instr)?;
        let range = byte_range(instr, a.len(), start, start.saturating_add(length))?;
        self.ctx.push(&a[range]);
        Ok(())
    }

    /// Reads a big-endian unsigned integer of `width` bytes.
    fn op_extract_uint(&mut self, instr: &'static str, width: u64) -> Result<(), VMError> {
        let start = self.ctx.pop_uint(instr)?;
        let a = self.ctx.pop_bytes(instr)?;
        let range = byte_range(instr, a.len(), start, start.saturating_add(width))?;
        let value = a[range].iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        self.ctx.push(value);
        Ok(())
    }

    // ==================== Byte-string math ====================

    fn op_bmath_add(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::add(instr, a, b).map(Into::into))
    }

    fn op_bmath_sub(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::sub(instr, a, b).map(Into::into))
    }

    fn op_bmath_mul(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::mul(instr, a, b).map(Into::into))
    }

    fn op_bmath_div(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::div(instr, a, b).map(Into::into))
    }

    fn op_bmath_mod(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::rem(instr, a, b).map(Into::into))
    }

    fn op_bmath_lt(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_lt)
    }

    fn op_bmath_gt(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_gt)
    }

    fn op_bmath_le(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_le)
    }

    fn op_bmath_ge(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_ge)
    }

    fn op_bmath_eq(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_eq)
    }

    fn op_bmath_neq(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.compare_bytes(instr, Ordering::is_ne)
    }

    fn op_bmath_or(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::bitwise(instr, a, b, |x, y| x | y).map(Into::into))
    }

    fn op_bmath_and(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::bitwise(instr, a, b, |x, y| x & y).map(Into::into))
    }

    fn op_bmath_xor(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.binary_bytes(instr, |a, b| bytemath::bitwise(instr, a, b, |x, y| x ^ y).map(Into::into))
    }

    fn op_bmath_not(&mut self, instr: &'static str) -> Result<(), VMError> {
        let a = self.ctx.pop_bytes(instr)?;
        self.ctx.push(bytemath::not(instr, &a)?);
        Ok(())
    }

    // ==================== Stack manipulation ====================

    fn op_pop(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.ctx.pop(instr)?;
        Ok(())
    }

    fn op_dup(&mut self, instr: &'static str) -> Result<(), VMError> {
        self.op_dig(instr, 0)
    }

    fn op_dup2(&mut self, instr: &'static str) -> Result<(), VMError> {
        let from = self.require_depth(instr, 1)?;
        self.ctx.stack.extend_from_within(from..);
        Ok(())
    }

    fn op_swap(&mut self, instr: &'static str) -> Result<(), VMError> {
        let from = self.require_depth(instr, 1)?;
        self.ctx.stack.swap(from, from + 1);
        Ok(())
    }

    fn op_select(&mut self, instr: &'static str) -> Result<(), VMError> {
        let c = self.ctx.pop_uint(instr)?;
        let b = self.ctx.pop(instr)?;
        let a = self.ctx.pop(instr)?;
        self.ctx.push(if c != 0 { b } else { a });
        Ok(())
    }

    fn op_dig(&mut self, instr: &'static str, depth: u8) -> Result<(), VMError> {
        let at = self.require_depth(instr, depth)?;
        let value = self.ctx.stack[at].clone();
        self.ctx.push(value);
        Ok(())
    }

    fn op_cover(&mut self, instr: &'static str, depth: u8) -> Result<(), VMError> {
        let at = self.require_depth(instr, depth)?;
        let top = self.ctx.pop(instr)?;
        self.ctx.stack.insert(at, top);
        Ok(())
    }

    fn op_uncover(&mut self, instr: &'static str, depth: u8) -> Result<(), VMError> {
        let at = self.require_depth(instr, depth)?;
        let value = self.ctx.stack.remove(at);
        self.ctx.push(value);
        Ok(())
    }

    // ==================== Constants and arguments ====================

    fn op_intcblock(&mut self, _instr: &'static str, values: &[u64]) -> Result<(), VMError> {
        self.ctx.intcblock = values.to_vec();
        Ok(())
    }

    fn op_intc(&mut self, instr: &'static str, index: u8) -> Result<(), VMError> {
        let value = self
            .ctx
            .intcblock
            .get(index as usize)
            .copied()
            .ok_or(VMError::ConstantIndexOutOfRange {
                opcode: instr,
                index: index as usize,
                len: self.ctx.intcblock.len(),
            })?;
        self.ctx.push(value);
        Ok(())
    }

    fn op_bytecblock(&mut self, _instr: &'static str, values: &[Vec<u8>]) -> Result<(), VMError> {
        self.ctx.bytecblock = values.to_vec();
        Ok(())
    }

    fn op_bytec(&mut self, instr: &'static str, index: u8) -> Result<(), VMError> {
        let value = self
            .ctx
            .bytecblock
            .get(index as usize)
            .cloned()
            .ok_or(VMError::ConstantIndexOutOfRange {
                opcode: instr,
                index: index as usize,
                len: self.ctx.bytecblock.len(),
            })?;
        self.ctx.push(value);
        Ok(())
    }

    fn op_arg(&mut self, _instr: &'static str, index: u8) -> Result<(), VMError> {
        let value = self
            .ctx
            .args
            .get(index as usize)
            .cloned()
            .ok_or(VMError::ArgIndexOutOfRange {
                index: index as usize,
                len: self.ctx.args.len(),
            })?;
        self.ctx.push(value);
        Ok(())
    }

    // ==================== Scratch space ====================

    fn op_load(&mut self, _instr: &'static str, slot: u8) -> Result<(), VMError> {
        let value = self.ctx.scratch[slot as usize].clone();
        self.ctx.push(value);
        Ok(())
    }

    fn op_store(&mut self, instr: &'static str, slot: u8) -> Result<(), VMError> {
        let value = self.ctx.pop(instr)?;
        self.ctx.scratch[slot as usize] = value;
        Ok(())
    }

    // ==================== Transaction and global fields ====================

    fn op_txn(&mut self, instr: &'static str, field: &str) -> Result<(), VMError> {
        let value = scalar_field(&self.ctx.txn, "txn", field, instr)?.clone();
        self.ctx.push(value);
        Ok(())
    }

    fn op_global(&mut self, _instr: &'static str, field: &str) -> Result<(), VMError> {
        let value = self.ctx.global(field)?;
        self.ctx.push(value);
        Ok(())
    }

    fn op_gtxn(&mut self, instr: &'static str, group: u8, field: &str) -> Result<(), VMError> {
        self.push_group_field(instr, group as u64, field, None)
    }

    fn op_txna(&mut self, instr: &'static str, field: &str, index: u8) -> Result<(), VMError> {
        let value = array_field(&self.ctx.txn, "txn", field, index as usize, instr)?.clone();
        self.ctx.push(value);
        Ok(())
    }

    fn op_gtxna(&mut self, instr: &'static str, group: u8, field: &str, index: u8) -> Result<(), VMError> {
        self.push_group_field(instr, group as u64, field, Some(index))
    }

    fn op_gtxns(&mut self, instr: &'static str, field: &str) -> Result<(), VMError> {
        let group = self.ctx.pop_uint(instr)?;
        self.push_group_field(instr, group, field, None)
    }

    fn op_gtxnsa(&mut self, instr: &'static str, field: &str, index: u8) -> Result<(), VMError> {
        let group = self.ctx.pop_uint(instr)?;
        self.push_group_field(instr, group, field, Some(index))
    }

    /// Pushes a scalar field, or element `index` of an array field, of group transaction `group`.
    fn push_group_field(
        &mut self,
        instr: &'static str,
        group: u64,
        field: &str,
        index: Option<u8>,
    ) -> Result<(), VMError> {
        let fields = self.ctx.group_txn(group)?;
        let txn = format!("gtxn {group}");
        let value = match index {
            Some(i) => array_field(fields, &txn, field, i as usize, instr)?,
            None => scalar_field(fields, &txn, field, instr)?,
        }
        .clone();
        self.ctx.push(value);
        Ok(())
    }

    // ==================== Ledger state ====================

    fn op_balance(&mut self, instr: &'static str) -> Result<(), VMError> {
        let account = self.pop_account(instr)?;
        let balance = self.ctx.ledger.balance(&account)?;
        self.ctx.push(balance);
        Ok(())
    }

    fn op_min_balance(&mut self, instr: &'static str) -> Result<(), VMError> {
        let account = self.pop_account(instr)?;
        let min_balance = self.ctx.ledger.min_balance(&account)?;
        self.ctx.push(min_balance);
        Ok(())
    }

    fn op_app_opted_in(&mut self, instr: &'static str) -> Result<(), VMError> {
        let app_id = self.ctx.pop_uint(instr)?;
        let account = self.pop_account(instr)?;
        let opted_in = self.ctx.ledger.opted_in(&account, app_id)?;
        self.ctx.push(opted_in);
        Ok(())
    }

    fn op_app_local_get(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        let account = self.pop_account(instr)?;
        let value = self.ctx.ledger.local_get(&account, 0, &key)?;
        self.ctx.push(value.unwrap_or_default());
        Ok(())
    }

    fn op_app_local_get_ex(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        let app_id = self.ctx.pop_uint(instr)?;
        let account = self.pop_account(instr)?;
        let value = self.ctx.ledger.local_get(&account, app_id, &key)?;
        self.push_with_flag(value);
        Ok(())
    }

    fn op_app_global_get(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        let value = self.ctx.ledger.global_get(0, &key)?;
        self.ctx.push(value.unwrap_or_default());
        Ok(())
    }

    fn op_app_global_get_ex(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        let app_id = self.ctx.pop_uint(instr)?;
        let value = self.ctx.ledger.global_get(app_id, &key)?;
        self.push_with_flag(value);
        Ok(())
    }

    fn op_app_local_put(&mut self, instr: &'static str) -> Result<(), VMError> {
        let value = self.ctx.pop(instr)?;
        let key = self.ctx.pop_bytes(instr)?;
        let account = self.pop_account(instr)?;
        self.ctx.ledger.local_put(&account, key, value)
    }

    fn op_app_global_put(&mut self, instr: &'static str) -> Result<(), VMError> {
        let value = self.ctx.pop(instr)?;
        let key = self.ctx.pop_bytes(instr)?;
        self.ctx.ledger.global_put(key, value)
    }

    fn op_app_local_del(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        let account = self.pop_account(instr)?;
        self.ctx.ledger.local_del(&account, &key)
    }

    fn op_app_global_del(&mut self, instr: &'static str) -> Result<(), VMError> {
        let key = self.ctx.pop_bytes(instr)?;
        self.ctx.ledger.global_del(&key)
    }

    fn op_asset_holding_get(&mut self, instr: &'static str, field: AssetHoldingField) -> Result<(), VMError> {
        let asset_id = self.ctx.pop_uint(instr)?;
        let account = self.pop_account(instr)?;
        let value = self.ctx.ledger.asset_holding(&account, asset_id, field)?;
        self.push_with_flag(value);
        Ok(())
    }

    fn op_asset_params_get(&mut self, instr: &'static str, field: AssetParamsField) -> Result<(), VMError> {
        let asset_id = self.ctx.pop_uint(instr)?;
        let value = self.ctx.ledger.asset_param(asset_id, field)?;
        self.push_with_flag(value);
        Ok(())
    }

    fn op_log(&mut self, instr: &'static str) -> Result<(), VMError> {
        let entry = self.ctx.pop_bytes(instr)?;
        self.ctx.log(entry)
    }
}

/// Validates a shift amount for `shl`/`shr`.
fn shift(instr: &'static str, amount: u64) -> Result<u32, VMError> {
    if amount >= u64::BITS as u64 {
        return Err(VMError::InvalidOperand {
            opcode: instr,
            reason: format!("shift amount must be below 64, got {amount}"),
        });
    }
    Ok(amount as u32)
}
