//! Opcode registry.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode definitions and invokes a callback macro for code generation, so the
//! registry, the assembler and the static checks all expand the same table.
//!
//! This module generates:
//! - The [`Mnemonic`] key enum and its string lookup
//! - The static [`OPCODE_DEFS`] table of [`OpcodeDef`]s
//! - The [`Opcode`] enum, one variant per mnemonic carrying its parsed operands
//!
//! See [`assembler`](super::assembler) for construction of [`Opcode`]s from
//! tokens.
//!
//! # Table format
//!
//! ```text
//! Name = "mnemonic" => [field: Kind, ...], since V, cost C, args A, stack S,
//! ```
//!
//! - `since`: first TEAL version with the mnemonic
//! - `cost`: flat cost, or `[v1, v2, ...]` per-version tiers (last tier sticks)
//! - `args`: operand count, `[a, b]` for a set of counts, `*` for any
//! - `stack`: values that must be on the stack before execution

use crate::virtual_machine::operand::{AssetHoldingField, AssetParamsField, EcdsaCurve};

/// Highest TEAL version this interpreter accepts.
pub const MAX_VERSION: u8 = 5;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Directives and pseudo-ops
            // =========================
            /// #pragma version N ; sets the program version
            Pragma = "#pragma" => [version: Version], since 1, cost 0, args 2, stack 0,
            /// int N ; push an integer constant
            Int = "int" => [value: Uint], since 1, cost 1, args 1, stack 0,
            /// byte LITERAL | byte ENCODING VALUE ; push a byte constant
            Byte = "byte" => [value: Bytes], since 1, cost 1, args [1, 2], stack 0,
            /// addr ADDRESS ; push the 32 raw bytes of an account address
            Addr = "addr" => [value: Addr], since 1, cost 1, args 1, stack 0,
            // =========================
            // Flow control
            // =========================
            /// err ; fail immediately
            Fail = "err" => [], since 1, cost 1, args 0, stack 0,
            /// bnz TARGET ; branch if A is not zero
            Bnz = "bnz" => [target: Label], since 1, cost 1, args 1, stack 1,
            /// bz TARGET ; branch if A is zero
            Bz = "bz" => [target: Label], since 2, cost 1, args 1, stack 1,
            /// b TARGET ; branch unconditionally
            Branch = "b" => [target: Label], since 2, cost 1, args 1, stack 0,
            /// return ; use A as the verdict and stop
            Return = "return" => [], since 2, cost 1, args 0, stack 1,
            /// assert ; fail unless A is not zero
            Assert = "assert" => [], since 3, cost 1, args 0, stack 1,
            /// callsub TARGET ; branch to TARGET, remembering the next instruction
            Callsub = "callsub" => [target: Label], since 4, cost 1, args 1, stack 0,
            /// retsub ; resume after the matching callsub
            Retsub = "retsub" => [], since 4, cost 1, args 0, stack 0,
            // =========================
            // Cryptography
            // =========================
            /// sha256 ; SHA-256 of A
            Sha256 = "sha256" => [], since 1, cost [7, 35], args 0, stack 1,
            /// keccak256 ; Keccak-256 of A
            Keccak256 = "keccak256" => [], since 1, cost [26, 130], args 0, stack 1,
            /// sha512_256 ; SHA-512/256 of A
            Sha512_256 = "sha512_256" => [], since 1, cost [9, 45], args 0, stack 1,
            /// ed25519verify ; verify signature B of data A with public key C
            Ed25519Verify = "ed25519verify" => [], since 1, cost 1900, args 0, stack 3,
            /// ecdsa_verify CURVE ; verify signature (B, C) of hash A with public key (D, E)
            EcdsaVerify = "ecdsa_verify" => [curve: Curve], since 5, cost 1700, args 1, stack 5,
            // =========================
            // Integer arithmetic
            // =========================
            /// + ; A plus B, fail on overflow
            Add = "+" => [], since 1, cost 1, args 0, stack 2,
            /// - ; A minus B, fail if B > A
            Sub = "-" => [], since 1, cost 1, args 0, stack 2,
            /// / ; A divided by B, fail if B == 0
            Div = "/" => [], since 1, cost 1, args 0, stack 2,
            /// * ; A times B, fail on overflow
            Mul = "*" => [], since 1, cost 1, args 0, stack 2,
            /// % ; A modulo B, fail if B == 0
            Mod = "%" => [], since 1, cost 1, args 0, stack 2,
            /// mulw ; 128-bit A times B, pushes high then low word
            Mulw = "mulw" => [], since 1, cost 1, args 0, stack 2,
            /// addw ; 128-bit A plus B, pushes carry then low word
            Addw = "addw" => [], since 2, cost 1, args 0, stack 2,
            /// sqrt ; integer square root of A
            Sqrt = "sqrt" => [], since 4, cost 4, args 0, stack 1,
            /// exp ; A raised to B, fail on overflow or 0^0
            Exp = "exp" => [], since 4, cost 1, args 0, stack 2,
            /// expw ; 128-bit A raised to B, pushes high then low word
            Expw = "expw" => [], since 4, cost 10, args 0, stack 2,
            /// bitlen ; index of the highest set bit of A, plus one
            Bitlen = "bitlen" => [], since 4, cost 1, args 0, stack 1,
            // =========================
            // Comparison and logic
            // =========================
            /// < ; A less than B
            Lt = "<" => [], since 1, cost 1, args 0, stack 2,
            /// > ; A greater than B
            Gt = ">" => [], since 1, cost 1, args 0, stack 2,
            /// <= ; A less than or equal to B
            Le = "<=" => [], since 1, cost 1, args 0, stack 2,
            /// >= ; A greater than or equal to B
            Ge = ">=" => [], since 1, cost 1, args 0, stack 2,
            /// && ; A and B are both non-zero
            And = "&&" => [], since 1, cost 1, args 0, stack 2,
            /// || ; A or B is non-zero
            Or = "||" => [], since 1, cost 1, args 0, stack 2,
            /// == ; A equals B, both of the same type
            Eq = "==" => [], since 1, cost 1, args 0, stack 2,
            /// != ; A differs from B, both of the same type
            Neq = "!=" => [], since 1, cost 1, args 0, stack 2,
            /// ! ; 1 if A is zero, else 0
            Not = "!" => [], since 1, cost 1, args 0, stack 1,
            // =========================
            // Bitwise
            // =========================
            /// | ; A bitwise-or B
            BitOr = "|" => [], since 1, cost 1, args 0, stack 2,
            /// & ; A bitwise-and B
            BitAnd = "&" => [], since 1, cost 1, args 0, stack 2,
            /// ^ ; A bitwise-xor B
            BitXor = "^" => [], since 1, cost 1, args 0, stack 2,
            /// ~ ; bitwise complement of A
            BitNot = "~" => [], since 1, cost 1, args 0, stack 1,
            /// shl ; A shifted left by B bits, B < 64
            Shl = "shl" => [], since 4, cost 1, args 0, stack 2,
            /// shr ; A shifted right by B bits, B < 64
            Shr = "shr" => [], since 4, cost 1, args 0, stack 2,
            // =========================
            // Conversions and bytes
            // =========================
            /// len ; length of byte string A
            Len = "len" => [], since 1, cost 1, args 0, stack 1,
            /// itob ; 8-byte big-endian encoding of A
            Itob = "itob" => [], since 1, cost 1, args 0, stack 1,
            /// btoi ; big-endian integer from at most 8 bytes
            Btoi = "btoi" => [], since 1, cost 1, args 0, stack 1,
            /// concat ; A followed by B
            Concat = "concat" => [], since 2, cost 1, args 0, stack 2,
            /// substring S E ; bytes S..E of A
            Substring = "substring" => [start: Index, end: Index], since 2, cost 1, args 2, stack 1,
            /// substring3 ; bytes B..C of A
            Substring3 = "substring3" => [], since 2, cost 1, args 0, stack 3,
            /// getbit ; bit B of A
            GetBit = "getbit" => [], since 3, cost 1, args 0, stack 2,
            /// setbit ; A with bit B set to C
            SetBit = "setbit" => [], since 3, cost 1, args 0, stack 3,
            /// getbyte ; byte B of A as an integer
            GetByte = "getbyte" => [], since 3, cost 1, args 0, stack 2,
            /// setbyte ; A with byte B set to C
            SetByte = "setbyte" => [], since 3, cost 1, args 0, stack 3,
            /// bzero ; A zero bytes
            Bzero = "bzero" => [], since 4, cost 1, args 0, stack 1,
            /// extract S L ; L bytes of A from S, L == 0 reads to the end
            Extract = "extract" => [start: Index, length: Index], since 5, cost 1, args 2, stack 1,
            /// extract3 ; C bytes of A from B
            Extract3 = "extract3" => [], since 5, cost 1, args 0, stack 3,
            /// extract_uint16 ; big-endian uint16 of A at B
            ExtractUint16 = "extract_uint16" => [], since 5, cost 1, args 0, stack 2,
            /// extract_uint32 ; big-endian uint32 of A at B
            ExtractUint32 = "extract_uint32" => [], since 5, cost 1, args 0, stack 2,
            /// extract_uint64 ; big-endian uint64 of A at B
            ExtractUint64 = "extract_uint64" => [], since 5, cost 1, args 0, stack 2,
            // =========================
            // Byte-string math
            // =========================
            /// b+ ; A plus B as big-endian unsigned integers
            BAdd = "b+" => [], since 4, cost 10, args 0, stack 2,
            /// b- ; A minus B, fail if B > A
            BSub = "b-" => [], since 4, cost 10, args 0, stack 2,
            /// b* ; A times B
            BMul = "b*" => [], since 4, cost 20, args 0, stack 2,
            /// b/ ; A divided by B, fail if B is zero
            BDiv = "b/" => [], since 4, cost 20, args 0, stack 2,
            /// b% ; A modulo B, fail if B is zero
            BMod = "b%" => [], since 4, cost 20, args 0, stack 2,
            /// b< ; A less than B
            BLt = "b<" => [], since 4, cost 1, args 0, stack 2,
            /// b> ; A greater than B
            BGt = "b>" => [], since 4, cost 1, args 0, stack 2,
            /// b<= ; A less than or equal to B
            BLe = "b<=" => [], since 4, cost 1, args 0, stack 2,
            /// b>= ; A greater than or equal to B
            BGe = "b>=" => [], since 4, cost 1, args 0, stack 2,
            /// b== ; A equals B numerically
            BEq = "b==" => [], since 4, cost 1, args 0, stack 2,
            /// b!= ; A differs from B numerically
            BNeq = "b!=" => [], since 4, cost 1, args 0, stack 2,
            /// b| ; A bitwise-or B, zero-extended to the longer length
            BOr = "b|" => [], since 4, cost 6, args 0, stack 2,
            /// b& ; A bitwise-and B, zero-extended to the longer length
            BAnd = "b&" => [], since 4, cost 6, args 0, stack 2,
            /// b^ ; A bitwise-xor B, zero-extended to the longer length
            BXor = "b^" => [], since 4, cost 6, args 0, stack 2,
            /// b~ ; bitwise complement of A, same length
            BNot = "b~" => [], since 4, cost 4, args 0, stack 1,
            // =========================
            // Stack manipulation
            // =========================
            /// pop ; discard A
            Pop = "pop" => [], since 1, cost 1, args 0, stack 1,
            /// dup ; duplicate A
            Dup = "dup" => [], since 1, cost 1, args 0, stack 1,
            /// dup2 ; duplicate A and B
            Dup2 = "dup2" => [], since 2, cost 1, args 0, stack 2,
            /// swap ; exchange A and B
            Swap = "swap" => [], since 3, cost 1, args 0, stack 2,
            /// select ; B if C is not zero, else A
            Select = "select" => [], since 3, cost 1, args 0, stack 3,
            /// dig N ; copy the value N below the top
            Dig = "dig" => [depth: Index], since 3, cost 1, args 1, stack 1,
            /// cover N ; move the top value N places down
            Cover = "cover" => [depth: Index], since 5, cost 1, args 1, stack 1,
            /// uncover N ; move the value N below the top to the top
            Uncover = "uncover" => [depth: Index], since 5, cost 1, args 1, stack 1,
            // =========================
            // Constants and arguments
            // =========================
            /// intcblock N... ; declare the integer constant block
            Intcblock = "intcblock" => [values: Uints], since 1, cost 1, args *, stack 0,
            /// intc I ; push integer constant I
            Intc = "intc" => [index: Index], since 1, cost 1, args 1, stack 0,
            /// intc_0 ; push integer constant 0
            Intc0 = "intc_0" => [], since 1, cost 1, args 0, stack 0,
            /// intc_1 ; push integer constant 1
            Intc1 = "intc_1" => [], since 1, cost 1, args 0, stack 0,
            /// intc_2 ; push integer constant 2
            Intc2 = "intc_2" => [], since 1, cost 1, args 0, stack 0,
            /// intc_3 ; push integer constant 3
            Intc3 = "intc_3" => [], since 1, cost 1, args 0, stack 0,
            /// bytecblock B... ; declare the byte constant block
            Bytecblock = "bytecblock" => [values: ByteList], since 1, cost 1, args *, stack 0,
            /// bytec I ; push byte constant I
            Bytec = "bytec" => [index: Index], since 1, cost 1, args 1, stack 0,
            /// bytec_0 ; push byte constant 0
            Bytec0 = "bytec_0" => [], since 1, cost 1, args 0, stack 0,
            /// bytec_1 ; push byte constant 1
            Bytec1 = "bytec_1" => [], since 1, cost 1, args 0, stack 0,
            /// bytec_2 ; push byte constant 2
            Bytec2 = "bytec_2" => [], since 1, cost 1, args 0, stack 0,
            /// bytec_3 ; push byte constant 3
            Bytec3 = "bytec_3" => [], since 1, cost 1, args 0, stack 0,
            /// pushint N ; push an immediate integer
            PushInt = "pushint" => [value: Uint], since 3, cost 1, args 1, stack 0,
            /// pushbytes LITERAL ; push an immediate byte string
            PushBytes = "pushbytes" => [value: Bytes], since 3, cost 1, args [1, 2], stack 0,
            /// arg I ; push program argument I
            Arg = "arg" => [index: Index], since 1, cost 1, args 1, stack 0,
            /// arg_0 ; push program argument 0
            Arg0 = "arg_0" => [], since 1, cost 1, args 0, stack 0,
            /// arg_1 ; push program argument 1
            Arg1 = "arg_1" => [], since 1, cost 1, args 0, stack 0,
            /// arg_2 ; push program argument 2
            Arg2 = "arg_2" => [], since 1, cost 1, args 0, stack 0,
            /// arg_3 ; push program argument 3
            Arg3 = "arg_3" => [], since 1, cost 1, args 0, stack 0,
            // =========================
            // Scratch space
            // =========================
            /// load I ; push scratch slot I
            Load = "load" => [slot: Index], since 1, cost 1, args 1, stack 0,
            /// store I ; pop A into scratch slot I
            Store = "store" => [slot: Index], since 1, cost 1, args 1, stack 1,
            // =========================
            // Transaction and global fields
            // =========================
            /// txn F ; field F of the current transaction
            Txn = "txn" => [field: Field], since 1, cost 1, args 1, stack 0,
            /// global F ; global field F
            Global = "global" => [field: Field], since 1, cost 1, args 1, stack 0,
            /// gtxn T F ; field F of group transaction T
            Gtxn = "gtxn" => [group: Index, field: Field], since 1, cost 1, args 2, stack 0,
            /// txna F I ; element I of array field F of the current transaction
            Txna = "txna" => [field: Field, index: Index], since 2, cost 1, args 2, stack 0,
            /// gtxna T F I ; element I of array field F of group transaction T
            Gtxna = "gtxna" => [group: Index, field: Field, index: Index], since 2, cost 1, args 3, stack 0,
            /// gtxns F ; field F of group transaction A
            Gtxns = "gtxns" => [field: Field], since 3, cost 1, args 1, stack 1,
            /// gtxnsa F I ; element I of array field F of group transaction A
            Gtxnsa = "gtxnsa" => [field: Field, index: Index], since 3, cost 1, args 2, stack 1,
            // =========================
            // Ledger state
            // =========================
            /// balance ; balance of account A
            Balance = "balance" => [], since 2, cost 1, args 0, stack 1,
            /// min_balance ; minimum balance of account A
            MinBalance = "min_balance" => [], since 3, cost 1, args 0, stack 1,
            /// app_opted_in ; 1 if account A opted in to application B
            AppOptedIn = "app_opted_in" => [], since 2, cost 1, args 0, stack 2,
            /// app_local_get ; local key B of account A in the current application
            AppLocalGet = "app_local_get" => [], since 2, cost 1, args 0, stack 2,
            /// app_local_get_ex ; local key C of account A in application B, plus a found flag
            AppLocalGetEx = "app_local_get_ex" => [], since 2, cost 1, args 0, stack 3,
            /// app_global_get ; global key A of the current application
            AppGlobalGet = "app_global_get" => [], since 2, cost 1, args 0, stack 1,
            /// app_global_get_ex ; global key B of application A, plus a found flag
            AppGlobalGetEx = "app_global_get_ex" => [], since 2, cost 1, args 0, stack 2,
            /// app_local_put ; set local key B of account A to C
            AppLocalPut = "app_local_put" => [], since 2, cost 1, args 0, stack 3,
            /// app_global_put ; set global key A to B
            AppGlobalPut = "app_global_put" => [], since 2, cost 1, args 0, stack 2,
            /// app_local_del ; delete local key B of account A
            AppLocalDel = "app_local_del" => [], since 2, cost 1, args 0, stack 2,
            /// app_global_del ; delete global key A
            AppGlobalDel = "app_global_del" => [], since 2, cost 1, args 0, stack 1,
            /// asset_holding_get F ; field F of account A's holding of asset B, plus a found flag
            AssetHoldingGet = "asset_holding_get" => [field: HoldingField], since 2, cost 1, args 1, stack 2,
            /// asset_params_get F ; parameter F of asset A, plus a found flag
            AssetParamsGet = "asset_params_get" => [field: ParamsField], since 2, cost 1, args 1, stack 1,
            /// log ; append A to the execution log
            Log = "log" => [], since 5, cost 1, args 0, stack 1,
        }
    };
}

/// Execution cost of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cost {
    /// Same cost in every version.
    Flat(u64),
    /// Cost by version, starting at version 1. Versions past the end use the last tier.
    Tiered(&'static [u64]),
}

impl Cost {
    /// Cost charged when running under `version`.
    pub fn at(&self, version: u8) -> u64 {
        match self {
            Cost::Flat(c) => *c,
            Cost::Tiered(tiers) => {
                let idx = (version.max(1) as usize - 1).min(tiers.len().saturating_sub(1));
                tiers.get(idx).copied().unwrap_or(0)
            }
        }
    }
}

/// Number of operands an opcode accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    OneOf(&'static [usize]),
    /// Block opcodes take any number of operands.
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => *n == count,
            Arity::OneOf(ns) => ns.contains(&count),
            Arity::Any => true,
        }
    }

    /// Human-readable expected count for error messages.
    pub fn describe(&self) -> String {
        match self {
            Arity::Exact(n) => n.to_string(),
            Arity::OneOf(ns) => ns
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            Arity::Any => "any number of".to_string(),
        }
    }
}

/// Static definition of one mnemonic.
#[derive(Debug)]
pub struct OpcodeDef {
    pub key: Mnemonic,
    pub mnemonic: &'static str,
    /// First TEAL version that accepts the mnemonic.
    pub version: u8,
    pub cost: Cost,
    pub operands: Arity,
    /// Values required on the stack before execution.
    pub stack: usize,
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], since $version:literal, cost $cost:tt, args $arity:tt, stack $stack:literal
        ),* $(,)?
    ) => {
        // =========================
        // Registry keys
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Mnemonic {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Mnemonic {
            /// Every mnemonic, in table order.
            pub const ALL: &'static [Mnemonic] = &[ $( Mnemonic::$name, )* ];

            /// Looks up a mnemonic by its source spelling.
            pub fn lookup(name: &str) -> Option<Mnemonic> {
                match name {
                    $( $mnemonic => Some(Mnemonic::$name), )*
                    _ => None,
                }
            }

            /// Returns the static definition for this mnemonic.
            pub fn def(self) -> &'static OpcodeDef {
                &OPCODE_DEFS[self as usize]
            }

            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Mnemonic::$name => $mnemonic, )*
                }
            }
        }

        /// Opcode definitions indexed by [`Mnemonic`] discriminant.
        pub static OPCODE_DEFS: &[OpcodeDef] = &[
            $(
                OpcodeDef {
                    key: Mnemonic::$name,
                    mnemonic: $mnemonic,
                    version: $version,
                    cost: define_opcodes!(@cost $cost),
                    operands: define_opcodes!(@arity $arity),
                    stack: $stack,
                },
            )*
        ];

        // =========================
        // Parsed instructions
        // =========================
        #[derive(Clone, Debug, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_opcodes!(@ty $kind) ),*
                },
            )*
        }

        impl Opcode {
            pub const fn mnemonic(&self) -> Mnemonic {
                match self {
                    $( Opcode::$name { .. } => Mnemonic::$name, )*
                }
            }
        }
    };

    // ---------- types ----------
    (@ty Uint)         => { u64 };
    (@ty Index)        => { u8 };
    (@ty Label)        => { usize };
    (@ty Field)        => { String };
    (@ty HoldingField) => { AssetHoldingField };
    (@ty ParamsField)  => { AssetParamsField };
    (@ty Curve)        => { EcdsaCurve };
    (@ty Bytes)        => { Vec<u8> };
    (@ty Addr)         => { Vec<u8> };
    (@ty Uints)        => { Vec<u64> };
    (@ty ByteList)     => { Vec<Vec<u8>> };
    (@ty Version)      => { u64 };

    // ---------- cost ----------
    (@cost [ $( $tier:literal ),+ ]) => { Cost::Tiered(&[ $( $tier ),+ ]) };
    (@cost $flat:literal)            => { Cost::Flat($flat) };

    // ---------- arity ----------
    (@arity *)                         => { Arity::Any };
    (@arity [ $( $count:literal ),+ ]) => { Arity::OneOf(&[ $( $count ),+ ]) };
    (@arity $count:literal)            => { Arity::Exact($count) };
}

for_each_opcode!(define_opcodes);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(Mnemonic::lookup("+"), Some(Mnemonic::Add));
        assert_eq!(Mnemonic::lookup("ecdsa_verify"), Some(Mnemonic::EcdsaVerify));
        assert_eq!(Mnemonic::lookup("foo"), None);
    }

    #[test]
    fn definitions_line_up_with_keys() {
        for m in Mnemonic::ALL {
            assert_eq!(m.def().key, *m);
            assert_eq!(m.def().mnemonic, m.as_str());
        }
    }

    #[test]
    fn tiered_costs() {
        let sha = Mnemonic::Sha256.def();
        assert_eq!(sha.cost.at(1), 7);
        assert_eq!(sha.cost.at(2), 35);
        assert_eq!(sha.cost.at(5), 35);
        assert_eq!(Mnemonic::Ed25519Verify.def().cost.at(1), 1900);
        assert_eq!(Mnemonic::Pragma.def().cost.at(3), 0);
    }

    #[test]
    fn arity_rules() {
        assert!(Mnemonic::Byte.def().operands.accepts(1));
        assert!(Mnemonic::Byte.def().operands.accepts(2));
        assert!(!Mnemonic::Byte.def().operands.accepts(3));
        assert!(Mnemonic::Intcblock.def().operands.accepts(0));
        assert!(Mnemonic::Intcblock.def().operands.accepts(17));
        assert_eq!(Arity::OneOf(&[1, 2]).describe(), "1 or 2");
    }

    #[test]
    fn opcode_reports_its_mnemonic() {
        let op = Opcode::Load { slot: 3 };
        assert_eq!(op.mnemonic(), Mnemonic::Load);
        assert_eq!(op.mnemonic().as_str(), "load");
    }
}
