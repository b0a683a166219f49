//! Typed operand parsing.
//!
//! Every opcode operand kind in the registry maps to one method on
//! [`Operands`], which walks the operand strings of a single token. All
//! operand validation (integer syntax, index ranges, encodings, field names,
//! label resolution) happens here, at parse time.

use crate::types::address::Address;
use crate::types::encoding::{decode_literal, decode_with};
use crate::virtual_machine::assembler::AsmContext;
use crate::virtual_machine::errors::VMError;

/// Largest value accepted for one-byte immediates (scratch slots, indices).
pub const MAX_INDEX: u64 = 255;

/// Named integer constants accepted by `int` and `pushint`.
const NAMED_CONSTANTS: &[(&str, u64)] = &[
    // transaction types
    ("pay", 1),
    ("keyreg", 2),
    ("acfg", 3),
    ("axfer", 4),
    ("afrz", 5),
    ("appl", 6),
    // on-completion actions
    ("NoOp", 0),
    ("OptIn", 1),
    ("CloseOut", 2),
    ("ClearState", 3),
    ("UpdateApplication", 4),
    ("DeleteApplication", 5),
];

/// Curve selector for `ecdsa_verify`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EcdsaCurve {
    Secp256k1 = 0,
}

impl EcdsaCurve {
    fn parse(tok: &str) -> Result<Self, VMError> {
        match tok {
            "0" | "Secp256k1" => Ok(EcdsaCurve::Secp256k1),
            _ => Err(VMError::InvalidCurve {
                token: tok.to_string(),
            }),
        }
    }
}

macro_rules! field_enum {
    ($(#[$doc:meta])* $name:ident { $( $variant:ident ),* $(,)? }) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum $name {
            $( $variant, )*
        }

        impl $name {
            pub const fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant), )*
                }
            }

            fn parse(opcode: &'static str, tok: &str) -> Result<Self, VMError> {
                match tok {
                    $( stringify!($variant) => Ok($name::$variant), )*
                    _ => Err(VMError::InvalidField {
                        opcode,
                        field: tok.to_string(),
                    }),
                }
            }
        }
    };
}

field_enum! {
    /// Fields readable with `asset_holding_get`.
    AssetHoldingField { AssetBalance, AssetFrozen }
}

field_enum! {
    /// Fields readable with `asset_params_get`.
    AssetParamsField {
        AssetTotal,
        AssetDecimals,
        AssetDefaultFrozen,
        AssetUnitName,
        AssetName,
        AssetURL,
        AssetMetadataHash,
        AssetManager,
        AssetReserve,
        AssetFreeze,
        AssetClawback,
        AssetCreator,
    }
}

/// Parses an integer literal: decimal, `0x` hex, `0`-prefixed octal, or a named constant.
pub fn parse_uint(opcode: &'static str, tok: &str) -> Result<u64, VMError> {
    if let Some((_, v)) = NAMED_CONSTANTS.iter().find(|(name, _)| *name == tok) {
        return Ok(*v);
    }
    let digits_only = |s: &str, radix: u32| !s.is_empty() && s.chars().all(|c| c.is_digit(radix));
    let parsed = if let Some(h) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        digits_only(h, 16)
            .then(|| u64::from_str_radix(h, 16).ok())
            .flatten()
    } else if tok.len() > 1 && tok.starts_with('0') {
        digits_only(&tok[1..], 8)
            .then(|| u64::from_str_radix(&tok[1..], 8).ok())
            .flatten()
    } else {
        digits_only(tok, 10).then(|| tok.parse::<u64>().ok()).flatten()
    };
    parsed.ok_or_else(|| VMError::InvalidInteger {
        opcode,
        token: tok.to_string(),
    })
}

/// Parses an integer and checks it lies in `0..=max`.
pub fn parse_bounded(opcode: &'static str, tok: &str, max: u64) -> Result<u64, VMError> {
    let v = parse_uint(opcode, tok)?;
    if v > max {
        return Err(VMError::IndexOutOfRange {
            opcode,
            value: tok.to_string(),
            min: 0,
            max,
        });
    }
    Ok(v)
}

/// Cursor over the operand strings of one token.
pub struct Operands<'t> {
    opcode: &'static str,
    items: &'t [&'t str],
    pos: usize,
}

impl<'t> Operands<'t> {
    pub fn new(opcode: &'static str, items: &'t [&'t str]) -> Self {
        Self {
            opcode,
            items,
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<&'t str, VMError> {
        let tok = self
            .items
            .get(self.pos)
            .copied()
            .ok_or(VMError::OperandCountMismatch {
                opcode: self.opcode,
                expected: (self.pos + 1).to_string(),
                actual: self.items.len(),
            })?;
        self.pos += 1;
        Ok(tok)
    }

    fn rest(&mut self) -> &'t [&'t str] {
        let rest = &self.items[self.pos.min(self.items.len())..];
        self.pos = self.items.len();
        rest
    }

    pub fn uint(&mut self) -> Result<u64, VMError> {
        let tok = self.next()?;
        parse_uint(self.opcode, tok)
    }

    /// One-byte immediate in `0..=255`.
    pub fn index(&mut self) -> Result<u8, VMError> {
        let tok = self.next()?;
        parse_bounded(self.opcode, tok, MAX_INDEX).map(|v| v as u8)
    }

    pub fn field(&mut self) -> Result<String, VMError> {
        self.next().map(str::to_string)
    }

    pub fn holding_field(&mut self) -> Result<AssetHoldingField, VMError> {
        let tok = self.next()?;
        AssetHoldingField::parse(self.opcode, tok)
    }

    pub fn params_field(&mut self) -> Result<AssetParamsField, VMError> {
        let tok = self.next()?;
        AssetParamsField::parse(self.opcode, tok)
    }

    pub fn curve(&mut self) -> Result<EcdsaCurve, VMError> {
        EcdsaCurve::parse(self.next()?)
    }

    /// `version N` as written after `#pragma`.
    pub fn version(&mut self) -> Result<u64, VMError> {
        let keyword = self.next()?;
        let number = self.next()?;
        if keyword != "version" {
            return Err(VMError::InvalidPragma {
                text: format!("#pragma {keyword} {number}"),
            });
        }
        number.parse::<u64>().map_err(|_| VMError::InvalidPragma {
            text: format!("#pragma {keyword} {number}"),
        })
    }

    /// Branch target resolved to an absolute instruction index.
    pub fn label(&mut self, ctx: &AsmContext, index: usize) -> Result<usize, VMError> {
        let tok = self.next()?;
        ctx.resolve_branch(tok, index)
    }

    /// A byte literal in either the one-operand or `<encoding> <value>` form.
    pub fn bytes(&mut self) -> Result<Vec<u8>, VMError> {
        let opcode = self.opcode;
        let rest = self.rest();
        let (literal, decoded) = match rest {
            [literal] => (literal.to_string(), decode_literal(literal)),
            [encoding, value] => (format!("{encoding} {value}"), decode_with(encoding, value)),
            _ => {
                return Err(VMError::OperandCountMismatch {
                    opcode,
                    expected: "1 or 2".to_string(),
                    actual: rest.len(),
                });
            }
        };
        decoded.map_err(|source| VMError::InvalidByteLiteral {
            opcode,
            literal,
            source,
        })
    }

    /// A 58-character account address, returned as its 32 raw bytes.
    pub fn addr(&mut self) -> Result<Vec<u8>, VMError> {
        let tok = self.next()?;
        tok.parse::<Address>()
            .map(|a| a.as_slice().to_vec())
            .map_err(|source| VMError::InvalidAddress {
                literal: tok.to_string(),
                source,
            })
    }

    pub fn uints(&mut self) -> Result<Vec<u64>, VMError> {
        let opcode = self.opcode;
        self.rest().iter().map(|tok| parse_uint(opcode, tok)).collect()
    }

    pub fn byte_list(&mut self) -> Result<Vec<Vec<u8>>, VMError> {
        let opcode = self.opcode;
        self.rest()
            .iter()
            .map(|tok| {
                decode_literal(tok).map_err(|source| VMError::InvalidByteLiteral {
                    opcode,
                    literal: tok.to_string(),
                    source,
                })
            })
            .collect()
    }
}
