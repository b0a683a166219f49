//! Value and encoding types shared by the assembler and the engine.
//!
//! - `TypedValue`: the uint64 / bytes union held by every stack and scratch slot
//! - `Address`: 32-byte account keys and their checksummed base32 text form
//! - `encoding`: byte-literal decoding (hex, base64, base32, quoted strings)

pub mod address;
pub mod encoding;
pub mod value;
