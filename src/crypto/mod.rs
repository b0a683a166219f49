//! Digest and signature primitives behind the cryptographic opcodes.

pub mod hashes;
pub mod signatures;
