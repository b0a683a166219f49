//! Fixed-size digests used by `sha256`, `sha512_256`, `keccak256` and addresses.

use sha2::{Digest, Sha256, Sha512_256};
use sha3::Keccak256;

/// Digest length shared by every supported hash.
pub const DIGEST_LEN: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// SHA-512 truncated to 256 bits, with the distinct SHA-512/256 initial values.
pub fn sha512_256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha512_256::digest(data).into()
}

/// Original Keccak-256 padding, not the finalized SHA3-256.
pub fn keccak256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Keccak256::digest(data).into()
}
