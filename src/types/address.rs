//! 32-byte account addresses and their checksummed text form.

use crate::crypto::hashes::sha512_256;
use crate::types::encoding::{EncodingError, decode_base32, encode_base32};
use std::fmt;
use std::str::FromStr;

/// Public key length in bytes.
pub const ADDRESS_LEN: usize = 32;

/// Trailing checksum bytes appended before base32 encoding.
const CHECKSUM_LEN: usize = 4;

/// Length of the base32 text form (36 bytes, unpadded).
pub const ADDRESS_TEXT_LEN: usize = 58;

/// Account address: a raw 32-byte public key.
///
/// The text form is base32 (no padding) over the key followed by the last
/// four bytes of its SHA-512/256 digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn zero() -> Self {
        Address([0u8; ADDRESS_LEN])
    }

    /// Builds an address from a slice, returning `None` unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Address)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(ADDRESS_LEN + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&encode_base32(&raw))
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(EncodingError::InvalidLength {
                expected: ADDRESS_TEXT_LEN,
                actual: s.len(),
            });
        }
        let raw = decode_base32(s)?;
        if raw.len() != ADDRESS_LEN + CHECKSUM_LEN {
            return Err(EncodingError::InvalidLength {
                expected: ADDRESS_LEN + CHECKSUM_LEN,
                actual: raw.len(),
            });
        }
        let (key, checksum) = raw.split_at(ADDRESS_LEN);
        let address = Address::from_slice(key).ok_or(EncodingError::InvalidLength {
            expected: ADDRESS_LEN,
            actual: key.len(),
        })?;
        if address.checksum() != checksum {
            return Err(EncodingError::ChecksumMismatch);
        }
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ADDRESS: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn zero_address_text() {
        assert_eq!(Address::zero().to_string(), ZERO_ADDRESS);
    }

    #[test]
    fn parse_zero_address() {
        assert_eq!(ZERO_ADDRESS.parse::<Address>().unwrap(), Address::zero());
    }

    #[test]
    fn text_round_trip() {
        let addr = Address([7u8; ADDRESS_LEN]);
        let text = addr.to_string();
        assert_eq!(text.len(), ADDRESS_TEXT_LEN);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut text = Address::zero().to_string();
        text.replace_range(ADDRESS_TEXT_LEN - 1.., "A");
        assert_eq!(text.parse::<Address>(), Err(EncodingError::ChecksumMismatch));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            "AAAA".parse::<Address>(),
            Err(EncodingError::InvalidLength { expected: ADDRESS_TEXT_LEN, actual: 4 })
        ));
    }

    #[test]
    fn from_slice_requires_32_bytes() {
        assert!(Address::from_slice(&[0u8; 31]).is_none());
        assert!(Address::from_slice(&[0u8; 32]).is_some());
    }
}
