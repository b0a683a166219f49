//! The two value types a TEAL program manipulates.

use std::fmt;

/// A single stack, scratch or constant-pool slot.
///
/// Integers compare numerically and byte strings compare lexicographically by
/// unsigned byte value. Mixing the two in a comparison is always an error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypedValue {
    /// 64-bit unsigned integer.
    Uint64(u64),
    /// Arbitrary byte string.
    Bytes(Vec<u8>),
}

impl TypedValue {
    /// The zero integer every scratch slot starts with.
    pub const fn zero() -> Self {
        TypedValue::Uint64(0)
    }

    /// Returns the type name used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Uint64(_) => "uint64",
            TypedValue::Bytes(_) => "bytes",
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            TypedValue::Uint64(v) => Some(*v),
            TypedValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedValue::Uint64(_) => None,
            TypedValue::Bytes(b) => Some(b),
        }
    }

    /// Non-zero integers are true. Byte strings have no truth value.
    pub fn is_truthy(&self) -> Option<bool> {
        self.as_uint().map(|v| v != 0)
    }
}

impl Default for TypedValue {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<u64> for TypedValue {
    fn from(v: u64) -> Self {
        TypedValue::Uint64(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Uint64(v as u64)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(v: Vec<u8>) -> Self {
        TypedValue::Bytes(v)
    }
}

impl From<&[u8]> for TypedValue {
    fn from(v: &[u8]) -> Self {
        TypedValue::Bytes(v.to_vec())
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Bytes(v.as_bytes().to_vec())
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Uint64(v) => write!(f, "{v}"),
            TypedValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_integer() {
        assert_eq!(TypedValue::default(), TypedValue::Uint64(0));
    }

    #[test]
    fn truthiness_only_for_integers() {
        assert_eq!(TypedValue::from(7u64).is_truthy(), Some(true));
        assert_eq!(TypedValue::from(0u64).is_truthy(), Some(false));
        assert_eq!(TypedValue::from("x").is_truthy(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(TypedValue::from(42u64).to_string(), "42");
        assert_eq!(TypedValue::from(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(TypedValue::Bytes(vec![]).to_string(), "0x");
    }

    #[test]
    fn bool_converts_to_integer() {
        assert_eq!(TypedValue::from(true), TypedValue::Uint64(1));
        assert_eq!(TypedValue::from(false), TypedValue::Uint64(0));
    }
}
