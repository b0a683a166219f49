//! Byte-string math: byte strings as big-endian unsigned integers.
//!
//! Operands are limited to [`MAX_BYTE_MATH_LEN`] bytes. Arithmetic results
//! are minimal big-endian encodings, so zero is the empty byte string.
//! Bitwise results are as long as the longer operand.

use crate::virtual_machine::errors::VMError;
use num_bigint::BigUint;
use std::cmp::Ordering;

pub const MAX_BYTE_MATH_LEN: usize = 64;

fn check_len(opcode: &'static str, bytes: &[u8]) -> Result<(), VMError> {
    if bytes.len() > MAX_BYTE_MATH_LEN {
        return Err(VMError::BytesTooLong {
            opcode,
            max: MAX_BYTE_MATH_LEN,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn operand(opcode: &'static str, bytes: &[u8]) -> Result<BigUint, VMError> {
    check_len(opcode, bytes)?;
    Ok(BigUint::from_bytes_be(bytes))
}

fn encode(n: BigUint) -> Vec<u8> {
    if n.bits() == 0 {
        Vec::new()
    } else {
        n.to_bytes_be()
    }
}

pub fn add(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VMError> {
    Ok(encode(operand(opcode, a)? + operand(opcode, b)?))
}

pub fn sub(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VMError> {
    let (a, b) = (operand(opcode, a)?, operand(opcode, b)?);
    if b > a {
        return Err(VMError::Underflow { opcode });
    }
    Ok(encode(a - b))
}

pub fn mul(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VMError> {
    Ok(encode(operand(opcode, a)? * operand(opcode, b)?))
}

pub fn div(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VMError> {
    let (a, b) = (operand(opcode, a)?, operand(opcode, b)?);
    if b.bits() == 0 {
        return Err(VMError::DivisionByZero { opcode });
    }
    Ok(encode(a / b))
}

pub fn rem(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Vec<u8>, VMError> {
    let (a, b) = (operand(opcode, a)?, operand(opcode, b)?);
    if b.bits() == 0 {
        return Err(VMError::DivisionByZero { opcode });
    }
    Ok(encode(a % b))
}

/// Numeric comparison; leading zero bytes do not matter.
pub fn compare(opcode: &'static str, a: &[u8], b: &[u8]) -> Result<Ordering, VMError> {
    Ok(operand(opcode, a)?.cmp(&operand(opcode, b)?))
}

/// Applies `f` bytewise after zero-extending the shorter operand on the left.
pub fn bitwise(
    opcode: &'static str,
    a: &[u8],
    b: &[u8],
    f: impl Fn(u8, u8) -> u8,
) -> Result<Vec<u8>, VMError> {
    check_len(opcode, a)?;
    check_len(opcode, b)?;
    let len = a.len().max(b.len());
    let pad = |v: &[u8]| {
        let mut out = vec![0u8; len - v.len()];
        out.extend_from_slice(v);
        out
    };
    let (a, b) = (pad(a), pad(b));
    Ok(a.iter().zip(&b).map(|(x, y)| f(*x, *y)).collect())
}

pub fn not(opcode: &'static str, a: &[u8]) -> Result<Vec<u8>, VMError> {
    check_len(opcode, a)?;
    Ok(a.iter().map(|x| !x).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_carries_past_u64() {
        let max = u64::MAX.to_be_bytes();
        assert_eq!(add("b+", &max, &[1]).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn zero_is_empty() {
        assert_eq!(sub("b-", &[0, 5], &[5]).unwrap(), Vec::<u8>::new());
        assert_eq!(mul("b*", &[], &[9]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn sub_underflow() {
        assert!(matches!(sub("b-", &[1], &[2]), Err(VMError::Underflow { opcode: "b-" })));
    }

    #[test]
    fn div_and_rem() {
        assert_eq!(div("b/", &[0x01, 0x00], &[0x10]).unwrap(), vec![0x10]);
        assert_eq!(rem("b%", &[0x01, 0x01], &[0x10]).unwrap(), vec![0x01]);
        assert!(matches!(div("b/", &[1], &[0, 0]), Err(VMError::DivisionByZero { .. })));
        assert!(matches!(rem("b%", &[1], &[]), Err(VMError::DivisionByZero { .. })));
    }

    #[test]
    fn compare_ignores_leading_zeros() {
        assert_eq!(compare("b==", &[0, 0, 7], &[7]).unwrap(), Ordering::Equal);
        assert_eq!(compare("b<", &[1, 0], &[0xff]).unwrap(), Ordering::Greater);
    }

    #[test]
    fn bitwise_zero_extends() {
        assert_eq!(bitwise("b|", &[0x0f], &[0xf0, 0x00], |x, y| x | y).unwrap(), vec![0xf0, 0x0f]);
        assert_eq!(bitwise("b&", &[0xff, 0xff], &[0x0f], |x, y| x & y).unwrap(), vec![0x00, 0x0f]);
        assert_eq!(not("b~", &[0x00, 0xf0]).unwrap(), vec![0xff, 0x0f]);
    }

    #[test]
    fn operand_length_limit() {
        let long = vec![1u8; MAX_BYTE_MATH_LEN + 1];
        assert!(matches!(
            add("b+", &long, &[1]),
            Err(VMError::BytesTooLong { max: 64, actual: 65, .. })
        ));
        assert!(not("b~", &long).is_err());
        assert!(add("b+", &long[1..], &[1]).is_ok());
    }
}
