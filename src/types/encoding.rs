//! Text encodings for byte literals.
//!
//! TEAL byte constants can be written as hex (`0x...`), quoted strings with
//! escapes, base64 or base32, either as a single self-describing operand or
//! as an explicit `<encoding> <value>` pair. Everything here is pure text
//! processing and has no knowledge of opcodes.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

/// RFC 4648 base32 alphabet.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Errors produced while decoding a textual byte literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid hex literal \"{0}\"")]
    InvalidHex(String),
    #[error("invalid base64 literal \"{0}\"")]
    InvalidBase64(String),
    #[error("invalid base32 character '{0}'")]
    InvalidBase32(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence \"{0}\"")]
    InvalidEscape(String),
    #[error("unknown encoding \"{0}\", expected one of base64, b64, base32, b32, hex, utf8")]
    UnknownEncoding(String),
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// Byte encodings accepted by the two-operand form of `byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteEncoding {
    Base64,
    Base32,
    Hex,
    Utf8,
}

impl ByteEncoding {
    pub fn from_name(name: &str) -> Result<Self, EncodingError> {
        match name {
            "base64" | "b64" => Ok(ByteEncoding::Base64),
            "base32" | "b32" => Ok(ByteEncoding::Base32),
            "hex" => Ok(ByteEncoding::Hex),
            "utf8" => Ok(ByteEncoding::Utf8),
            other => Err(EncodingError::UnknownEncoding(other.to_string())),
        }
    }

    pub fn decode(self, value: &str) -> Result<Vec<u8>, EncodingError> {
        match self {
            ByteEncoding::Base64 => decode_base64(value),
            ByteEncoding::Base32 => decode_base32(value),
            ByteEncoding::Hex => decode_hex(value.strip_prefix("0x").unwrap_or(value)),
            ByteEncoding::Utf8 => Ok(value.as_bytes().to_vec()),
        }
    }
}

/// Decodes a single self-describing byte literal.
///
/// Accepted forms: `0x<hex>`, `"quoted"`, `base64(..)`, `b64(..)`,
/// `base32(..)`, `b32(..)`. Anything else is treated as bare base64.
pub fn decode_literal(literal: &str) -> Result<Vec<u8>, EncodingError> {
    if let Some(h) = literal.strip_prefix("0x") {
        return decode_hex(h);
    }
    if literal.starts_with('"') {
        return decode_quoted(literal);
    }
    for (prefix, encoding) in [
        ("base64(", ByteEncoding::Base64),
        ("b64(", ByteEncoding::Base64),
        ("base32(", ByteEncoding::Base32),
        ("b32(", ByteEncoding::Base32),
    ] {
        if let Some(inner) = literal.strip_prefix(prefix).and_then(|r| r.strip_suffix(')')) {
            return encoding.decode(inner);
        }
    }
    decode_base64(literal)
}

/// Decodes the two-operand `<encoding> <value>` form.
pub fn decode_with(encoding: &str, value: &str) -> Result<Vec<u8>, EncodingError> {
    ByteEncoding::from_name(encoding)?.decode(value)
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    hex::decode(s).map_err(|_| EncodingError::InvalidHex(s.to_string()))
}

/// Padded and unpadded base64 are both accepted.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD
        .decode(s)
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .map_err(|_| EncodingError::InvalidBase64(s.to_string()))
}

/// Encodes bytes as unpadded RFC 4648 base32.
pub fn encode_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &b in data {
        buffer = (buffer << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decodes RFC 4648 base32, ignoring trailing `=` padding.
///
/// Trailing bits that do not fill a whole byte are dropped.
pub fn decode_base32(s: &str) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for c in s.trim_end_matches('=').chars() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(EncodingError::InvalidBase32(c))?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

/// Decodes a double-quoted string with `\n \t \r \\ \" \xHH` escapes.
pub fn decode_quoted(literal: &str) -> Result<Vec<u8>, EncodingError> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(EncodingError::UnterminatedString)?;

    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let digits: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == 2)
                    .ok_or_else(|| EncodingError::InvalidEscape(format!("\\x{digits}")))?;
                out.push(byte);
            }
            Some(other) => return Err(EncodingError::InvalidEscape(format!("\\{other}"))),
            None => return Err(EncodingError::InvalidEscape("\\".to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_literal() {
        assert_eq!(decode_literal("0x0102ff").unwrap(), vec![1, 2, 255]);
        assert_eq!(decode_literal("0x").unwrap(), Vec::<u8>::new());
        assert!(matches!(decode_literal("0xzz"), Err(EncodingError::InvalidHex(_))));
    }

    #[test]
    fn quoted_literal_with_escapes() {
        assert_eq!(decode_literal("\"hi\"").unwrap(), b"hi".to_vec());
        assert_eq!(decode_literal(r#""a\nb""#).unwrap(), b"a\nb".to_vec());
        assert_eq!(decode_literal(r#""\x41\"""#).unwrap(), b"A\"".to_vec());
        assert!(matches!(decode_literal("\"abc"), Err(EncodingError::UnterminatedString)));
        assert!(matches!(decode_literal("\""), Err(EncodingError::UnterminatedString)));
        assert!(matches!(decode_literal(r#""\q""#), Err(EncodingError::InvalidEscape(_))));
    }

    #[test]
    fn wrapped_forms() {
        assert_eq!(decode_literal("base64(aGVsbG8=)").unwrap(), b"hello".to_vec());
        assert_eq!(decode_literal("b64(aGVsbG8)").unwrap(), b"hello".to_vec());
        assert_eq!(decode_literal("base32(NBSWY3DP)").unwrap(), b"hello".to_vec());
        assert_eq!(decode_literal("b32(NBSWY3DP)").unwrap(), b"hello".to_vec());
    }

    #[test]
    fn bare_operand_is_base64() {
        assert_eq!(decode_literal("aGVsbG8=").unwrap(), b"hello".to_vec());
        assert!(matches!(decode_literal("!!!"), Err(EncodingError::InvalidBase64(_))));
    }

    #[test]
    fn two_operand_form() {
        assert_eq!(decode_with("utf8", "abc").unwrap(), b"abc".to_vec());
        assert_eq!(decode_with("hex", "0a0b").unwrap(), vec![10, 11]);
        assert_eq!(decode_with("hex", "0x0a0b").unwrap(), vec![10, 11]);
        assert_eq!(decode_with("b32", "NBSWY3DP").unwrap(), b"hello".to_vec());
        assert!(matches!(
            decode_with("latin1", "abc"),
            Err(EncodingError::UnknownEncoding(e)) if e == "latin1"
        ));
    }

    #[test]
    fn base32_encodes_unpadded() {
        assert_eq!(encode_base32(b"hello"), "NBSWY3DP");
        assert_eq!(encode_base32(b"f"), "MY");
        assert_eq!(encode_base32(b""), "");
    }

    #[test]
    fn base32_decode_accepts_padding() {
        assert_eq!(decode_base32("MY======").unwrap(), b"f".to_vec());
        assert_eq!(decode_base32("MZXW6===").unwrap(), b"foo".to_vec());
        assert!(matches!(decode_base32("ab"), Err(EncodingError::InvalidBase32('a'))));
    }

    #[test]
    fn base32_round_trip_odd_lengths() {
        for len in 0..12u8 {
            let data: Vec<u8> = (0..len).map(|i| i.wrapping_mul(37)).collect();
            assert_eq!(decode_base32(&encode_base32(&data)).unwrap(), data);
        }
    }
}
