//! Signature checks for `ed25519verify` and `ecdsa_verify`.
//!
//! A signature that simply does not verify returns `Ok(false)`. Only inputs
//! of the wrong length are errors.

use ed25519_dalek::Verifier;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::{EncodedPoint, FieldBytes};

pub const ED25519_SIGNATURE_LEN: usize = 64;
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Length of each ECDSA component (hash, r, s, x, y).
pub const ECDSA_COMPONENT_LEN: usize = 32;

/// Malformed signature input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{what} must be {expected} bytes, got {actual}")]
pub struct SignatureError {
    pub what: &'static str,
    pub expected: usize,
    pub actual: usize,
}

fn fixed<const N: usize>(what: &'static str, bytes: &[u8]) -> Result<[u8; N], SignatureError> {
    bytes.try_into().map_err(|_| SignatureError {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

/// Verifies an Ed25519 signature over `data`.
pub fn ed25519_verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool, SignatureError> {
    let signature = fixed::<ED25519_SIGNATURE_LEN>("signature", signature)?;
    let public_key = fixed::<ED25519_PUBLIC_KEY_LEN>("public key", public_key)?;

    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&public_key) else {
        return Ok(false);
    };
    let signature = ed25519_dalek::Signature::from_bytes(&signature);
    Ok(key.verify(data, &signature).is_ok())
}

/// Verifies a secp256k1 ECDSA signature `(r, s)` over the 32-byte `hash`
/// against the uncompressed public key `(x, y)`.
pub fn secp256k1_verify(
    hash: &[u8],
    r: &[u8],
    s: &[u8],
    x: &[u8],
    y: &[u8],
) -> Result<bool, SignatureError> {
    let hash = fixed::<ECDSA_COMPONENT_LEN>("data", hash)?;
    let r = fixed::<ECDSA_COMPONENT_LEN>("signature r", r)?;
    let s = fixed::<ECDSA_COMPONENT_LEN>("signature s", s)?;
    let x = fixed::<ECDSA_COMPONENT_LEN>("public key x", x)?;
    let y = fixed::<ECDSA_COMPONENT_LEN>("public key y", y)?;

    let point = EncodedPoint::from_affine_coordinates(&FieldBytes::from(x), &FieldBytes::from(y), false);
    let Ok(key) = k256::ecdsa::VerifyingKey::from_encoded_point(&point) else {
        return Ok(false);
    };
    let Ok(signature) = k256::ecdsa::Signature::from_scalars(FieldBytes::from(r), FieldBytes::from(s))
    else {
        return Ok(false);
    };
    Ok(key.verify_prehash(&hash, &signature).is_ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::hashes::sha256;
    use ed25519_dalek::Signer;
    use k256::ecdsa::signature::hazmat::PrehashSigner;

    /// Signs `data` with a fixed Ed25519 key, returning `(signature, public_key)`.
    pub(crate) fn ed25519_fixture(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let signature = key.sign(data);
        (
            signature.to_bytes().to_vec(),
            key.verifying_key().to_bytes().to_vec(),
        )
    }

    /// Signs `hash` with a fixed secp256k1 key, returning `(r, s, x, y)`.
    pub(crate) fn secp256k1_fixture(hash: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        let key = k256::ecdsa::SigningKey::from_slice(&[9u8; 32]).unwrap();
        let signature: k256::ecdsa::Signature = key.sign_prehash(hash).unwrap();
        let sig = signature.to_bytes();
        let point = key.verifying_key().to_encoded_point(false);
        (
            sig[..32].to_vec(),
            sig[32..].to_vec(),
            point.x().unwrap().to_vec(),
            point.y().unwrap().to_vec(),
        )
    }

    #[test]
    fn ed25519_valid_signature() {
        let (sig, pk) = ed25519_fixture(b"approve");
        assert_eq!(ed25519_verify(b"approve", &sig, &pk), Ok(true));
    }

    #[test]
    fn ed25519_wrong_data_is_false() {
        let (sig, pk) = ed25519_fixture(b"approve");
        assert_eq!(ed25519_verify(b"reject", &sig, &pk), Ok(false));
    }

    #[test]
    fn ed25519_bad_lengths() {
        let (sig, pk) = ed25519_fixture(b"x");
        assert_eq!(
            ed25519_verify(b"x", &sig[..63], &pk),
            Err(SignatureError { what: "signature", expected: 64, actual: 63 })
        );
        assert!(ed25519_verify(b"x", &sig, &pk[..31]).is_err());
    }

    #[test]
    fn secp256k1_valid_signature() {
        let hash = sha256(b"payload");
        let (r, s, x, y) = secp256k1_fixture(&hash);
        assert_eq!(secp256k1_verify(&hash, &r, &s, &x, &y), Ok(true));
    }

    #[test]
    fn secp256k1_tampered_hash_is_false() {
        let hash = sha256(b"payload");
        let (r, s, x, y) = secp256k1_fixture(&hash);
        let other = sha256(b"other");
        assert_eq!(secp256k1_verify(&other, &r, &s, &x, &y), Ok(false));
    }

    #[test]
    fn secp256k1_point_off_curve_is_false() {
        let hash = sha256(b"payload");
        let (r, s, x, _) = secp256k1_fixture(&hash);
        assert_eq!(secp256k1_verify(&hash, &r, &s, &x, &[1u8; 32]), Ok(false));
    }

    #[test]
    fn secp256k1_zero_scalar_is_false() {
        let hash = sha256(b"payload");
        let (_, s, x, y) = secp256k1_fixture(&hash);
        assert_eq!(secp256k1_verify(&hash, &[0u8; 32], &s, &x, &y), Ok(false));
    }

    #[test]
    fn secp256k1_bad_length() {
        assert!(matches!(
            secp256k1_verify(&[0u8; 31], &[0u8; 32], &[0u8; 32], &[0u8; 32], &[0u8; 32]),
            Err(SignatureError { what: "data", .. })
        ));
    }
}
