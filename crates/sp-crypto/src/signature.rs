//! Public-key signature operations.
//!
//! Verification takes the raw key bytes found in an X.509
//! `SubjectPublicKeyInfo`: the PKCS#1 `RSAPublicKey` for RSA keys and the
//! uncompressed point for EC keys.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};
use thiserror::Error;

use crate::algorithm::SignatureAlgorithm;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported for the given key.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// Elliptic curves accepted for ECDSA verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
}

/// Verifies `sig` over `data`.
///
/// `curve` is required for ECDSA algorithms and ignored for RSA.
///
/// # Errors
///
/// Returns [`SignatureError::Verification`] when the signature does not
/// match, or [`SignatureError::UnsupportedAlgorithm`] for a missing curve.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    curve: Option<EcCurve>,
    public_key: &[u8],
    data: &[u8],
    sig: &[u8],
) -> Result<(), SignatureError> {
    let verification_alg: &dyn signature::VerificationAlgorithm = match (algorithm, curve) {
        (SignatureAlgorithm::RsaSha1, _) => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        (SignatureAlgorithm::RsaSha256, _) => &signature::RSA_PKCS1_2048_8192_SHA256,
        (SignatureAlgorithm::RsaSha384, _) => &signature::RSA_PKCS1_2048_8192_SHA384,
        (SignatureAlgorithm::RsaSha512, _) => &signature::RSA_PKCS1_2048_8192_SHA512,
        (SignatureAlgorithm::EcdsaSha256, Some(EcCurve::P256)) => {
            &signature::ECDSA_P256_SHA256_FIXED
        }
        (SignatureAlgorithm::EcdsaSha256, Some(EcCurve::P384))
        | (SignatureAlgorithm::EcdsaSha384, Some(EcCurve::P256)) => {
            return Err(SignatureError::UnsupportedAlgorithm(format!(
                "{algorithm:?} on a {curve:?} key"
            )));
        }
        (SignatureAlgorithm::EcdsaSha384, Some(EcCurve::P384)) => {
            &signature::ECDSA_P384_SHA384_FIXED
        }
        (SignatureAlgorithm::EcdsaSha256 | SignatureAlgorithm::EcdsaSha384, None) => {
            return Err(SignatureError::UnsupportedAlgorithm(
                "ECDSA verification requires a named curve".to_string(),
            ));
        }
    };

    UnparsedPublicKey::new(verification_alg, public_key)
        .verify(data, sig)
        .map_err(|_| SignatureError::Verification)
}

/// Signs `data` with an RSA private key (PKCS#8 or PKCS#1 DER).
///
/// # Errors
///
/// Returns an error for non-RSA algorithms, unreadable keys, or signing
/// failures.
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let padding = match algorithm {
        SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
        SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
        SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
        other => {
            return Err(SignatureError::UnsupportedAlgorithm(format!(
                "{other:?} is not available for signing"
            )));
        }
    };

    let key_pair = RsaKeyPair::from_pkcs8(key_der)
        .or_else(|_| RsaKeyPair::from_der(key_der))
        .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];
    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdsa_without_curve_is_rejected() {
        let result = verify_signature(SignatureAlgorithm::EcdsaSha256, None, &[4u8; 65], b"x", b"y");
        assert!(matches!(result, Err(SignatureError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn garbage_key_does_not_verify() {
        let result = verify_signature(SignatureAlgorithm::RsaSha256, None, b"not a key", b"x", b"y");
        assert!(matches!(result, Err(SignatureError::Verification)));
    }

    #[test]
    fn signing_rejects_sha1_and_ecdsa() {
        assert!(rsa_sign(b"key", b"data", SignatureAlgorithm::RsaSha1).is_err());
        assert!(rsa_sign(b"key", b"data", SignatureAlgorithm::EcdsaSha256).is_err());
    }

    #[test]
    fn signing_rejects_invalid_key() {
        let result = rsa_sign(b"not a key", b"data", SignatureAlgorithm::RsaSha256);
        assert!(matches!(result, Err(SignatureError::InvalidKey(_))));
    }
}
