//! XML Signature support.
//!
//! Verification of enveloped XML-DSig signatures on Responses and
//! Assertions against a configured trust certificate, plus a signer used by
//! the mock identity provider.
//!
//! # Algorithms
//!
//! - RSA-SHA256, RSA-SHA384, RSA-SHA512
//! - ECDSA-SHA256 (P-256), ECDSA-SHA384 (P-384)
//! - RSA-SHA1 and SHA-1 digests only when explicitly allowed

mod certificate;
mod signer;
mod verifier;

pub use certificate::{normalize_pem, Certificate, KeyType};
pub use signer::XmlSigner;
pub use verifier::{verify, SignatureVerifier};

use sp_crypto::{DigestAlgorithm, SignatureAlgorithm};

use crate::types::{digest_algorithms, signature_algorithms};

/// Maps a `SignatureMethod` URI to an algorithm.
#[must_use]
pub fn signature_algorithm_from_uri(uri: &str) -> Option<SignatureAlgorithm> {
    match uri {
        signature_algorithms::RSA_SHA256 => Some(SignatureAlgorithm::RsaSha256),
        signature_algorithms::RSA_SHA384 => Some(SignatureAlgorithm::RsaSha384),
        signature_algorithms::RSA_SHA512 => Some(SignatureAlgorithm::RsaSha512),
        signature_algorithms::ECDSA_SHA256 => Some(SignatureAlgorithm::EcdsaSha256),
        signature_algorithms::ECDSA_SHA384 => Some(SignatureAlgorithm::EcdsaSha384),
        signature_algorithms::RSA_SHA1 => Some(SignatureAlgorithm::RsaSha1),
        _ => None,
    }
}

/// Returns the `SignatureMethod` URI of an algorithm.
#[must_use]
pub const fn signature_algorithm_uri(algorithm: SignatureAlgorithm) -> &'static str {
    match algorithm {
        SignatureAlgorithm::RsaSha256 => signature_algorithms::RSA_SHA256,
        SignatureAlgorithm::RsaSha384 => signature_algorithms::RSA_SHA384,
        SignatureAlgorithm::RsaSha512 => signature_algorithms::RSA_SHA512,
        SignatureAlgorithm::EcdsaSha256 => signature_algorithms::ECDSA_SHA256,
        SignatureAlgorithm::EcdsaSha384 => signature_algorithms::ECDSA_SHA384,
        SignatureAlgorithm::RsaSha1 => signature_algorithms::RSA_SHA1,
    }
}

/// Maps a `DigestMethod` URI to an algorithm.
#[must_use]
pub fn digest_algorithm_from_uri(uri: &str) -> Option<DigestAlgorithm> {
    match uri {
        digest_algorithms::SHA256 => Some(DigestAlgorithm::Sha256),
        digest_algorithms::SHA384 => Some(DigestAlgorithm::Sha384),
        digest_algorithms::SHA512 => Some(DigestAlgorithm::Sha512),
        digest_algorithms::SHA1 => Some(DigestAlgorithm::Sha1),
        _ => None,
    }
}

/// Returns the `DigestMethod` URI of an algorithm.
#[must_use]
pub const fn digest_algorithm_uri(algorithm: DigestAlgorithm) -> &'static str {
    match algorithm {
        DigestAlgorithm::Sha256 => digest_algorithms::SHA256,
        DigestAlgorithm::Sha384 => digest_algorithms::SHA384,
        DigestAlgorithm::Sha512 => digest_algorithms::SHA512,
        DigestAlgorithm::Sha1 => digest_algorithms::SHA1,
    }
}
