//! Algorithm identifiers.
//!
//! XML-DSig names algorithms by URI. The protocol layer maps those URIs onto
//! these enums; this crate maps the enums onto aws-lc-rs primitives.

use serde::{Deserialize, Serialize};

/// Digest algorithms usable in a signature reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1 (legacy IdPs only).
    #[serde(rename = "SHA1")]
    Sha1,
    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns true for digests that should not be accepted by default.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Sha1)
    }
}

/// Public-key signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1 (legacy IdPs only).
    RsaSha1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    RsaSha256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    RsaSha384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    RsaSha512,
    /// ECDSA with SHA-256, fixed-length `r || s` encoding.
    EcdsaSha256,
    /// ECDSA with SHA-384, fixed-length `r || s` encoding.
    EcdsaSha384,
}

impl SignatureAlgorithm {
    /// Returns the digest used by this algorithm.
    #[must_use]
    pub const fn digest(self) -> DigestAlgorithm {
        match self {
            Self::RsaSha1 => DigestAlgorithm::Sha1,
            Self::RsaSha256 | Self::EcdsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 | Self::EcdsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 => DigestAlgorithm::Sha512,
        }
    }

    /// Returns true if this algorithm uses RSA keys.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(
            self,
            Self::RsaSha1 | Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512
        )
    }

    /// Returns true if this algorithm uses EC keys.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::EcdsaSha256 | Self::EcdsaSha384)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_algorithm_digests() {
        assert_eq!(SignatureAlgorithm::RsaSha256.digest(), DigestAlgorithm::Sha256);
        assert_eq!(SignatureAlgorithm::EcdsaSha384.digest(), DigestAlgorithm::Sha384);
        assert!(SignatureAlgorithm::RsaSha1.digest().is_legacy());
    }

    #[test]
    fn key_families() {
        assert!(SignatureAlgorithm::RsaSha512.is_rsa());
        assert!(!SignatureAlgorithm::RsaSha512.is_ecdsa());
        assert!(SignatureAlgorithm::EcdsaSha256.is_ecdsa());
    }
}
