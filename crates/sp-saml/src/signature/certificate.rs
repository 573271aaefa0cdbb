//! Trust certificate handling.

use base64::Engine;
use chrono::{DateTime, Utc};
use sp_crypto::{EcCurve, SignatureAlgorithm};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::{SamlError, SamlResult};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Adds PEM delimiters around a bare base64 certificate body.
///
/// Input that already carries a `BEGIN CERTIFICATE` line is returned
/// trimmed but otherwise unchanged.
#[must_use]
pub fn normalize_pem(pem: &str) -> String {
    let trimmed = pem.trim();
    if trimmed.contains(PEM_BEGIN) {
        trimmed.to_string()
    } else {
        format!("{PEM_BEGIN}\n{trimmed}\n{PEM_END}")
    }
}

/// Public key algorithm family of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// RSA key.
    Rsa,
    /// EC key on the given curve.
    Ec(EcCurve),
}

/// A parsed X.509 trust certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    not_after: Option<DateTime<Utc>>,
    key_type: KeyType,
    public_key: Vec<u8>,
}

impl Certificate {
    /// Parses a PEM certificate, with or without delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateInvalid`] for malformed input.
    pub fn from_pem(pem: &str) -> SamlResult<Self> {
        let normalized = normalize_pem(pem);
        let der = pem_to_der(&normalized).ok_or_else(|| {
            SamlError::CertificateInvalid("string certificate is incorrect".to_string())
        })?;
        Self::from_der(der)
    }

    /// Parses a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateInvalid`] if the certificate or its
    /// key cannot be decoded.
    pub fn from_der(der: Vec<u8>) -> SamlResult<Self> {
        let (subject, not_after, key_type, public_key) = {
            let (_, cert) = X509Certificate::from_der(&der)
                .map_err(|e| SamlError::CertificateInvalid(format!("failed to parse: {e}")))?;

            let spki = cert.public_key();
            let key_type = match spki.parsed() {
                Ok(PublicKey::RSA(_)) => KeyType::Rsa,
                Ok(PublicKey::EC(point)) => match point.data().len() {
                    65 => KeyType::Ec(EcCurve::P256),
                    97 => KeyType::Ec(EcCurve::P384),
                    n => {
                        return Err(SamlError::CertificateInvalid(format!(
                            "unsupported EC point length {n}"
                        )));
                    }
                },
                Ok(_) => {
                    return Err(SamlError::CertificateInvalid(
                        "unsupported public key algorithm".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(SamlError::CertificateInvalid(format!(
                        "unreadable public key: {e}"
                    )));
                }
            };

            let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0);
            (
                cert.subject().to_string(),
                not_after,
                key_type,
                spki.subject_public_key.data.to_vec(),
            )
        };

        Ok(Self {
            der,
            subject,
            not_after,
            key_type,
            public_key,
        })
    }

    /// Returns the DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the end of the validity period.
    #[must_use]
    pub const fn not_after(&self) -> Option<DateTime<Utc>> {
        self.not_after
    }

    /// Returns the key family.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the SHA-256 fingerprint as colon-separated hex.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        sp_crypto::sha256(&self.der)
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Verifies `sig` over `data` with this certificate's key.
    pub(crate) fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        sig: &[u8],
    ) -> Result<(), String> {
        let curve = match self.key_type {
            KeyType::Rsa if algorithm.is_rsa() => None,
            KeyType::Ec(curve) if algorithm.is_ecdsa() => Some(curve),
            _ => {
                return Err(format!(
                    "{algorithm:?} does not match the certificate key type {:?}",
                    self.key_type
                ));
            }
        };
        sp_crypto::verify_signature(algorithm, curve, &self.public_key, data, sig)
            .map_err(|e| e.to_string())
    }
}

/// Extracts DER data from a PEM string.
fn pem_to_der(pem: &str) -> Option<Vec<u8>> {
    let start = pem.find(PEM_BEGIN)? + PEM_BEGIN.len();
    let end = pem.find(PEM_END)?;
    if end < start {
        return None;
    }

    let b64_data: String = pem[start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if b64_data.is_empty() {
        return None;
    }

    base64::engine::general_purpose::STANDARD.decode(&b64_data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDP_CERT: &str = include_str!("../../testdata/idp.crt.pem");

    fn bare_body(pem: &str) -> String {
        pem.lines()
            .filter(|l| !l.starts_with("-----"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn normalize_adds_delimiters_once() {
        let body = bare_body(IDP_CERT);
        let normalized = normalize_pem(&body);
        assert!(normalized.starts_with(PEM_BEGIN));
        assert!(normalized.ends_with(PEM_END));
        assert_eq!(normalize_pem(&normalized), normalized);
    }

    #[test]
    fn bare_body_parses_identically() {
        let delimited = Certificate::from_pem(IDP_CERT).unwrap();
        let bare = Certificate::from_pem(&bare_body(IDP_CERT)).unwrap();
        assert_eq!(delimited.der(), bare.der());
        assert_eq!(delimited.fingerprint(), bare.fingerprint());
        assert_eq!(delimited.key_type(), KeyType::Rsa);
        assert!(delimited.subject().contains("idp.example.com"));
    }

    #[test]
    fn single_line_body_parses() {
        let one_line: String = bare_body(IDP_CERT).split_whitespace().collect();
        assert!(Certificate::from_pem(&one_line).is_ok());
    }

    #[test]
    fn malformed_certificates_are_rejected() {
        for input in ["", "not base64 !!!", "QUJDRA==", "-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----"] {
            assert!(matches!(
                Certificate::from_pem(input),
                Err(SamlError::CertificateInvalid(_))
            ));
        }
    }

    #[test]
    fn key_type_must_match_algorithm() {
        let cert = Certificate::from_pem(IDP_CERT).unwrap();
        let err = cert
            .verify(SignatureAlgorithm::EcdsaSha256, b"data", b"sig")
            .unwrap_err();
        assert!(err.contains("key type"));
    }
}
