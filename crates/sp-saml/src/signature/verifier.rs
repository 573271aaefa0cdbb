//! Enveloped XML signature verification.

use base64::Engine;
use tracing::debug;

use super::certificate::Certificate;
use super::{digest_algorithm_from_uri, signature_algorithm_from_uri};
use crate::error::{SamlError, SamlResult};
use crate::types::{transforms, Assertion, Response, EXC_C14N_NS, XMLDSIG_NS};
use crate::xml::{canonicalize, CanonicalizationMethod, Element};

/// Verifies Response and Assertion signatures against one trusted
/// certificate.
///
/// Key material embedded in the message (`ds:KeyInfo`) is never used.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    certificate: Certificate,
    allow_sha1: bool,
}

impl SignatureVerifier {
    /// Creates a verifier for `certificate`.
    #[must_use]
    pub const fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            allow_sha1: false,
        }
    }

    /// Creates a verifier from a PEM certificate, with or without delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateInvalid`] for malformed input.
    pub fn from_pem(pem: &str) -> SamlResult<Self> {
        Certificate::from_pem(pem).map(Self::new)
    }

    /// Accepts RSA-SHA1 signatures and SHA-1 digests.
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Returns the trusted certificate.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Applies the signature policy to a parsed Response.
    ///
    /// A Response signature is optional but must be valid when present.
    /// The Assertion signature is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingMandatorySignature`] or
    /// [`SamlError::InvalidSignature`].
    pub fn verify(&self, response: &Response, assertion: &Assertion) -> SamlResult<()> {
        if response.signed {
            self.verify_element(&response.element, "Response")?;
            debug!(response_id = %response.id, "Response signature verified");
        }

        if !assertion.signed {
            return Err(SamlError::MissingMandatorySignature("Assertion".to_string()));
        }
        self.verify_element(&assertion.element, "Assertion")?;
        debug!(assertion_id = %assertion.id, "Assertion signature verified");
        Ok(())
    }

    /// Verifies the enveloped signature that is a direct child of `element`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidSignature`] labelled with `label`.
    pub fn verify_element(&self, element: &Element, label: &str) -> SamlResult<()> {
        let invalid = |reason: String| SamlError::invalid_signature(label, reason);

        let signatures: Vec<&Element> = element.children_named(XMLDSIG_NS, "Signature").collect();
        let signature = match signatures.as_slice() {
            [only] => *only,
            [] => return Err(invalid("no enveloped Signature element".to_string())),
            _ => return Err(invalid("more than one Signature element".to_string())),
        };

        let id = element
            .attribute("ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid("signed element has no ID".to_string()))?;

        let signed_info = signature
            .child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| invalid("missing SignedInfo".to_string()))?;

        let c14n_uri = signed_info
            .child(XMLDSIG_NS, "CanonicalizationMethod")
            .and_then(|m| m.attribute("Algorithm"))
            .ok_or_else(|| invalid("missing CanonicalizationMethod".to_string()))?;
        let signed_info_method = CanonicalizationMethod::from_uri(c14n_uri)
            .ok_or_else(|| invalid(format!("unsupported canonicalization {c14n_uri}")))?;
        let signed_info_prefixes = signed_info
            .child(XMLDSIG_NS, "CanonicalizationMethod")
            .map(inclusive_prefixes)
            .unwrap_or_default();

        let sig_uri = signed_info
            .child(XMLDSIG_NS, "SignatureMethod")
            .and_then(|m| m.attribute("Algorithm"))
            .ok_or_else(|| invalid("missing SignatureMethod".to_string()))?;
        let algorithm = signature_algorithm_from_uri(sig_uri)
            .ok_or_else(|| invalid(format!("unsupported signature method {sig_uri}")))?;
        if algorithm.digest().is_legacy() && !self.allow_sha1 {
            return Err(invalid("SHA-1 signatures are not accepted".to_string()));
        }

        let references: Vec<&Element> = signed_info.children_named(XMLDSIG_NS, "Reference").collect();
        let reference = match references.as_slice() {
            [only] => *only,
            _ => {
                return Err(invalid(format!(
                    "expected one Reference, found {}",
                    references.len()
                )));
            }
        };

        let expected_uri = format!("#{id}");
        if reference.attribute("URI") != Some(expected_uri.as_str()) {
            return Err(invalid(format!(
                "Reference URI {:?} does not point at the signed element {expected_uri}",
                reference.attribute("URI").unwrap_or("")
            )));
        }

        let (reference_method, reference_prefixes) = reference_transforms(reference)
            .map_err(invalid)?;

        let digest_uri = reference
            .child(XMLDSIG_NS, "DigestMethod")
            .and_then(|m| m.attribute("Algorithm"))
            .ok_or_else(|| invalid("missing DigestMethod".to_string()))?;
        let digest_algorithm = digest_algorithm_from_uri(digest_uri)
            .ok_or_else(|| invalid(format!("unsupported digest method {digest_uri}")))?;
        if digest_algorithm.is_legacy() && !self.allow_sha1 {
            return Err(invalid("SHA-1 digests are not accepted".to_string()));
        }

        let expected_digest = reference
            .child(XMLDSIG_NS, "DigestValue")
            .map(|v| decode_base64(&v.text()))
            .ok_or_else(|| invalid("missing DigestValue".to_string()))?
            .ok_or_else(|| invalid("DigestValue is not valid base64".to_string()))?;

        let canonical = canonicalize(
            element,
            reference_method,
            &reference_prefixes,
            Some(signature),
        );
        let actual_digest = sp_crypto::digest(digest_algorithm, canonical.as_bytes());
        if actual_digest != expected_digest {
            return Err(invalid("digest mismatch".to_string()));
        }

        let signature_value = signature
            .child(XMLDSIG_NS, "SignatureValue")
            .map(|v| decode_base64(&v.text()))
            .ok_or_else(|| invalid("missing SignatureValue".to_string()))?
            .ok_or_else(|| invalid("SignatureValue is not valid base64".to_string()))?;

        let canonical_signed_info =
            canonicalize(signed_info, signed_info_method, &signed_info_prefixes, None);
        self.certificate
            .verify(algorithm, canonical_signed_info.as_bytes(), &signature_value)
            .map_err(|e| invalid(format!("signature value does not verify: {e}")))
    }
}

/// Verifies the signatures of `response` and `assertion` with a PEM
/// certificate.
///
/// # Errors
///
/// Returns [`SamlError::CertificateInvalid`] for an unusable certificate,
/// otherwise as [`SignatureVerifier::verify`].
pub fn verify(certificate_pem: &str, response: &Response, assertion: &Assertion) -> SamlResult<()> {
    SignatureVerifier::from_pem(certificate_pem)?.verify(response, assertion)
}

/// Reads the transform chain of a Reference.
///
/// Only the enveloped-signature transform followed by at most one
/// canonicalization is accepted. Without an explicit canonicalization the
/// inclusive method applies.
fn reference_transforms(
    reference: &Element,
) -> Result<(CanonicalizationMethod, Vec<String>), String> {
    let chain: Vec<&Element> = reference
        .child(XMLDSIG_NS, "Transforms")
        .map(|t| t.children_named(XMLDSIG_NS, "Transform").collect())
        .unwrap_or_default();

    let mut enveloped = false;
    let mut method = None;
    let mut prefixes = Vec::new();
    for transform in chain {
        let uri = transform.attribute("Algorithm").unwrap_or("");
        if uri == transforms::ENVELOPED_SIGNATURE {
            if enveloped {
                return Err("repeated enveloped-signature transform".to_string());
            }
            enveloped = true;
        } else if let Some(m) = CanonicalizationMethod::from_uri(uri) {
            if method.is_some() {
                return Err("more than one canonicalization transform".to_string());
            }
            method = Some(m);
            prefixes = inclusive_prefixes(transform);
        } else {
            return Err(format!("unsupported transform {uri:?}"));
        }
    }

    if !enveloped {
        return Err("Reference lacks the enveloped-signature transform".to_string());
    }
    Ok((method.unwrap_or(CanonicalizationMethod::Inclusive), prefixes))
}

/// Reads an `ec:InclusiveNamespaces` `PrefixList`.
fn inclusive_prefixes(method: &Element) -> Vec<String> {
    method
        .child(EXC_C14N_NS, "InclusiveNamespaces")
        .and_then(|n| n.attribute("PrefixList"))
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    base64::engine::general_purpose::STANDARD.decode(compact).ok()
}
