//! Enveloped XML signature creation.
//!
//! Used by the mock identity provider and in tests; the service provider
//! itself never signs.

use base64::Engine;
use sp_crypto::SignatureAlgorithm;

use super::certificate::Certificate;
use super::{digest_algorithm_uri, signature_algorithm_uri};
use crate::error::{SamlError, SamlResult};
use crate::types::{transforms, SAML_NS, XMLDSIG_NS};
use crate::xml::{canonicalize, CanonicalizationMethod, Node, XmlDocument};

/// Signs elements of a SAML document with an RSA key.
#[derive(Clone)]
pub struct XmlSigner {
    key_der: Vec<u8>,
    certificate_b64: String,
    algorithm: SignatureAlgorithm,
}

impl std::fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl XmlSigner {
    /// Creates a signer from a PKCS#8 private key and its certificate, both PEM.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] for an unreadable key or
    /// [`SamlError::CertificateInvalid`] for an unreadable certificate.
    pub fn from_pem(key_pem: &str, certificate_pem: &str) -> SamlResult<Self> {
        let key_der = base64::engine::general_purpose::STANDARD
            .decode(pem_body(key_pem))
            .map_err(|e| SamlError::SignatureCreation(format!("private key is not PEM: {e}")))?;
        let certificate = Certificate::from_pem(certificate_pem)?;

        Ok(Self {
            key_der,
            certificate_b64: base64::engine::general_purpose::STANDARD.encode(certificate.der()),
            algorithm: SignatureAlgorithm::RsaSha256,
        })
    }

    /// Sets the signature algorithm. Only RSA algorithms can sign.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Adds an enveloped signature to the element whose `ID` is `id`.
    ///
    /// The signature is placed after the element's `saml:Issuer`, or first
    /// when there is none, and the whole document is returned serialized.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if the element is missing,
    /// already signed, or signing fails.
    pub fn sign(&self, xml: &str, id: &str) -> SamlResult<String> {
        let mut doc = XmlDocument::parse(xml)?;

        let target = doc
            .root
            .find_by_id(id)
            .ok_or_else(|| SamlError::SignatureCreation(format!("no element with ID '{id}'")))?;
        if target.child(XMLDSIG_NS, "Signature").is_some() {
            return Err(SamlError::SignatureCreation(format!(
                "element '{id}' is already signed"
            )));
        }

        let method = CanonicalizationMethod::Exclusive;
        let canonical = canonicalize(target, method, &[], None);
        let digest = sp_crypto::digest(self.algorithm.digest(), canonical.as_bytes());

        let signed_info = format!(
            concat!(
                r#"<ds:SignedInfo>"#,
                r#"<ds:CanonicalizationMethod Algorithm="{c14n}"></ds:CanonicalizationMethod>"#,
                r#"<ds:SignatureMethod Algorithm="{sig}"></ds:SignatureMethod>"#,
                r##"<ds:Reference URI="#{id}">"##,
                r#"<ds:Transforms>"#,
                r#"<ds:Transform Algorithm="{enveloped}"></ds:Transform>"#,
                r#"<ds:Transform Algorithm="{c14n}"></ds:Transform>"#,
                r#"</ds:Transforms>"#,
                r#"<ds:DigestMethod Algorithm="{digest_method}"></ds:DigestMethod>"#,
                r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
                r#"</ds:Reference>"#,
                r#"</ds:SignedInfo>"#
            ),
            c14n = method.uri(),
            sig = signature_algorithm_uri(self.algorithm),
            id = id,
            enveloped = transforms::ENVELOPED_SIGNATURE,
            digest_method = digest_algorithm_uri(self.algorithm.digest()),
            digest = base64::engine::general_purpose::STANDARD.encode(digest),
        );

        let wrapper =
            XmlDocument::parse(&format!(r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">{signed_info}</ds:Signature>"#))?;
        let signed_info_element = wrapper
            .root
            .child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| SamlError::SignatureCreation("SignedInfo not built".to_string()))?;
        let canonical_signed_info = canonicalize(signed_info_element, method, &[], None);

        let signature_value =
            sp_crypto::rsa_sign(&self.key_der, canonical_signed_info.as_bytes(), self.algorithm)
                .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;

        let signature = XmlDocument::parse(&format!(
            concat!(
                r#"<ds:Signature xmlns:ds="{ns}">{signed_info}"#,
                r#"<ds:SignatureValue>{value}</ds:SignatureValue>"#,
                r#"<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"#,
                r#"</ds:Signature>"#
            ),
            ns = XMLDSIG_NS,
            signed_info = signed_info,
            value = base64::engine::general_purpose::STANDARD.encode(signature_value),
            cert = self.certificate_b64,
        ))?
        .root;

        let target = doc
            .root
            .find_by_id_mut(id)
            .ok_or_else(|| SamlError::SignatureCreation(format!("no element with ID '{id}'")))?;
        let position = target
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(SAML_NS, "Issuer")))
            .map_or(0, |i| i + 1);
        target.children.insert(position, Node::Element(signature));

        Ok(doc.root.to_xml())
    }
}

/// Concatenates the base64 lines of a PEM block.
fn pem_body(pem: &str) -> String {
    pem.lines()
        .filter(|l| !l.trim_start().starts_with("-----"))
        .flat_map(|l| l.chars().filter(|c| !c.is_whitespace()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = include_str!("../../testdata/idp.key.pem");
    const CERT: &str = include_str!("../../testdata/idp.crt.pem");

    const DOC: &str = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r"><saml:Issuer>idp</saml:Issuer><saml:Assertion ID="_a"><saml:Subject/></saml:Assertion></samlp:Response>"#;

    #[test]
    fn signature_follows_issuer() {
        let signer = XmlSigner::from_pem(KEY, CERT).unwrap();
        let signed = signer.sign(DOC, "_r").unwrap();
        let doc = XmlDocument::parse(&signed).unwrap();
        let names: Vec<&str> = doc.root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Signature", "Assertion"]);
    }

    #[test]
    fn signature_goes_first_without_issuer() {
        let signer = XmlSigner::from_pem(KEY, CERT).unwrap();
        let signed = signer.sign(DOC, "_a").unwrap();
        let doc = XmlDocument::parse(&signed).unwrap();
        let assertion = doc.root.find_by_id("_a").unwrap();
        assert_eq!(assertion.elements().next().unwrap().name, "Signature");
    }

    #[test]
    fn refuses_to_sign_twice_or_unknown_ids() {
        let signer = XmlSigner::from_pem(KEY, CERT).unwrap();
        let signed = signer.sign(DOC, "_a").unwrap();
        assert!(matches!(
            signer.sign(&signed, "_a"),
            Err(SamlError::SignatureCreation(_))
        ));
        assert!(matches!(
            signer.sign(DOC, "_missing"),
            Err(SamlError::SignatureCreation(_))
        ));
    }

    #[test]
    fn ecdsa_cannot_sign() {
        let signer = XmlSigner::from_pem(KEY, CERT)
            .unwrap()
            .with_algorithm(SignatureAlgorithm::EcdsaSha256);
        assert!(matches!(
            signer.sign(DOC, "_a"),
            Err(SamlError::SignatureCreation(_))
        ));
    }
}
