//! Authentication request construction.

use chrono::Utc;
use tracing::debug;
use url::Url;

use crate::bindings::HttpRedirectBinding;
use crate::error::SamlResult;
use crate::types::{
    AuthRequest, AuthnContextClass, NameIdFormat, RequestedAuthnContext, SamlBinding,
    DEFAULT_SP_ISSUER,
};

/// Builds AuthnRequests for the HTTP-Redirect binding.
///
/// Every request asks for an email NameID, an exact password-protected
/// transport authentication context, and a response over HTTP-POST.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    issuer: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SP_ISSUER)
    }
}

impl RequestBuilder {
    /// Creates a builder issuing requests as `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Returns the issuer placed in every request.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Builds a fresh request for `acs_url` and its redirect encoding.
    ///
    /// The encoded form is raw DEFLATE followed by base64, ready to be
    /// placed in the `SAMLRequest` query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::RequestConstruction`] if serialization or
    /// compression fails.
    pub fn build(&self, acs_url: &str) -> SamlResult<(AuthRequest, String)> {
        let request = AuthRequest {
            id: format!("_{}", uuid::Uuid::new_v4().simple()),
            issue_instant: Utc::now(),
            issuer: self.issuer.clone(),
            acs_url: acs_url.to_string(),
            protocol_binding: SamlBinding::HttpPost,
            name_id_format: NameIdFormat::Email,
            requested_context: RequestedAuthnContext::exact(
                AuthnContextClass::PasswordProtectedTransport,
            ),
        };

        let xml = request.to_xml()?;
        let encoded = HttpRedirectBinding::encode_message(&xml)?;
        debug!(request_id = %request.id, acs_url, "AuthnRequest built");

        Ok((request, encoded))
    }

    /// Appends the encoded request to the IdP endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::MalformedEndpoint`] if `endpoint` is not
    /// an absolute URI.
    pub fn build_redirect_uri(endpoint: &str, encoded_request: &str) -> SamlResult<Url> {
        HttpRedirectBinding::build_redirect_uri(endpoint, encoded_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamlError;
    use crate::types::{SAMLP_NS, SAML_NS};
    use crate::xml::XmlDocument;

    #[test]
    fn encoded_request_decodes_to_serialized_xml() {
        let (request, encoded) = RequestBuilder::default()
            .build("https://sp.example/acs")
            .unwrap();
        let decoded = HttpRedirectBinding::decode_message(&encoded).unwrap();
        assert_eq!(decoded, request.to_xml().unwrap());
    }

    #[test]
    fn request_carries_acs_url_binding_and_id() {
        let (request, encoded) = RequestBuilder::default()
            .build("https://sp.example/acs")
            .unwrap();
        let xml = HttpRedirectBinding::decode_message(&encoded).unwrap();
        let doc = XmlDocument::parse(&xml).unwrap();

        assert!(doc.root.is(SAMLP_NS, "AuthnRequest"));
        assert_eq!(
            doc.root.attribute("AssertionConsumerServiceURL"),
            Some("https://sp.example/acs")
        );
        assert_eq!(
            doc.root.attribute("ProtocolBinding"),
            Some("urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST")
        );
        let id = doc.root.attribute("ID").unwrap();
        assert!(id.starts_with('_'));
        assert_eq!(id, request.id);
        assert_eq!(
            doc.root.child(SAML_NS, "Issuer").unwrap().text(),
            DEFAULT_SP_ISSUER
        );
    }

    #[test]
    fn request_ids_are_unique() {
        let builder = RequestBuilder::new("https://sp.test");
        let (a, _) = builder.build("https://sp.test/acs").unwrap();
        let (b, _) = builder.build("https://sp.test/acs").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.issuer, "https://sp.test");
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        assert!(matches!(
            RequestBuilder::build_redirect_uri("not a uri", "abc"),
            Err(SamlError::MalformedEndpoint(_))
        ));
        let uri =
            RequestBuilder::build_redirect_uri("https://idp.example.com/sso", "abc").unwrap();
        assert_eq!(uri.as_str(), "https://idp.example.com/sso?SAMLRequest=abc");
    }
}
