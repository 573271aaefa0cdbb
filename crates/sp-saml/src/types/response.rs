//! SAML Response types.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::schema::{require_version, required_attribute, required_instant};
use super::{Assertion, Status, SAMLP_NS, SAML_NS, XMLDSIG_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// A parsed SAML Response.
///
/// Read-only after parsing. Construction only checks schema conformance;
/// protocol-state checks are the validator's job.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The responding IdP, if named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The URL this response was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The request ID this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The response status.
    pub status: Status,

    /// Plaintext assertions in document order.
    pub assertions: Vec<Assertion>,

    /// Number of `EncryptedAssertion` children.
    pub encrypted_assertions: usize,

    /// Whether the envelope carries an enveloped signature.
    pub signed: bool,

    /// The source element, kept for signature verification.
    #[serde(skip)]
    pub element: Element,
}

impl Response {
    /// Maps a document element onto a Response.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::NotAResponse`] if the element is not a
    /// `samlp:Response`, or [`SamlError::SchemaInvalid`] if required
    /// structure is missing or IDs are duplicated.
    pub fn from_element(element: &Element) -> SamlResult<Self> {
        if !element.is(SAMLP_NS, "Response") {
            return Err(SamlError::NotAResponse(format!(
                "document element is {{{}}}{}",
                element.namespace.as_deref().unwrap_or(""),
                element.name
            )));
        }

        check_unique_ids(element)?;

        let id = required_attribute(element, "ID")?.to_string();
        if id.is_empty() {
            return Err(SamlError::SchemaInvalid("Response ID is empty".to_string()));
        }
        require_version(element)?;
        let issue_instant = required_instant(element, "IssueInstant")?;

        let status_element = element
            .child(SAMLP_NS, "Status")
            .ok_or_else(|| SamlError::SchemaInvalid("Response has no Status".to_string()))?;
        let status = Status::from_element(status_element)?;

        let assertions = element
            .children_named(SAML_NS, "Assertion")
            .map(Assertion::from_element)
            .collect::<SamlResult<Vec<_>>>()?;

        Ok(Self {
            id,
            issue_instant,
            issuer: element
                .child(SAML_NS, "Issuer")
                .map(|e| e.text().trim().to_string()),
            destination: element.attribute("Destination").map(str::to_string),
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            status,
            assertions,
            encrypted_assertions: element.children_named(SAML_NS, "EncryptedAssertion").count(),
            signed: element.child(XMLDSIG_NS, "Signature").is_some(),
            element: element.clone(),
        })
    }

    /// Returns the single assertion, if there is exactly one.
    #[must_use]
    pub fn single_assertion(&self) -> Option<&Assertion> {
        match self.assertions.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Rejects documents where two elements share an `ID`.
fn check_unique_ids(root: &Element) -> SamlResult<()> {
    let mut seen = HashSet::new();
    let mut duplicate = None;
    root.walk(&mut |e| {
        if let Some(id) = e.attribute("ID") {
            if !seen.insert(id) && duplicate.is_none() {
                duplicate = Some(id.to_string());
            }
        }
    });
    match duplicate {
        Some(id) => Err(SamlError::SchemaInvalid(format!("duplicate ID '{id}'"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::status_codes;
    use crate::xml::XmlDocument;

    fn response_xml(body: &str) -> String {
        format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r1" Version="2.0" IssueInstant="2024-05-01T10:00:00Z" InResponseTo="_req">
<saml:Issuer>https://idp.example.com</saml:Issuer>
<samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
{body}
</samlp:Response>"#
        )
    }

    const ASSERTION: &str = r#"<saml:Assertion ID="_a1" Version="2.0" IssueInstant="2024-05-01T10:00:00Z"><saml:Issuer>https://idp.example.com</saml:Issuer></saml:Assertion>"#;

    #[test]
    fn maps_response() {
        let doc = XmlDocument::parse(&response_xml(ASSERTION)).unwrap();
        let response = Response::from_element(&doc.root).unwrap();
        assert_eq!(response.id, "_r1");
        assert_eq!(response.in_response_to.as_deref(), Some("_req"));
        assert_eq!(response.status.status_code.value, status_codes::SUCCESS);
        assert_eq!(response.assertions.len(), 1);
        assert!(response.single_assertion().is_some());
        assert!(!response.signed);
    }

    #[test]
    fn other_message_types_are_not_responses() {
        let xml = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_x" Version="2.0"/>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert!(matches!(
            Response::from_element(&doc.root),
            Err(SamlError::NotAResponse(_))
        ));

        let wrong_ns = r#"<Response xmlns="urn:example" ID="_x"/>"#;
        let doc = XmlDocument::parse(wrong_ns).unwrap();
        assert!(matches!(
            Response::from_element(&doc.root),
            Err(SamlError::NotAResponse(_))
        ));
    }

    #[test]
    fn missing_status_is_schema_error() {
        let xml = response_xml("").replace(
            r#"<samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>"#,
            "",
        );
        let doc = XmlDocument::parse(&xml).unwrap();
        assert!(matches!(
            Response::from_element(&doc.root),
            Err(SamlError::SchemaInvalid(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let body = format!("{ASSERTION}{}", ASSERTION.replace("_a1", "_r1"));
        let doc = XmlDocument::parse(&response_xml(&body)).unwrap();
        let err = Response::from_element(&doc.root).unwrap_err();
        assert!(matches!(err, SamlError::SchemaInvalid(msg) if msg.contains("_r1")));
    }

    #[test]
    fn counts_encrypted_assertions() {
        let body = "<saml:EncryptedAssertion><x/></saml:EncryptedAssertion>";
        let doc = XmlDocument::parse(&response_xml(body)).unwrap();
        let response = Response::from_element(&doc.root).unwrap();
        assert_eq!(response.encrypted_assertions, 1);
        assert!(response.assertions.is_empty());
    }
}
