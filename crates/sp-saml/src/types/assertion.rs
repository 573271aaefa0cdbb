//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::schema::{optional_instant, require_version, required_attribute, required_instant};
use super::{SAML_NS, XMLDSIG_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML Assertion.
#[derive(Debug, Clone, Serialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// The validity window and audience restrictions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// The authentication context class from the first AuthnStatement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class: Option<String>,

    /// Attribute statements in document order.
    pub attribute_statements: Vec<AttributeStatement>,

    /// Whether the assertion carries an enveloped signature.
    pub signed: bool,

    /// Decoded `SignatureValue` bytes, if signed.
    #[serde(skip)]
    pub signature_value: Option<Vec<u8>>,

    /// The source element, kept for signature verification.
    #[serde(skip)]
    pub element: Element,
}

impl Assertion {
    /// Returns the subject's NameID value, if any.
    #[must_use]
    pub fn subject_name_id(&self) -> Option<&str> {
        self.subject
            .as_ref()
            .and_then(|s| s.name_id.as_ref())
            .map(|n| n.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Maps a `saml:Assertion` element.
    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        let id = required_attribute(element, "ID")?.to_string();
        require_version(element)?;
        let issue_instant = required_instant(element, "IssueInstant")?;
        let issuer = element
            .child(SAML_NS, "Issuer")
            .map(|e| e.text().trim().to_string())
            .ok_or_else(|| SamlError::SchemaInvalid("Assertion has no Issuer".to_string()))?;

        let subject = element.child(SAML_NS, "Subject").map(Subject::from_element);
        let conditions = element
            .child(SAML_NS, "Conditions")
            .map(Conditions::from_element)
            .transpose()?;
        let authn_context_class = element
            .child(SAML_NS, "AuthnStatement")
            .and_then(|s| s.child(SAML_NS, "AuthnContext"))
            .and_then(|c| c.child(SAML_NS, "AuthnContextClassRef"))
            .map(|r| r.text().trim().to_string());
        let attribute_statements = element
            .children_named(SAML_NS, "AttributeStatement")
            .map(AttributeStatement::from_element)
            .collect::<SamlResult<Vec<_>>>()?;

        let signature = element.child(XMLDSIG_NS, "Signature");
        let signature_value = signature
            .and_then(|s| s.child(XMLDSIG_NS, "SignatureValue"))
            .and_then(|v| {
                let compact: String = v.text().split_whitespace().collect();
                base64::engine::general_purpose::STANDARD.decode(compact).ok()
            });

        Ok(Self {
            id,
            issue_instant,
            issuer,
            subject,
            conditions,
            authn_context_class,
            attribute_statements,
            signed: signature.is_some(),
            signature_value,
            element: element.clone(),
        })
    }
}

/// The subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    /// The subject's name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,
}

impl Subject {
    fn from_element(element: &Element) -> Self {
        Self {
            name_id: element.child(SAML_NS, "NameID").map(|n| NameId {
                value: n.text().trim().to_string(),
                format: n.attribute("Format").map(str::to_string),
            }),
        }
    }
}

/// A name identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format URI, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Assertion conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conditions {
    /// The earliest instant the assertion is valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// The instant at which the assertion expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audiences from all AudienceRestriction elements.
    pub audiences: Vec<String>,
}

impl Conditions {
    fn from_element(element: &Element) -> SamlResult<Self> {
        let audiences = element
            .children_named(SAML_NS, "AudienceRestriction")
            .flat_map(|r| r.children_named(SAML_NS, "Audience"))
            .map(|a| a.text().trim().to_string())
            .collect();
        Ok(Self {
            not_before: optional_instant(element, "NotBefore")?,
            not_on_or_after: optional_instant(element, "NotOnOrAfter")?,
            audiences,
        })
    }
}

/// An attribute statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeStatement {
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    fn from_element(element: &Element) -> SamlResult<Self> {
        let attributes = element
            .children_named(SAML_NS, "Attribute")
            .map(Attribute::from_element)
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Self { attributes })
    }
}

/// A named attribute with zero or more values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Name format URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// Text content of each AttributeValue, in document order.
    pub values: Vec<String>,
}

impl Attribute {
    fn from_element(element: &Element) -> SamlResult<Self> {
        Ok(Self {
            name: required_attribute(element, "Name")?.to_string(),
            name_format: element.attribute("NameFormat").map(str::to_string),
            friendly_name: element.attribute("FriendlyName").map(str::to_string),
            values: element
                .children_named(SAML_NS, "AttributeValue")
                .map(Element::text)
                .collect(),
        })
    }
}
