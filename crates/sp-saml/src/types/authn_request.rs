//! SAML AuthnRequest types.
//!
//! Authentication request message sent by this service provider to an
//! identity provider.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use super::{AuthnContextClass, NameIdFormat, SamlBinding, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};

/// SAML Authentication Request.
///
/// Created fresh per login attempt and immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Unique identifier, always starting with `_`.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of this service provider.
    pub issuer: String,

    /// Where the IdP must post the response.
    pub acs_url: String,

    /// Binding the IdP must use for the response.
    pub protocol_binding: SamlBinding,

    /// Requested NameID format.
    pub name_id_format: NameIdFormat,

    /// Requested authentication context.
    pub requested_context: RequestedAuthnContext,
}

impl AuthRequest {
    /// Serializes the request to XML.
    ///
    /// Serialization is deterministic: the same request always yields the
    /// same bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::RequestConstruction`] if writing fails.
    pub fn to_xml(&self) -> SamlResult<String> {
        let mut writer = Writer::new(Vec::new());

        write_start(&mut writer, RequestElement::AuthnRequest(self).start())?;

        write_start(&mut writer, RequestElement::Issuer.start())?;
        write_text(&mut writer, &self.issuer)?;
        write_end(&mut writer, RequestElement::Issuer)?;

        write_empty(&mut writer, RequestElement::NameIdPolicy(self.name_id_format).start())?;

        write_start(
            &mut writer,
            RequestElement::RequestedAuthnContext(self.requested_context.comparison).start(),
        )?;
        write_start(&mut writer, RequestElement::AuthnContextClassRef.start())?;
        write_text(&mut writer, self.requested_context.class_ref.uri())?;
        write_end(&mut writer, RequestElement::AuthnContextClassRef)?;
        write_end(
            &mut writer,
            RequestElement::RequestedAuthnContext(self.requested_context.comparison),
        )?;

        write_end(&mut writer, RequestElement::AuthnRequest(self))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| SamlError::RequestConstruction(format!("non UTF-8 output: {e}")))
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestedAuthnContext {
    /// How the IdP should compare the class reference.
    pub comparison: AuthnContextComparison,

    /// The requested class.
    pub class_ref: AuthnContextClass,
}

impl RequestedAuthnContext {
    /// Requests exactly the given class.
    #[must_use]
    pub const fn exact(class_ref: AuthnContextClass) -> Self {
        Self {
            comparison: AuthnContextComparison::Exact,
            class_ref,
        }
    }
}

/// Authentication context comparison type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match.
    #[default]
    Exact,
    /// At least as strong.
    Minimum,
    /// At most as strong.
    Maximum,
    /// Stronger than.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}

/// The closed set of elements an AuthnRequest is made of.
enum RequestElement<'a> {
    AuthnRequest(&'a AuthRequest),
    Issuer,
    NameIdPolicy(NameIdFormat),
    RequestedAuthnContext(AuthnContextComparison),
    AuthnContextClassRef,
}

impl RequestElement<'_> {
    const fn qualified_name(&self) -> &'static str {
        match self {
            Self::AuthnRequest(_) => "samlp:AuthnRequest",
            Self::Issuer => "saml:Issuer",
            Self::NameIdPolicy(_) => "samlp:NameIDPolicy",
            Self::RequestedAuthnContext(_) => "samlp:RequestedAuthnContext",
            Self::AuthnContextClassRef => "saml:AuthnContextClassRef",
        }
    }

    fn start(&self) -> BytesStart<'static> {
        let mut start = BytesStart::new(self.qualified_name());
        match self {
            Self::AuthnRequest(request) => {
                let issue_instant = request
                    .issue_instant
                    .to_rfc3339_opts(SecondsFormat::Millis, true);
                start.push_attribute(("xmlns:samlp", SAMLP_NS));
                start.push_attribute(("xmlns:saml", SAML_NS));
                start.push_attribute(("ID", request.id.as_str()));
                start.push_attribute(("Version", SAML_VERSION));
                start.push_attribute(("IssueInstant", issue_instant.as_str()));
                start.push_attribute(("ProtocolBinding", request.protocol_binding.uri()));
                start.push_attribute(("AssertionConsumerServiceURL", request.acs_url.as_str()));
            }
            Self::NameIdPolicy(format) => {
                start.push_attribute(("Format", format.uri()));
            }
            Self::RequestedAuthnContext(comparison) => {
                start.push_attribute(("Comparison", comparison.as_str()));
            }
            Self::Issuer | Self::AuthnContextClassRef => {}
        }
        start
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SamlResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SamlError::RequestConstruction(e.to_string()))
}

fn write_start(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>) -> SamlResult<()> {
    write_event(writer, Event::Start(start))
}

fn write_empty(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>) -> SamlResult<()> {
    write_event(writer, Event::Empty(start))
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> SamlResult<()> {
    write_event(writer, Event::Text(BytesText::new(text)))
}

fn write_end(writer: &mut Writer<Vec<u8>>, element: RequestElement<'_>) -> SamlResult<()> {
    write_event(writer, Event::End(BytesEnd::new(element.qualified_name())))
}
