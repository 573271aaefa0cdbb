//! Mock identity provider.
//!
//! Mints signed SAML Responses for tests and local development. Available
//! in unit tests and behind the `mock-idp` feature.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::bindings::HttpPostBinding;
use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;
use crate::types::{
    status_codes, AuthnContextClass, NameIdFormat, CM_BEARER, SAMLP_NS, SAML_NS, SAML_VERSION,
};

/// Shape of a Response to mint.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    subject: String,
    status: String,
    issue_instant: DateTime<Utc>,
    validity: Option<(DateTime<Utc>, DateTime<Utc>)>,
    conditions: bool,
    attributes: Vec<(String, Vec<String>)>,
    assertion_count: usize,
    encrypted: bool,
    sign_assertion: bool,
    sign_response: bool,
    destination: Option<String>,
    in_response_to: Option<String>,
    audience: Option<String>,
}

impl ResponseTemplate {
    /// A successful response for `subject`, issued now, valid for five
    /// minutes, with a signed assertion.
    ///
    /// An empty subject leaves out the `Subject` element.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            status: status_codes::SUCCESS.to_string(),
            issue_instant: Utc::now(),
            validity: None,
            conditions: true,
            attributes: Vec::new(),
            assertion_count: 1,
            encrypted: false,
            sign_assertion: true,
            sign_response: false,
            destination: None,
            in_response_to: None,
            audience: None,
        }
    }

    /// Sets the top-level status code.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the issue instant; the default window starts there.
    #[must_use]
    pub const fn issued_at(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Sets `NotBefore` and `NotOnOrAfter`.
    #[must_use]
    pub const fn valid_between(mut self, not_before: DateTime<Utc>, not_on_or_after: DateTime<Utc>) -> Self {
        self.validity = Some((not_before, not_on_or_after));
        self
    }

    /// Leaves out the `Conditions` element.
    #[must_use]
    pub const fn without_conditions(mut self) -> Self {
        self.conditions = false;
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attribute(mut self, name: &str, values: &[&str]) -> Self {
        self.attributes.push((
            name.to_string(),
            values.iter().map(|v| (*v).to_string()).collect(),
        ));
        self
    }

    /// Sets the number of plaintext assertions.
    #[must_use]
    pub const fn assertion_count(mut self, count: usize) -> Self {
        self.assertion_count = count;
        self
    }

    /// Adds an `EncryptedAssertion`.
    #[must_use]
    pub const fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Signs each assertion (default on).
    #[must_use]
    pub const fn sign_assertion(mut self, sign: bool) -> Self {
        self.sign_assertion = sign;
        self
    }

    /// Signs the Response envelope (default off).
    #[must_use]
    pub const fn sign_response(mut self, sign: bool) -> Self {
        self.sign_response = sign;
        self
    }

    /// Sets the `Destination` and confirmation recipient.
    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets `InResponseTo`.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Restricts the assertion to `audience`.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.validity
            .unwrap_or((self.issue_instant, self.issue_instant + Duration::minutes(5)))
    }
}

/// An identity provider that signs with a fixed key.
#[derive(Debug, Clone)]
pub struct MockIdp {
    issuer: String,
    signer: XmlSigner,
}

impl MockIdp {
    /// Creates an IdP with entity ID `issuer`.
    pub fn new(issuer: impl Into<String>, signer: XmlSigner) -> Self {
        Self {
            issuer: issuer.into(),
            signer,
        }
    }

    /// Returns the entity ID.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Renders and signs a Response.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if writing or signing fails.
    pub fn to_xml(&self, template: &ResponseTemplate) -> SamlResult<String> {
        let response_id = new_id();
        let assertion_ids: Vec<String> = (0..template.assertion_count).map(|_| new_id()).collect();

        let mut w = ResponseWriter::new();
        let mut root = BytesStart::new("samlp:Response");
        root.push_attribute(("xmlns:samlp", SAMLP_NS));
        root.push_attribute(("xmlns:saml", SAML_NS));
        root.push_attribute(("ID", response_id.as_str()));
        root.push_attribute(("Version", SAML_VERSION));
        root.push_attribute(("IssueInstant", instant(template.issue_instant).as_str()));
        if let Some(destination) = &template.destination {
            root.push_attribute(("Destination", destination.as_str()));
        }
        if let Some(request_id) = &template.in_response_to {
            root.push_attribute(("InResponseTo", request_id.as_str()));
        }
        w.start(root)?;
        w.text_element("saml:Issuer", &self.issuer)?;

        w.start(BytesStart::new("samlp:Status"))?;
        w.empty(BytesStart::new("samlp:StatusCode").with_attributes([("Value", template.status.as_str())]))?;
        w.end("samlp:Status")?;

        for id in &assertion_ids {
            self.write_assertion(&mut w, template, id)?;
        }

        if template.encrypted {
            w.start(BytesStart::new("saml:EncryptedAssertion"))?;
            w.empty(
                BytesStart::new("xenc:EncryptedData")
                    .with_attributes([("xmlns:xenc", "http://www.w3.org/2001/04/xmlenc#")]),
            )?;
            w.end("saml:EncryptedAssertion")?;
        }

        w.end("samlp:Response")?;
        let mut xml = w.finish()?;

        if template.sign_assertion {
            for id in &assertion_ids {
                xml = self.signer.sign(&xml, id)?;
            }
        }
        if template.sign_response {
            xml = self.signer.sign(&xml, &response_id)?;
        }
        Ok(xml)
    }

    /// Renders, signs and base64-encodes a Response for HTTP-POST.
    ///
    /// # Errors
    ///
    /// As [`MockIdp::to_xml`].
    pub fn to_base64(&self, template: &ResponseTemplate) -> SamlResult<String> {
        self.to_xml(template).map(|xml| HttpPostBinding::encode_message(&xml))
    }

    fn write_assertion(
        &self,
        w: &mut ResponseWriter,
        template: &ResponseTemplate,
        id: &str,
    ) -> SamlResult<()> {
        let (not_before, not_on_or_after) = template.window();

        w.start(BytesStart::new("saml:Assertion").with_attributes([
            ("ID", id),
            ("Version", SAML_VERSION),
            ("IssueInstant", instant(template.issue_instant).as_str()),
        ]))?;
        w.text_element("saml:Issuer", &self.issuer)?;

        if !template.subject.is_empty() {
            w.start(BytesStart::new("saml:Subject"))?;
            w.start(BytesStart::new("saml:NameID").with_attributes([("Format", NameIdFormat::Email.uri())]))?;
            w.text(&template.subject)?;
            w.end("saml:NameID")?;

            w.start(BytesStart::new("saml:SubjectConfirmation").with_attributes([("Method", CM_BEARER)]))?;
            let mut data = BytesStart::new("saml:SubjectConfirmationData");
            data.push_attribute(("NotOnOrAfter", instant(not_on_or_after).as_str()));
            if let Some(recipient) = &template.destination {
                data.push_attribute(("Recipient", recipient.as_str()));
            }
            if let Some(request_id) = &template.in_response_to {
                data.push_attribute(("InResponseTo", request_id.as_str()));
            }
            w.empty(data)?;
            w.end("saml:SubjectConfirmation")?;
            w.end("saml:Subject")?;
        }

        if template.conditions {
            w.start(BytesStart::new("saml:Conditions").with_attributes([
                ("NotBefore", instant(not_before).as_str()),
                ("NotOnOrAfter", instant(not_on_or_after).as_str()),
            ]))?;
            if let Some(audience) = &template.audience {
                w.start(BytesStart::new("saml:AudienceRestriction"))?;
                w.text_element("saml:Audience", audience)?;
                w.end("saml:AudienceRestriction")?;
            }
            w.end("saml:Conditions")?;
        }

        w.start(BytesStart::new("saml:AuthnStatement").with_attributes([
            ("AuthnInstant", instant(template.issue_instant).as_str()),
        ]))?;
        w.start(BytesStart::new("saml:AuthnContext"))?;
        w.text_element(
            "saml:AuthnContextClassRef",
            AuthnContextClass::PasswordProtectedTransport.uri(),
        )?;
        w.end("saml:AuthnContext")?;
        w.end("saml:AuthnStatement")?;

        if !template.attributes.is_empty() {
            w.start(BytesStart::new("saml:AttributeStatement"))?;
            for (name, values) in &template.attributes {
                w.start(BytesStart::new("saml:Attribute").with_attributes([("Name", name.as_str())]))?;
                for value in values {
                    w.text_element("saml:AttributeValue", value)?;
                }
                w.end("saml:Attribute")?;
            }
            w.end("saml:AttributeStatement")?;
        }

        w.end("saml:Assertion")
    }
}

struct ResponseWriter {
    writer: Writer<Vec<u8>>,
}

impl ResponseWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> SamlResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| SamlError::SignatureCreation(format!("failed to write response: {e}")))
    }

    fn start(&mut self, start: BytesStart<'_>) -> SamlResult<()> {
        self.event(Event::Start(start))
    }

    fn empty(&mut self, start: BytesStart<'_>) -> SamlResult<()> {
        self.event(Event::Empty(start))
    }

    fn text(&mut self, text: &str) -> SamlResult<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    fn end(&mut self, name: &str) -> SamlResult<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> SamlResult<()> {
        self.start(BytesStart::new(name))?;
        self.text(text)?;
        self.end(name)
    }

    fn finish(self) -> SamlResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| SamlError::SignatureCreation(format!("non UTF-8 output: {e}")))
    }
}

fn new_id() -> String {
    format!("_{}", uuid::Uuid::new_v4().simple())
}

fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Test keys and seeded data.
pub mod fixtures {
    use super::MockIdp;
    use crate::error::SamlResult;
    use crate::signature::XmlSigner;
    use crate::users::UserDirectory;

    /// PKCS#8 private key of the fixture IdP.
    pub const IDP_KEY_PEM: &str = include_str!("../testdata/idp.key.pem");

    /// Self-signed certificate of the fixture IdP.
    pub const IDP_CERT_PEM: &str = include_str!("../testdata/idp.crt.pem");

    /// Certificate of an unrelated issuer.
    pub const UNTRUSTED_CERT_PEM: &str = include_str!("../testdata/other.crt.pem");

    /// Entity ID of the fixture IdP.
    pub const IDP_ISSUER: &str = "https://idp.example.com";

    /// The fixture IdP.
    ///
    /// # Errors
    ///
    /// Fails only if the bundled key material is unreadable.
    pub fn idp() -> SamlResult<MockIdp> {
        Ok(MockIdp::new(
            IDP_ISSUER,
            XmlSigner::from_pem(IDP_KEY_PEM, IDP_CERT_PEM)?,
        ))
    }

    /// A directory holding the two seeded users.
    #[must_use]
    pub fn seeded_directory() -> UserDirectory {
        let users = UserDirectory::new();
        users.upsert("user1@example.com", "user №1");
        users.upsert("user2@example.com", "user №2");
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Response;
    use crate::xml::XmlDocument;

    fn parse(xml: &str) -> Response {
        Response::from_element(&XmlDocument::parse(xml).unwrap().root).unwrap()
    }

    #[test]
    fn renders_parseable_response() {
        let idp = fixtures::idp().unwrap();
        let xml = idp
            .to_xml(
                &ResponseTemplate::new("jane@example.com")
                    .destination("https://sp.example/acs")
                    .in_response_to("_req")
                    .audience("https://sp.example.com")
                    .attribute("FirstName", &["Jane"]),
            )
            .unwrap();
        let response = parse(&xml);
        let assertion = response.single_assertion().unwrap();

        assert_eq!(response.issuer.as_deref(), Some(fixtures::IDP_ISSUER));
        assert_eq!(response.destination.as_deref(), Some("https://sp.example/acs"));
        assert_eq!(response.in_response_to.as_deref(), Some("_req"));
        assert_eq!(assertion.subject_name_id(), Some("jane@example.com"));
        assert!(assertion.signed);
        assert!(!response.signed);
        assert_eq!(
            assertion.conditions.as_ref().unwrap().audiences,
            ["https://sp.example.com"]
        );
    }

    #[test]
    fn escapes_text_content() {
        let idp = fixtures::idp().unwrap();
        let xml = idp
            .to_xml(&ResponseTemplate::new("a@example.com").attribute("note", &["<b> & \"c\""]))
            .unwrap();
        let response = parse(&xml);
        let statement = &response.assertions[0].attribute_statements[0];
        assert_eq!(statement.attributes[0].values, ["<b> & \"c\""]);
    }

    #[test]
    fn seeded_directory_has_two_users() {
        let users = fixtures::seeded_directory();
        assert_eq!(users.len(), 2);
        assert_eq!(users.get("user1@example.com").as_deref(), Some("user №1"));
    }
}
