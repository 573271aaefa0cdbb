//! Attribute extraction from assertions.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::Assertion;

/// Attribute name holding the subject's given name.
pub const FIRST_NAME: &str = "FirstName";

/// Attribute name holding the subject's family name.
pub const LAST_NAME: &str = "LastName";

/// Flattened assertion attributes, keyed by attribute name.
///
/// Values keep document order. When several statements carry the same
/// name, the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(HashMap<String, Vec<String>>);

impl Attributes {
    /// Flattens every attribute statement of `assertion`.
    #[must_use]
    pub fn from_assertion(assertion: &Assertion) -> Self {
        let mut map = HashMap::new();
        for statement in &assertion.attribute_statements {
            for attribute in &statement.attributes {
                map.insert(attribute.name.clone(), attribute.values.clone());
            }
        }
        Self(map)
    }

    /// Returns all values of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Returns the first value of `name`, or `""`.
    #[must_use]
    pub fn single_value(&self, name: &str) -> &str {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .map_or("", String::as_str)
    }

    /// Composes `"FirstName LastName"`, trimmed.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.single_value(FIRST_NAME),
            self.single_value(LAST_NAME)
        )
        .trim()
        .to_string()
    }

    /// Number of distinct attribute names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over names and values in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Consumes the attributes into the underlying map.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.0
    }
}

impl From<HashMap<String, Vec<String>>> for Attributes {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// Flattens the attribute statements of `assertion`.
#[must_use]
pub fn extract_attributes(assertion: &Assertion) -> Attributes {
    Attributes::from_assertion(assertion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Response;
    use crate::xml::XmlDocument;

    fn assertion_with(statements: &str) -> Assertion {
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r" Version="2.0" IssueInstant="2024-05-01T10:00:00Z"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status><saml:Assertion ID="_a" Version="2.0" IssueInstant="2024-05-01T10:00:00Z"><saml:Issuer>idp</saml:Issuer>{statements}</saml:Assertion></samlp:Response>"#
        );
        let doc = XmlDocument::parse(&xml).unwrap();
        let response = Response::from_element(&doc.root).unwrap();
        response.assertions.into_iter().next().unwrap()
    }

    fn attribute(name: &str, values: &[&str]) -> String {
        let values: String = values
            .iter()
            .map(|v| format!("<saml:AttributeValue>{v}</saml:AttributeValue>"))
            .collect();
        format!(r#"<saml:Attribute Name="{name}">{values}</saml:Attribute>"#)
    }

    #[test]
    fn composes_display_name() {
        let statement = format!(
            "<saml:AttributeStatement>{}{}</saml:AttributeStatement>",
            attribute("FirstName", &["Jane"]),
            attribute("LastName", &["Doe"])
        );
        let attrs = extract_attributes(&assertion_with(&statement));
        assert_eq!(attrs.display_name(), "Jane Doe");
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn no_attributes_yield_empty_name() {
        let attrs = extract_attributes(&assertion_with(""));
        assert!(attrs.is_empty());
        assert_eq!(attrs.single_value(FIRST_NAME), "");
        assert_eq!(attrs.display_name(), "");
    }

    #[test]
    fn one_sided_name_is_trimmed() {
        let statement = format!(
            "<saml:AttributeStatement>{}</saml:AttributeStatement>",
            attribute("LastName", &["Doe"])
        );
        assert_eq!(extract_attributes(&assertion_with(&statement)).display_name(), "Doe");
    }

    #[test]
    fn values_keep_document_order() {
        let statement = format!(
            "<saml:AttributeStatement>{}</saml:AttributeStatement>",
            attribute("groups", &["admins", "staff", "users"])
        );
        let attrs = extract_attributes(&assertion_with(&statement));
        assert_eq!(attrs.get("groups").unwrap(), ["admins", "staff", "users"]);
        assert_eq!(attrs.single_value("groups"), "admins");
    }

    #[test]
    fn later_statement_overwrites() {
        let statements = format!(
            "<saml:AttributeStatement>{}</saml:AttributeStatement><saml:AttributeStatement>{}</saml:AttributeStatement>",
            attribute("role", &["a", "b"]),
            attribute("role", &["c"])
        );
        let attrs = extract_attributes(&assertion_with(&statements));
        assert_eq!(attrs.get("role").unwrap(), ["c"]);
    }
}
