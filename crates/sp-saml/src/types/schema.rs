//! Helpers for mapping elements onto typed structures.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// Returns a required unqualified attribute, or a schema error.
pub(crate) fn required_attribute<'a>(element: &'a Element, name: &str) -> SamlResult<&'a str> {
    element.attribute(name).ok_or_else(|| {
        SamlError::SchemaInvalid(format!("{} has no {name} attribute", element.name))
    })
}

/// Parses an `xs:dateTime` value.
pub(crate) fn parse_instant(element: &Element, name: &str, value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            SamlError::SchemaInvalid(format!("{}@{name} is not a valid instant: {e}", element.name))
        })
}

/// Parses an optional `xs:dateTime` attribute.
pub(crate) fn optional_instant(element: &Element, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    element
        .attribute(name)
        .map(|value| parse_instant(element, name, value))
        .transpose()
}

/// Parses a required `xs:dateTime` attribute.
pub(crate) fn required_instant(element: &Element, name: &str) -> SamlResult<DateTime<Utc>> {
    parse_instant(element, name, required_attribute(element, name)?)
}

/// Checks the `Version` attribute of a protocol message or assertion.
pub(crate) fn require_version(element: &Element) -> SamlResult<()> {
    let version = required_attribute(element, "Version")?;
    if version == super::SAML_VERSION {
        Ok(())
    } else {
        Err(SamlError::SchemaInvalid(format!(
            "{} has unsupported version {version}",
            element.name
        )))
    }
}
