//! SAML Status types.

use serde::Serialize;

use super::schema::required_attribute;
use super::{status_codes, SAMLP_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// The top-level status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a status with the given top-level code.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::new(value),
            status_message: None,
        }
    }

    /// Returns true if the top-level code is exactly the success URI.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.value == status_codes::SUCCESS
    }

    /// Maps a `samlp:Status` element.
    pub(crate) fn from_element(element: &Element) -> SamlResult<Self> {
        let code = element.child(SAMLP_NS, "StatusCode").ok_or_else(|| {
            SamlError::SchemaInvalid("Status has no StatusCode".to_string())
        })?;
        Ok(Self {
            status_code: StatusCode::from_element(code)?,
            status_message: element
                .child(SAMLP_NS, "StatusMessage")
                .map(Element::text),
        })
    }
}

/// SAML status code, optionally nesting a second-level code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCode {
    /// The status code URI.
    pub value: String,

    /// Nested second-level status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a status code without a nested code.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    fn from_element(element: &Element) -> SamlResult<Self> {
        let value = required_attribute(element, "Value")?.to_string();
        let status_code = element
            .child(SAMLP_NS, "StatusCode")
            .map(Self::from_element)
            .transpose()?
            .map(Box::new);
        Ok(Self { value, status_code })
    }
}
