//! HTTP-POST binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Decodes a `SAMLResponse` form value to XML.
    ///
    /// Whitespace (line-wrapped base64) is ignored. No inflate stage.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::DecodeFailed`] for invalid base64 and
    /// [`SamlError::XmlParse`] for bytes that are not UTF-8.
    pub fn decode_message(value: &str) -> SamlResult<String> {
        let compact: String = value.split_whitespace().collect();
        if compact.is_empty() {
            return Err(SamlError::DecodeFailed("empty message".to_string()));
        }
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        String::from_utf8(bytes)
            .map_err(|e| SamlError::XmlParse(format!("invalid UTF-8 in message: {e}")))
    }

    /// Encodes XML for a `SAMLResponse` form field.
    #[must_use]
    pub fn encode_message(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }
}
