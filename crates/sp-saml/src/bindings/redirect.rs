//! HTTP-Redirect binding.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use url::Url;

use crate::error::{SamlError, SamlResult};

use super::SamlMessageType;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a message for the query string: raw DEFLATE (RFC 1951, no
    /// zlib or gzip framing) followed by standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::RequestConstruction`] if compression fails.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }

    /// Appends `SAMLRequest=<encoded>` to `endpoint`, URL-encoding the value.
    ///
    /// Existing query parameters on the endpoint are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedEndpoint`] if `endpoint` is not an
    /// absolute URI.
    pub fn build_redirect_uri(endpoint: &str, encoded_request: &str) -> SamlResult<Url> {
        let mut url = Url::parse(endpoint.trim())
            .map_err(|e| SamlError::MalformedEndpoint(format!("'{endpoint}': {e}")))?;
        if url.cannot_be_a_base() {
            return Err(SamlError::MalformedEndpoint(format!(
                "'{endpoint}' is not a hierarchical URI"
            )));
        }
        url.query_pairs_mut()
            .append_pair(SamlMessageType::Request.form_param(), encoded_request);
        Ok(url)
    }

    /// Decodes a query parameter value back to XML.
    ///
    /// Accepts the value either URL-encoded or already decoded.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::DecodeFailed`] if any stage fails.
    pub fn decode_message(value: &str) -> SamlResult<String> {
        let url_decoded = if value.contains('%') {
            urlencoding::decode(value)
                .map_err(|e| SamlError::DecodeFailed(format!("URL decode error: {e}")))?
                .into_owned()
        } else {
            value.to_string()
        };
        let compact: String = url_decoded.split_whitespace().collect();
        let compressed = base64::engine::general_purpose::STANDARD.decode(compact)?;
        let xml = deflate_decompress(&compressed)?;
        String::from_utf8(xml)
            .map_err(|e| SamlError::DecodeFailed(format!("invalid UTF-8 in message: {e}")))
    }

    /// Extracts and decodes the `SAMLRequest` parameter of a redirect URL.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::DecodeFailed`] if the URL has no such parameter
    /// or it cannot be decoded.
    pub fn decode_url(url: &str) -> SamlResult<String> {
        let parsed = Url::parse(url)
            .map_err(|e| SamlError::DecodeFailed(format!("invalid URL: {e}")))?;
        let value = parsed
            .query_pairs()
            .find(|(key, _)| key == SamlMessageType::Request.form_param())
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| SamlError::DecodeFailed("no SAMLRequest parameter".to_string()))?;
        Self::decode_message(&value)
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::RequestConstruction(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::RequestConstruction(format!("compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::DecodeFailed(format!("decompression error: {e}")))?;
    Ok(decompressed)
}
