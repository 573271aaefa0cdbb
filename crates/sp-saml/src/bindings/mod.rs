//! SAML bindings.
//!
//! - **HTTP-Redirect** carries the outbound AuthnRequest: raw DEFLATE, then
//!   base64, then a URL query parameter.
//! - **HTTP-POST** carries the inbound Response: base64 in a form field, no
//!   compression.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form or query parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}
