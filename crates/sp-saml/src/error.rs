//! SAML error types.
//!
//! Every failure of request construction, response validation or signature
//! verification maps to exactly one variant. The variants are diagnostic
//! only: callers presenting errors to end users should use
//! [`SamlError::public_message`], which does not reveal the failing stage.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// Message shown to end users for every authentication failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Authentication failed";

/// SAML service provider errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The authentication request could not be serialized or encoded.
    #[error("problem deflating AuthnRequest and encoding to Base64: {0}")]
    RequestConstruction(String),

    /// The IdP endpoint is not a valid absolute URI.
    #[error("malformed IdP endpoint: {0}")]
    MalformedEndpoint(String),

    /// The transport encoding could not be decoded.
    #[error("problem decoding response from Base64: {0}")]
    DecodeFailed(String),

    /// The decoded bytes are not a well-formed XML document.
    #[error("problem parsing XML of the response: {0}")]
    XmlParse(String),

    /// The document is a well-formed XML message but not a SAML Response.
    #[error("XML object is not a SAML Response: {0}")]
    NotAResponse(String),

    /// The Response does not conform to the SAML schema.
    #[error("invalid schema response: {0}")]
    SchemaInvalid(String),

    /// The top-level status code is not the success URI.
    #[error("status code was not a success: {0}")]
    StatusNotSuccess(String),

    /// The Response contains an encrypted assertion.
    #[error("encrypted assertions are not supported")]
    EncryptedAssertionUnsupported,

    /// The Response contains no assertion.
    #[error("no assertions found")]
    NoAssertionFound,

    /// The Response contains more than one assertion.
    #[error("more than one assertion was found ({0})")]
    MultipleAssertionsFound(usize),

    /// The assertion has no usable validity window.
    #[error("assertion conditions are missing: {0}")]
    ConditionsMissing(String),

    /// The current time is before the validity window.
    #[error("conditions are not yet active: NotBefore {not_before}, now {now}")]
    ConditionsNotYetActive {
        /// The assertion's NotBefore instant.
        not_before: DateTime<Utc>,
        /// The validation instant.
        now: DateTime<Utc>,
    },

    /// The current time is after the validity window.
    #[error("conditions have expired: NotOnOrAfter {not_on_or_after}, now {now}")]
    ConditionsExpired {
        /// The assertion's NotOnOrAfter instant.
        not_on_or_after: DateTime<Utc>,
        /// The validation instant.
        now: DateTime<Utc>,
    },

    /// The assertion has no subject NameID.
    #[error("assertion has no subject NameID")]
    SubjectMissing,

    /// The trust certificate could not be decoded.
    #[error("certificate is incorrect: {0}")]
    CertificateInvalid(String),

    /// The assertion carries no signature.
    #[error("{0} does not have signature")]
    MissingMandatorySignature(String),

    /// A signature is present but does not validate.
    #[error("{element} has invalid signature: {reason}")]
    InvalidSignature {
        /// The signed element ("Response" or "Assertion").
        element: String,
        /// What failed.
        reason: String,
    },

    /// No IdP is configured for the subject's domain.
    #[error("user {0} can not use SAML")]
    UserNotEntitled(String),

    /// An XML signature could not be produced.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// IdP configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SamlError {
    /// Creates an [`SamlError::InvalidSignature`] for `element`.
    pub fn invalid_signature(element: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            element: element.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the stage that produced this error.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::RequestConstruction(_) | Self::MalformedEndpoint(_) => "construction",
            Self::DecodeFailed(_) => "decode",
            Self::XmlParse(_) => "parse",
            Self::NotAResponse(_) | Self::SchemaInvalid(_) => "schema",
            Self::StatusNotSuccess(_) => "status",
            Self::EncryptedAssertionUnsupported
            | Self::NoAssertionFound
            | Self::MultipleAssertionsFound(_) => "assertion-count",
            Self::ConditionsMissing(_)
            | Self::ConditionsNotYetActive { .. }
            | Self::ConditionsExpired { .. } => "conditions",
            Self::SubjectMissing => "subject",
            Self::CertificateInvalid(_)
            | Self::MissingMandatorySignature(_)
            | Self::InvalidSignature { .. } => "signature",
            Self::SignatureCreation(_) => "signing",
            Self::UserNotEntitled(_) => "authorization",
            Self::Config(_) => "configuration",
        }
    }

    /// Returns true if this error means "not authenticated".
    ///
    /// Construction and configuration faults are internal errors instead.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        !matches!(
            self,
            Self::RequestConstruction(_)
                | Self::MalformedEndpoint(_)
                | Self::SignatureCreation(_)
                | Self::Config(_)
        )
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::DecodeFailed(_)
            | Self::XmlParse(_)
            | Self::NotAResponse(_)
            | Self::SchemaInvalid(_) => 400,
            Self::UserNotEntitled(_) => 403,
            Self::RequestConstruction(_)
            | Self::MalformedEndpoint(_)
            | Self::SignatureCreation(_)
            | Self::Config(_) => 500,
            _ => 401,
        }
    }

    /// Returns the message safe to show to an end user.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        if self.is_authentication_failure() {
            GENERIC_FAILURE_MESSAGE
        } else {
            "Internal server error"
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DecodeFailed(err.to_string())
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_named() {
        assert_eq!(SamlError::DecodeFailed("x".into()).stage(), "decode");
        assert_eq!(SamlError::NoAssertionFound.stage(), "assertion-count");
        assert_eq!(SamlError::SubjectMissing.stage(), "subject");
        assert_eq!(
            SamlError::invalid_signature("Assertion", "digest mismatch").stage(),
            "signature"
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(SamlError::XmlParse("x".into()).http_status(), 400);
        assert_eq!(SamlError::StatusNotSuccess("x".into()).http_status(), 401);
        assert_eq!(SamlError::UserNotEntitled("a@b".into()).http_status(), 403);
        assert_eq!(SamlError::Config("x".into()).http_status(), 500);
    }

    #[test]
    fn public_message_hides_stage() {
        let a = SamlError::MissingMandatorySignature("Assertion".into());
        let b = SamlError::ConditionsExpired {
            not_on_or_after: Utc::now(),
            now: Utc::now(),
        };
        assert_eq!(a.public_message(), b.public_message());
        assert_eq!(a.public_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            SamlError::MissingMandatorySignature("Assertion".into()).to_string(),
            "Assertion does not have signature"
        );
        assert_eq!(
            SamlError::UserNotEntitled("a@b.com".into()).to_string(),
            "user a@b.com can not use SAML"
        );
    }

    #[test]
    fn from_base64_error() {
        use base64::Engine;
        let err: SamlError = base64::engine::general_purpose::STANDARD
            .decode("!!!")
            .unwrap_err()
            .into();
        assert!(matches!(err, SamlError::DecodeFailed(_)));
    }
}
