//! Response validation pipeline.
//!
//! Runs the ordered stages decode, parse, schema, status, assertion count,
//! conditions and subject extraction. The first failing stage aborts the
//! pipeline. Signature verification is a separate step performed on the
//! result with an IdP certificate (see [`ValidatedResponse::verify`]).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::attributes::Attributes;
use crate::bindings::HttpPostBinding;
use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureVerifier;
use crate::types::{Assertion, Response, DEFAULT_CLOCK_SKEW_SECS, MAX_CLOCK_SKEW_SECS};
use crate::xml::XmlDocument;

/// Validates base64 `SAMLResponse` values received over HTTP-POST.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator {
    clock_skew: Duration,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseValidator {
    /// Creates a validator with the default 300 second clock skew.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    /// Sets the tolerance applied to both ends of the validity window.
    ///
    /// A negative skew is treated as zero.
    #[must_use]
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew.max(Duration::zero());
        self
    }

    /// Returns the configured clock skew.
    #[must_use]
    pub const fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Validates `raw` at the current time.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that rejects the response.
    pub fn validate(&self, raw: &str) -> SamlResult<ValidatedResponse> {
        self.validate_at(raw, Utc::now())
    }

    /// Validates `raw` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that rejects the response.
    pub fn validate_at(&self, raw: &str, now: DateTime<Utc>) -> SamlResult<ValidatedResponse> {
        self.run(raw, now).inspect_err(|e| {
            warn!(stage = e.stage(), error = %e, "SAML response rejected");
        })
    }

    fn run(&self, raw: &str, now: DateTime<Utc>) -> SamlResult<ValidatedResponse> {
        let xml = HttpPostBinding::decode_message(raw)?;
        let document = XmlDocument::parse(&xml)?;
        let response = Response::from_element(&document.root)?;
        debug!(response_id = %response.id, "SAML response parsed");

        if !response.status.is_success() {
            return Err(SamlError::StatusNotSuccess(
                response.status.status_code.value.clone(),
            ));
        }

        if response.encrypted_assertions > 0 {
            return Err(SamlError::EncryptedAssertionUnsupported);
        }
        let assertion = match response.assertions.as_slice() {
            [only] => only,
            [] => return Err(SamlError::NoAssertionFound),
            many => return Err(SamlError::MultipleAssertionsFound(many.len())),
        };

        self.check_conditions(assertion, now)?;

        let subject_name_id = assertion
            .subject_name_id()
            .ok_or(SamlError::SubjectMissing)?
            .to_string();
        let attributes = Attributes::from_assertion(assertion);
        debug!(
            response_id = %response.id,
            subject = %subject_name_id,
            attributes = attributes.len(),
            "SAML response passed structural validation"
        );

        Ok(ValidatedResponse {
            response,
            subject_name_id,
            attributes,
        })
    }

    /// Rejects `now` outside `[NotBefore - skew, NotOnOrAfter + skew]`.
    fn check_conditions(&self, assertion: &Assertion, now: DateTime<Utc>) -> SamlResult<()> {
        let conditions = assertion
            .conditions
            .as_ref()
            .ok_or_else(|| SamlError::ConditionsMissing("no Conditions element".to_string()))?;
        let not_before = conditions
            .not_before
            .ok_or_else(|| SamlError::ConditionsMissing("NotBefore is absent".to_string()))?;
        let not_on_or_after = conditions
            .not_on_or_after
            .ok_or_else(|| SamlError::ConditionsMissing("NotOnOrAfter is absent".to_string()))?;

        // A window bound that leaves the representable range fails closed.
        let earliest = not_before.checked_sub_signed(self.clock_skew);
        if earliest.map_or(true, |earliest| now < earliest) {
            return Err(SamlError::ConditionsNotYetActive { not_before, now });
        }
        // Inclusive after skew: `NotOnOrAfter + skew` itself is still accepted.
        let latest = not_on_or_after.checked_add_signed(self.clock_skew);
        if latest.map_or(true, |latest| now > latest) {
            return Err(SamlError::ConditionsExpired {
                not_on_or_after,
                now,
            });
        }
        Ok(())
    }
}

/// Converts a configured clock skew in seconds into a duration.
///
/// # Errors
///
/// Returns [`SamlError::Config`] unless `secs` lies in
/// `0..=MAX_CLOCK_SKEW_SECS`.
pub fn clock_skew_from_secs(secs: i64) -> SamlResult<Duration> {
    if !(0..=MAX_CLOCK_SKEW_SECS).contains(&secs) {
        return Err(SamlError::Config(format!(
            "clock skew must be between 0 and {MAX_CLOCK_SKEW_SECS} seconds, got {secs}"
        )));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| SamlError::Config(format!("clock skew of {secs} seconds is out of range")))
}

/// A Response that passed every structural stage but whose signatures
/// have not been checked yet.
#[derive(Debug, Clone)]
pub struct ValidatedResponse {
    response: Response,
    subject_name_id: String,
    attributes: Attributes,
}

impl ValidatedResponse {
    /// Returns the parsed Response.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the single assertion.
    #[must_use]
    pub fn assertion(&self) -> &Assertion {
        &self.response.assertions[0]
    }

    /// Returns the subject NameID. Not trusted until verified.
    #[must_use]
    pub fn subject_name_id(&self) -> &str {
        &self.subject_name_id
    }

    /// Returns the extracted attributes. Not trusted until verified.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Checks the signatures and releases the identity.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingMandatorySignature`] or
    /// [`SamlError::InvalidSignature`].
    pub fn verify(self, verifier: &SignatureVerifier) -> SamlResult<ValidatedIdentity> {
        verifier
            .verify(&self.response, self.assertion())
            .inspect_err(|e| {
                warn!(stage = e.stage(), error = %e, "SAML response rejected");
            })?;

        Ok(ValidatedIdentity {
            subject_name_id: self.subject_name_id,
            attributes: self.attributes,
        })
    }
}

/// Identity of a subject whose response passed validation and signature
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedIdentity {
    subject_name_id: String,
    attributes: Attributes,
}

impl ValidatedIdentity {
    /// Returns the subject NameID.
    #[must_use]
    pub fn subject_name_id(&self) -> &str {
        &self.subject_name_id
    }

    /// Returns the subject's attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Splits the identity into its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Attributes) {
        (self.subject_name_id, self.attributes)
    }
}
