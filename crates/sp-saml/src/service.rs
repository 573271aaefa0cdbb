//! Service provider login flow.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::attributes::Attributes;
use crate::error::{SamlError, SamlResult};
use crate::request::RequestBuilder;
use crate::resolver::{IdentityConfigResolver, IdpSettings};
use crate::signature::SignatureVerifier;
use crate::types::{AuthRequest, DEFAULT_CLOCK_SKEW_SECS, DEFAULT_SP_ISSUER, MAX_CLOCK_SKEW_SECS};
use crate::users::UserDirectory;
use crate::validator::ResponseValidator;

/// Settings shared by every IdP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpSettings {
    /// Entity ID of this service provider.
    pub issuer: String,

    /// Assertion consumer service URL.
    #[serde(rename = "acsUrl")]
    pub acs_url: String,

    /// Clock skew tolerance in seconds.
    pub clock_skew_secs: i64,
}

impl Default for SpSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_SP_ISSUER.to_string(),
            acs_url: format!("{DEFAULT_SP_ISSUER}/acs"),
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }
}

impl SpSettings {
    /// Returns the clock skew as a duration, clamped to
    /// `0..=MAX_CLOCK_SKEW_SECS`.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::try_seconds(self.clock_skew_secs.clamp(0, MAX_CLOCK_SKEW_SECS))
            .unwrap_or_else(Duration::zero)
    }
}

/// Where to send the browser to start a login.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    /// The request that was built.
    pub request: AuthRequest,
    /// IdP endpoint with the `SAMLRequest` parameter.
    pub redirect_uri: Url,
}

/// A subject whose login completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Subject email.
    pub email: String,
    /// Composed display name, possibly empty.
    pub display_name: String,
    /// Asserted attributes.
    pub attributes: Attributes,
}

/// Ties request building, validation, IdP lookup and the user directory
/// together.
pub struct ServiceProvider {
    settings: SpSettings,
    resolver: Arc<dyn IdentityConfigResolver>,
    users: Arc<UserDirectory>,
    builder: RequestBuilder,
    validator: ResponseValidator,
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("settings", &self.settings)
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl ServiceProvider {
    /// Creates a service provider.
    pub fn new(
        settings: SpSettings,
        resolver: Arc<dyn IdentityConfigResolver>,
        users: Arc<UserDirectory>,
    ) -> Self {
        let builder = RequestBuilder::new(settings.issuer.clone());
        let validator = ResponseValidator::new().with_clock_skew(settings.clock_skew());
        Self {
            settings,
            resolver,
            users,
            builder,
            validator,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &SpSettings {
        &self.settings
    }

    /// Returns the user directory.
    #[must_use]
    pub fn users(&self) -> &Arc<UserDirectory> {
        &self.users
    }

    /// Starts a login for `email`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UserNotEntitled`] for an unregistered domain,
    /// or a construction error.
    pub fn begin_login(&self, email: &str) -> SamlResult<LoginRedirect> {
        let idp = self.idp_for(email)?;
        let (request, encoded) = self.builder.build(&self.settings.acs_url)?;
        let redirect_uri = RequestBuilder::build_redirect_uri(&idp.saml_endpoint, &encoded)?;
        info!(%email, request_id = %request.id, "redirecting to IdP");
        Ok(LoginRedirect {
            request,
            redirect_uri,
        })
    }

    /// Completes a login from a posted `SAMLResponse`.
    ///
    /// # Errors
    ///
    /// Returns the first validation, lookup or signature error.
    pub fn complete_login(&self, saml_response: &str) -> SamlResult<AuthenticatedUser> {
        self.complete_login_at(saml_response, Utc::now())
    }

    /// Completes a login as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns the first validation, lookup or signature error.
    pub fn complete_login_at(
        &self,
        saml_response: &str,
        now: DateTime<Utc>,
    ) -> SamlResult<AuthenticatedUser> {
        let validated = self.validator.validate_at(saml_response, now)?;
        let idp = self.idp_for(validated.subject_name_id())?;
        let verifier = SignatureVerifier::from_pem(&idp.certificate_pem)?;
        let (email, attributes) = validated.verify(&verifier)?.into_parts();

        let display_name = attributes.display_name();
        self.users.upsert(email.clone(), display_name.clone());
        info!(%email, "login completed");

        Ok(AuthenticatedUser {
            email,
            display_name,
            attributes,
        })
    }

    fn idp_for(&self, email: &str) -> SamlResult<IdpSettings> {
        match self.resolver.resolve(email)? {
            Some(settings) => Ok(settings),
            None => {
                warn!(%email, "no IdP configured for subject");
                Err(SamlError::UserNotEntitled(email.to_string()))
            }
        }
    }
}
