//! Identity provider lookup by subject email domain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SamlError, SamlResult};

/// Settings of one trusted identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpSettings {
    /// SSO endpoint receiving AuthnRequests.
    #[serde(rename = "samlEndpoint")]
    pub saml_endpoint: String,

    /// Trust certificate, PEM with or without delimiters.
    #[serde(rename = "x509Certificate")]
    pub certificate_pem: String,
}

/// Resolves the identity provider responsible for a subject.
///
/// `Ok(None)` means the subject's domain is not registered, which callers
/// must treat as "may not use SSO" rather than as a fault.
pub trait IdentityConfigResolver: Send + Sync {
    /// Looks up the IdP for `subject_email`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if configuration exists but cannot be
    /// read.
    fn resolve(&self, subject_email: &str) -> SamlResult<Option<IdpSettings>>;
}

impl<T: IdentityConfigResolver + ?Sized> IdentityConfigResolver for Arc<T> {
    fn resolve(&self, subject_email: &str) -> SamlResult<Option<IdpSettings>> {
        (**self).resolve(subject_email)
    }
}

/// Returns the lowercased domain after the last `@`.
///
/// Domains that could escape a configuration directory or are otherwise
/// not host names yield `None`.
#[must_use]
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.rsplit_once('@')?;
    let domain = domain.trim().to_ascii_lowercase();
    let valid = !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.contains("..")
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then_some(domain)
}

/// Reads `<domain>.toml` files from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    dir: PathBuf,
}

impl DirectoryResolver {
    /// Creates a resolver over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the configuration directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file holding the settings of `domain`.
    #[must_use]
    pub fn path_for(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.toml"))
    }
}

impl IdentityConfigResolver for DirectoryResolver {
    fn resolve(&self, subject_email: &str) -> SamlResult<Option<IdpSettings>> {
        let Some(domain) = email_domain(subject_email) else {
            return Ok(None);
        };
        let path = self.path_for(&domain);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(%domain, "no IdP configured for domain");
                return Ok(None);
            }
            Err(e) => {
                return Err(SamlError::Config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let settings: IdpSettings = toml::from_str(&content)
            .map_err(|e| SamlError::Config(format!("failed to parse {}: {e}", path.display())))?;
        debug!(%domain, endpoint = %settings.saml_endpoint, "IdP settings loaded");
        Ok(Some(settings))
    }
}

/// In-memory resolver keyed by domain.
#[derive(Debug, Default)]
pub struct StaticResolver {
    domains: DashMap<String, IdpSettings>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `settings` for `domain`.
    #[must_use]
    pub fn with_domain(self, domain: &str, settings: IdpSettings) -> Self {
        self.insert(domain, settings);
        self
    }

    /// Registers or replaces `settings` for `domain`.
    pub fn insert(&self, domain: &str, settings: IdpSettings) {
        self.domains.insert(domain.to_ascii_lowercase(), settings);
    }
}

impl IdentityConfigResolver for StaticResolver {
    fn resolve(&self, subject_email: &str) -> SamlResult<Option<IdpSettings>> {
        Ok(email_domain(subject_email)
            .and_then(|domain| self.domains.get(&domain).map(|s| s.value().clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> IdpSettings {
        IdpSettings {
            saml_endpoint: "https://idp.example.com/sso".to_string(),
            certificate_pem: "MIIB".to_string(),
        }
    }

    #[test]
    fn domain_is_after_last_at() {
        assert_eq!(email_domain("jane@Example.COM").as_deref(), Some("example.com"));
        assert_eq!(email_domain("a@b@corp.example").as_deref(), Some("corp.example"));
        assert_eq!(email_domain("no-at-sign"), None);
        assert_eq!(email_domain("x@"), None);
        assert_eq!(email_domain("x@../etc/passwd"), None);
        assert_eq!(email_domain("x@.hidden"), None);
    }

    #[test]
    fn static_resolver_lookup() {
        let resolver = StaticResolver::new().with_domain("example.com", settings());
        assert_eq!(resolver.resolve("a@example.com").unwrap(), Some(settings()));
        assert_eq!(resolver.resolve("a@other.com").unwrap(), None);
    }

    #[test]
    fn directory_resolver_reads_domain_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("example.com.toml"),
            "samlEndpoint = \"https://idp.example.com/sso\"\nx509Certificate = \"MIIB\"\n",
        )
        .unwrap();

        let resolver = DirectoryResolver::new(dir.path());
        assert_eq!(resolver.resolve("jane@example.com").unwrap(), Some(settings()));
        assert_eq!(resolver.resolve("jane@unknown.org").unwrap(), None);
    }

    #[test]
    fn unparsable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.com.toml"), "samlEndpoint = ").unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        assert!(matches!(
            resolver.resolve("a@broken.com"),
            Err(SamlError::Config(_))
        ));
    }
}
