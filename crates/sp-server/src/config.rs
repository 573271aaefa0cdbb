//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::path::PathBuf;

use chrono::Duration;
use sp_saml::{SpSettings, DEFAULT_CLOCK_SKEW_SECS};

/// Default browser session lifetime in seconds (8 hours).
pub const DEFAULT_SESSION_LIFETIME_SECS: i64 = 8 * 60 * 60;

/// Longest accepted browser session lifetime in seconds (30 days).
pub const MAX_SESSION_LIFETIME_SECS: i64 = 30 * 24 * 60 * 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server (used in generated URLs).
    pub base_url: String,

    /// Assertion consumer service URL sent in every AuthnRequest.
    pub acs_url: String,

    /// Entity ID of this service provider.
    pub issuer: String,

    /// Directory holding one `<domain>.toml` per trusted IdP.
    pub idp_config_dir: PathBuf,

    /// Clock skew tolerance in seconds.
    pub clock_skew_secs: i64,

    /// Maximum age of a browser session in seconds.
    pub session_lifetime_secs: i64,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("SP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("SP_PORT") {
            Ok(p) => p
                .parse()
                .map_err(|e| anyhow::anyhow!("SP_PORT must be a port number: {e}"))?,
            Err(_) => 8080,
        };

        let base_url =
            std::env::var("SP_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));
        let acs_url = std::env::var("SP_ACS_URL").unwrap_or_else(|_| format!("{base_url}/acs"));
        let issuer = std::env::var("SP_ISSUER").unwrap_or_else(|_| base_url.clone());

        let idp_config_dir = std::env::var("SP_IDP_CONFIG_DIR")
            .map_or_else(|_| PathBuf::from("idp-config"), PathBuf::from);

        let clock_skew_secs = parse_clock_skew(std::env::var("SP_CLOCK_SKEW_SECS").ok())?;
        let session_lifetime_secs =
            parse_session_lifetime(std::env::var("SP_SESSION_LIFETIME_SECS").ok())?;

        Ok(Self {
            host,
            port,
            base_url,
            acs_url,
            issuer,
            idp_config_dir,
            clock_skew_secs,
            session_lifetime_secs,
        })
    }

    /// Returns the maximum session age, clamped to
    /// `1..=MAX_SESSION_LIFETIME_SECS` seconds.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        Duration::try_seconds(self.session_lifetime_secs.clamp(1, MAX_SESSION_LIFETIME_SECS))
            .unwrap_or_else(Duration::zero)
    }

    /// Returns the settings handed to the service provider.
    #[must_use]
    pub fn sp_settings(&self) -> SpSettings {
        SpSettings {
            issuer: self.issuer.clone(),
            acs_url: self.acs_url.clone(),
            clock_skew_secs: self.clock_skew_secs,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            acs_url: "http://localhost:8080/acs".to_string(),
            issuer: "http://localhost:8080".to_string(),
            idp_config_dir: PathBuf::from("idp-config"),
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
        }
    }
}

/// Parses `SP_CLOCK_SKEW_SECS`, falling back to the default when unset.
fn parse_clock_skew(value: Option<String>) -> anyhow::Result<i64> {
    let Some(value) = value else {
        return Ok(DEFAULT_CLOCK_SKEW_SECS);
    };
    let secs: i64 = value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("SP_CLOCK_SKEW_SECS must be a number of seconds: {e}"))?;
    sp_saml::clock_skew_from_secs(secs)
        .map_err(|e| anyhow::anyhow!("SP_CLOCK_SKEW_SECS is invalid: {e}"))?;
    Ok(secs)
}

/// Parses `SP_SESSION_LIFETIME_SECS`, falling back to the default when unset.
fn parse_session_lifetime(value: Option<String>) -> anyhow::Result<i64> {
    let Some(value) = value else {
        return Ok(DEFAULT_SESSION_LIFETIME_SECS);
    };
    let secs: i64 = value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("SP_SESSION_LIFETIME_SECS must be a number of seconds: {e}"))?;
    if !(1..=MAX_SESSION_LIFETIME_SECS).contains(&secs) {
        anyhow::bail!(
            "SP_SESSION_LIFETIME_SECS must be between 1 and {MAX_SESSION_LIFETIME_SECS}, got {secs}"
        );
    }
    Ok(secs)
}
