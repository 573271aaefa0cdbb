//! CLI configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Service provider entity ID.
    pub issuer: Option<String>,

    /// Assertion consumer service URL.
    pub acs_url: Option<String>,

    /// Directory of `<domain>.toml` IdP files.
    pub idp_config_dir: Option<PathBuf>,

    /// Clock skew tolerance in seconds.
    pub clock_skew_secs: Option<i64>,

    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl CliConfig {
    /// Loads configuration from file.
    pub fn load() -> crate::CliResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML.
    pub fn parse(content: &str) -> crate::CliResult<Self> {
        toml::from_str(content)
            .map_err(|e| crate::CliError::Config(format!("failed to parse config: {e}")))
    }

    /// Gets the configuration file path.
    pub fn config_path() -> crate::CliResult<PathBuf> {
        let home = dirs_next::home_dir().ok_or_else(|| {
            crate::CliError::Config("could not determine home directory".to_string())
        })?;
        Ok(home.join(".saml-sp").join("sp.toml"))
    }

    /// Gets the effective IdP config directory (from args or config).
    pub fn effective_config_dir(&self, arg: Option<PathBuf>) -> crate::CliResult<PathBuf> {
        arg.or_else(|| self.idp_config_dir.clone()).ok_or_else(|| {
            crate::CliError::InvalidArgument(
                "no IdP config directory: pass --config-dir or set idp_config_dir".to_string(),
            )
        })
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config = CliConfig::parse("acs_url = \"https://sp.test/acs\"\noutput_format = \"json\"\n")
            .unwrap();
        assert_eq!(config.acs_url.as_deref(), Some("https://sp.test/acs"));
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.issuer.is_none());
    }

    #[test]
    fn argument_overrides_config_dir() {
        let config = CliConfig {
            idp_config_dir: Some(PathBuf::from("/etc/sp")),
            ..CliConfig::default()
        };
        assert_eq!(
            config.effective_config_dir(Some(PathBuf::from("/tmp/x"))).unwrap(),
            PathBuf::from("/tmp/x")
        );
        assert_eq!(config.effective_config_dir(None).unwrap(), PathBuf::from("/etc/sp"));
        assert!(CliConfig::default().effective_config_dir(None).is_err());
    }
}
