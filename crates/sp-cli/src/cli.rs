//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;

/// SAML service provider CLI - build requests, inspect and validate responses.
#[derive(Debug, Parser)]
#[command(name = "sp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build an AuthnRequest for the HTTP-Redirect binding.
    Request(RequestArgs),

    /// Decode a SAMLRequest parameter or redirect URL back to XML.
    DecodeRequest {
        /// Encoded request, URL-encoded request, or full redirect URL.
        value: String,
    },

    /// Validate a base64 SAMLResponse offline.
    Validate(ValidateArgs),

    /// Show the IdP responsible for an email address.
    Resolve {
        /// Subject email.
        email: String,

        /// Directory of `<domain>.toml` IdP files (overrides config).
        #[arg(long, env = "SP_IDP_CONFIG_DIR")]
        config_dir: Option<PathBuf>,
    },

    /// Mint a signed SAMLResponse for local testing.
    MockIdp(MockIdpArgs),
}

/// Arguments of `sp request`.
#[derive(Debug, clap::Args)]
pub struct RequestArgs {
    /// Assertion consumer service URL (overrides config).
    #[arg(long, env = "SP_ACS_URL")]
    pub acs_url: Option<String>,

    /// Service provider entity ID (overrides config).
    #[arg(long, env = "SP_ISSUER")]
    pub issuer: Option<String>,

    /// IdP SSO endpoint; when given, the full redirect URI is printed.
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// Arguments of `sp validate`.
#[derive(Debug, clap::Args)]
pub struct ValidateArgs {
    /// File holding the base64 SAMLResponse.
    #[arg(long)]
    pub response_file: PathBuf,

    /// IdP certificate, PEM with or without delimiters.
    #[arg(long)]
    pub cert: PathBuf,

    /// Validate as of this RFC 3339 instant instead of now.
    #[arg(long)]
    pub at: Option<String>,

    /// Clock skew tolerance in seconds (overrides config).
    #[arg(long, env = "SP_CLOCK_SKEW_SECS")]
    pub clock_skew: Option<i64>,

    /// Accept SHA-1 signatures and digests.
    #[arg(long)]
    pub allow_sha1: bool,
}

/// Arguments of `sp mock-idp`.
#[derive(Debug, clap::Args)]
pub struct MockIdpArgs {
    /// IdP private key, PKCS#8 PEM.
    #[arg(long)]
    pub key: PathBuf,

    /// IdP certificate, PEM.
    #[arg(long)]
    pub cert: PathBuf,

    /// Subject NameID (email).
    #[arg(long)]
    pub subject: String,

    /// IdP entity ID.
    #[arg(long, default_value = "https://idp.example.com")]
    pub issuer: String,

    /// Attribute as `Name=Value`; repeat for more values or names.
    #[arg(long = "attribute", value_name = "NAME=VALUE")]
    pub attributes: Vec<String>,

    /// Response destination (the SP's ACS URL).
    #[arg(long)]
    pub destination: Option<String>,

    /// ID of the AuthnRequest being answered.
    #[arg(long)]
    pub in_response_to: Option<String>,

    /// Assertion lifetime in seconds.
    #[arg(long, default_value_t = 300)]
    pub lifetime_secs: i64,

    /// Also sign the Response envelope.
    #[arg(long)]
    pub sign_response: bool,

    /// Print XML instead of base64.
    #[arg(long)]
    pub xml: bool,
}
