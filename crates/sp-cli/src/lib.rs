//! # sp-cli
//!
//! CLI tools for the SAML service provider.
//!
//! This crate provides command-line utilities for:
//! - Building AuthnRequests and redirect URIs
//! - Decoding redirect-binding requests
//! - Validating responses offline against an IdP certificate
//! - Resolving which IdP serves an email domain
//! - Minting signed responses from a mock IdP

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
