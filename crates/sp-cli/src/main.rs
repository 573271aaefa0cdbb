//! # SAML SP CLI
//!
//! Command-line tools for the SAML service provider.

#![forbid(unsafe_code)]

use clap::Parser;
use sp_cli::{
    cli::{Cli, Command},
    commands::{run_decode_request, run_mock_idp, run_request, run_resolve, run_validate},
    config::CliConfig,
    output::error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error(&format!("Failed to load configuration: {}", e));
            std::process::exit(1);
        }
    };
    let format = cli.output.unwrap_or(config.output_format);

    let result = match cli.command {
        Command::Request(args) => run_request(args, &config, format),
        Command::DecodeRequest { value } => run_decode_request(&value),
        Command::Validate(args) => run_validate(args, &config, format),
        Command::Resolve { email, config_dir } => run_resolve(&email, config_dir, &config, format),
        Command::MockIdp(args) => run_mock_idp(args),
    };

    if let Err(e) = result {
        error(&e.to_string());
        std::process::exit(1);
    }
}
