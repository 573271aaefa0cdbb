//! AuthnRequest construction command.

use sp_saml::{RequestBuilder, DEFAULT_SP_ISSUER};

use crate::cli::RequestArgs;
use crate::config::OutputFormat;
use crate::output::output_fields;
use crate::CliConfig;

/// Runs `sp request`.
pub fn run_request(
    args: RequestArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let acs_url = args
        .acs_url
        .or_else(|| config.acs_url.clone())
        .ok_or_else(|| {
            crate::CliError::InvalidArgument(
                "no ACS URL: pass --acs-url or set acs_url".to_string(),
            )
        })?;
    let issuer = args
        .issuer
        .or_else(|| config.issuer.clone())
        .unwrap_or_else(|| DEFAULT_SP_ISSUER.to_string());

    let (request, encoded) = RequestBuilder::new(issuer).build(&acs_url)?;

    let mut fields = vec![
        ("id", request.id.clone()),
        ("issue_instant", request.issue_instant.to_rfc3339()),
        ("issuer", request.issuer.clone()),
        ("acs_url", request.acs_url.clone()),
        ("saml_request", encoded.clone()),
    ];
    if let Some(endpoint) = args.endpoint.as_deref() {
        let uri = RequestBuilder::build_redirect_uri(endpoint, &encoded)?;
        fields.push(("redirect_uri", uri.to_string()));
    }

    output_fields(&fields, format)
}
