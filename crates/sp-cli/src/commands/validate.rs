//! Offline response validation command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sp_saml::{ResponseValidator, SignatureVerifier, ValidatedIdentity};
use tabled::Tabled;

use crate::cli::ValidateArgs;
use crate::commands::read_file;
use crate::config::OutputFormat;
use crate::output::{output, success};
use crate::CliConfig;

/// One attribute in the validation report.
#[derive(Debug, Tabled, Serialize)]
pub struct AttributeRow {
    /// Attribute name.
    pub name: String,
    /// Values joined with `, `.
    pub values: String,
}

/// Runs `sp validate`.
pub fn run_validate(
    args: ValidateArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let raw = read_file(&args.response_file)?;
    let cert = read_file(&args.cert)?;
    let now = match args.at.as_deref() {
        Some(at) => parse_instant(at)?,
        None => Utc::now(),
    };
    let skew = args
        .clock_skew
        .or(config.clock_skew_secs)
        .unwrap_or(sp_saml::DEFAULT_CLOCK_SKEW_SECS);
    tracing::debug!(at = %now, skew_secs = skew, "validating response offline");

    let identity = validate(&raw, &cert, now, skew, args.allow_sha1)?;

    success(&format!(
        "Response is valid for {}",
        identity.subject_name_id()
    ));
    output(&attribute_rows(&identity), format)
}

fn validate(
    raw: &str,
    cert: &str,
    now: DateTime<Utc>,
    skew_secs: i64,
    allow_sha1: bool,
) -> crate::CliResult<ValidatedIdentity> {
    let skew = sp_saml::clock_skew_from_secs(skew_secs)
        .map_err(|e| crate::CliError::InvalidArgument(format!("clock skew: {e}")))?;
    let verifier = SignatureVerifier::from_pem(cert)?.allow_sha1(allow_sha1);
    let validated = ResponseValidator::new()
        .with_clock_skew(skew)
        .validate_at(raw.trim(), now)?;
    Ok(validated.verify(&verifier)?)
}

fn parse_instant(value: &str) -> crate::CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::CliError::InvalidArgument(format!("--at is not RFC 3339: {e}")))
}

fn attribute_rows(identity: &ValidatedIdentity) -> Vec<AttributeRow> {
    let mut rows: Vec<AttributeRow> = identity
        .attributes()
        .iter()
        .map(|(name, values)| AttributeRow {
            name: name.to_string(),
            values: values.join(", "),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_saml::mock_idp::{fixtures, ResponseTemplate};

    #[test]
    fn validates_mock_response() {
        let now = Utc::now();
        let raw = fixtures::idp()
            .unwrap()
            .to_base64(
                &ResponseTemplate::new("user1@example.com")
                    .issued_at(now)
                    .attribute("LastName", &["Doe"])
                    .attribute("FirstName", &["Jane"]),
            )
            .unwrap();
        let identity = validate(&raw, fixtures::IDP_CERT_PEM, now, 300, false).unwrap();
        let rows = attribute_rows(&identity);
        assert_eq!(rows[0].name, "FirstName");
        assert_eq!(rows[1].values, "Doe");
    }

    #[test]
    fn wrong_certificate_fails_in_signature_stage() {
        let now = Utc::now();
        let raw = fixtures::idp()
            .unwrap()
            .to_base64(&ResponseTemplate::new("user1@example.com").issued_at(now))
            .unwrap();
        let err = validate(&raw, fixtures::UNTRUSTED_CERT_PEM, now, 300, false).unwrap_err();
        assert!(err.to_string().starts_with("signature failed"));
    }

    #[test]
    fn out_of_range_skew_is_an_argument_error() {
        let now = Utc::now();
        let raw = fixtures::idp()
            .unwrap()
            .to_base64(&ResponseTemplate::new("user1@example.com").issued_at(now))
            .unwrap();
        for skew in [-1, 10_000_000_000_000] {
            let err = validate(&raw, fixtures::IDP_CERT_PEM, now, skew, false).unwrap_err();
            assert!(matches!(err, crate::CliError::InvalidArgument(_)));
        }
    }

    #[test]
    fn rejects_bad_instant() {
        assert!(parse_instant("yesterday").is_err());
        assert!(parse_instant("2024-05-01T10:00:00Z").is_ok());
    }
}
