//! IdP resolution command.

use std::path::PathBuf;

use sp_saml::{email_domain, Certificate, DirectoryResolver, IdentityConfigResolver};

use crate::config::OutputFormat;
use crate::output::{output_fields, warning};
use crate::CliConfig;

/// Runs `sp resolve`.
pub fn run_resolve(
    email: &str,
    config_dir: Option<PathBuf>,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let dir = config.effective_config_dir(config_dir)?;
    let resolver = DirectoryResolver::new(dir);

    let Some(settings) = resolver.resolve(email)? else {
        return Err(sp_saml::SamlError::UserNotEntitled(email.to_string()).into());
    };

    let domain = email_domain(email).unwrap_or_default();
    let mut fields = vec![
        ("domain", domain.clone()),
        ("file", resolver.path_for(&domain).display().to_string()),
        ("saml_endpoint", settings.saml_endpoint.clone()),
    ];

    match Certificate::from_pem(&settings.certificate_pem) {
        Ok(cert) => {
            fields.push(("certificate_subject", cert.subject().to_string()));
            fields.push(("certificate_sha256", cert.fingerprint()));
            if let Some(not_after) = cert.not_after() {
                if not_after < chrono::Utc::now() {
                    warning(&format!("certificate expired at {not_after}"));
                }
                fields.push(("certificate_not_after", not_after.to_rfc3339()));
            }
        }
        Err(e) => warning(&e.to_string()),
    }

    output_fields(&fields, format)
}
