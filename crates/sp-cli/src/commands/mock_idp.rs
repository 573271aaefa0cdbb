//! Mock IdP response minting command.

use chrono::{Duration, Utc};
use sp_saml::mock_idp::{MockIdp, ResponseTemplate};
use sp_saml::signature::XmlSigner;

use crate::cli::MockIdpArgs;
use crate::commands::read_file;

/// Runs `sp mock-idp`.
pub fn run_mock_idp(args: MockIdpArgs) -> crate::CliResult<()> {
    let key = read_file(&args.key)?;
    let cert = read_file(&args.cert)?;
    let idp = MockIdp::new(args.issuer.clone(), XmlSigner::from_pem(&key, &cert)?);

    let template = template(&args)?;
    let out = if args.xml {
        idp.to_xml(&template)?
    } else {
        idp.to_base64(&template)?
    };
    println!("{out}");
    Ok(())
}

fn template(args: &MockIdpArgs) -> crate::CliResult<ResponseTemplate> {
    if args.lifetime_secs <= 0 {
        return Err(crate::CliError::InvalidArgument(
            "--lifetime-secs must be positive".to_string(),
        ));
    }

    let now = Utc::now();
    let mut template = ResponseTemplate::new(args.subject.clone())
        .issued_at(now)
        .valid_between(now, now + Duration::seconds(args.lifetime_secs))
        .sign_response(args.sign_response);
    if let Some(destination) = &args.destination {
        template = template.destination(destination.clone());
    }
    if let Some(request_id) = &args.in_response_to {
        template = template.in_response_to(request_id.clone());
    }

    for (name, values) in group_attributes(&args.attributes)? {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        template = template.attribute(&name, &values);
    }
    Ok(template)
}

/// Groups repeated `Name=Value` arguments, keeping first-seen name order.
fn group_attributes(pairs: &[String]) -> crate::CliResult<Vec<(String, Vec<String>)>> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for pair in pairs {
        let (name, value) = pair.split_once('=').ok_or_else(|| {
            crate::CliError::InvalidArgument(format!("attribute '{pair}' is not NAME=VALUE"))
        })?;
        match grouped.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value.to_string()),
            None => grouped.push((name.to_string(), vec![value.to_string()])),
        }
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_repeated_names() {
        let grouped = group_attributes(&[
            "groups=a".to_string(),
            "FirstName=Jane".to_string(),
            "groups=b".to_string(),
        ])
        .unwrap();
        assert_eq!(
            grouped,
            vec![
                ("groups".to_string(), vec!["a".to_string(), "b".to_string()]),
                ("FirstName".to_string(), vec!["Jane".to_string()]),
            ]
        );
    }

    #[test]
    fn rejects_malformed_attribute() {
        assert!(group_attributes(&["novalue".to_string()]).is_err());
    }
}
