//! Redirect-binding request decoding command.

use sp_saml::bindings::HttpRedirectBinding;

/// Runs `sp decode-request`.
pub fn run_decode_request(value: &str) -> crate::CliResult<()> {
    let xml = decode(value)?;
    println!("{xml}");
    Ok(())
}

/// Accepts a redirect URL, a URL-encoded value, or a bare value.
fn decode(value: &str) -> crate::CliResult<String> {
    let value = value.trim();
    let xml = if value.contains("SAMLRequest=") && value.contains("://") {
        HttpRedirectBinding::decode_url(value)?
    } else {
        let bare = value.strip_prefix("SAMLRequest=").unwrap_or(value);
        HttpRedirectBinding::decode_message(bare)?
    };
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_saml::RequestBuilder;

    #[test]
    fn decodes_all_forms() {
        let (request, encoded) = RequestBuilder::default().build("https://sp.test/acs").unwrap();
        let expected = request.to_xml().unwrap();

        assert_eq!(decode(&encoded).unwrap(), expected);
        assert_eq!(decode(&urlencoding::encode(&encoded)).unwrap(), expected);

        let uri = RequestBuilder::build_redirect_uri("https://idp.test/sso", &encoded).unwrap();
        assert_eq!(decode(uri.as_str()).unwrap(), expected);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode("!!!").unwrap_err();
        assert!(err.to_string().starts_with("decode failed"));
    }
}
