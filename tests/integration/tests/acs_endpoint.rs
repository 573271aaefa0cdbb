//! Assertion consumer service integration tests.
//!
//! Every rejected Response must yield 401 with the generic message and
//! must not open a session.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use sp_saml::mock_idp::{fixtures, MockIdp, ResponseTemplate};
use sp_saml::signature::XmlSigner;
use sp_saml::GENERIC_FAILURE_MESSAGE;

use crate::common::{TestEnv, TestResponse};

fn assert_rejected(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", response.body);
    assert!(response.body.contains(GENERIC_FAILURE_MESSAGE));
    assert!(response.set_cookie.is_none());
}

/// Tests that an assertion without a signature is refused.
#[tokio::test]
async fn test_unsigned_assertion_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let saml_response =
        env.mint(&ResponseTemplate::new("user1@example.com").sign_assertion(false))?;
    assert_rejected(&env.post_acs(&saml_response).await?);

    Ok(())
}

/// Tests that only the signed Response wrapper is not enough.
#[tokio::test]
async fn test_response_signature_alone_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let saml_response = env.mint(
        &ResponseTemplate::new("user1@example.com")
            .sign_assertion(false)
            .sign_response(true),
    )?;
    assert_rejected(&env.post_acs(&saml_response).await?);

    Ok(())
}

/// Tests that a Response signed by a key other than the configured one is refused.
#[tokio::test]
async fn test_untrusted_signer_rejected() -> anyhow::Result<()> {
    let env = TestEnv::with_certificate(fixtures::UNTRUSTED_CERT_PEM).await?;

    let saml_response = env.mint(&ResponseTemplate::new("user1@example.com"))?;
    assert_rejected(&env.post_acs(&saml_response).await?);

    Ok(())
}

/// Tests that the certificate carried in KeyInfo is not what gets trusted.
#[tokio::test]
async fn test_key_info_certificate_ignored() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let signer = XmlSigner::from_pem(fixtures::IDP_KEY_PEM, fixtures::UNTRUSTED_CERT_PEM)?;
    let idp = MockIdp::new(fixtures::IDP_ISSUER, signer);
    let saml_response = idp.to_base64(&ResponseTemplate::new("user1@example.com"))?;
    let response = env.post_acs(&saml_response).await?;
    assert!(response.status.is_redirection(), "{}", response.body);

    Ok(())
}

/// Tests that an expired assertion is refused.
#[tokio::test]
async fn test_expired_assertion_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let issued = Utc::now() - Duration::hours(1);
    let saml_response = env.mint(
        &ResponseTemplate::new("user1@example.com")
            .issued_at(issued)
            .valid_between(issued, issued + Duration::minutes(5)),
    )?;
    assert_rejected(&env.post_acs(&saml_response).await?);

    Ok(())
}

/// Tests that a non-success status is refused.
#[tokio::test]
async fn test_requester_status_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let saml_response = env.mint(
        &ResponseTemplate::new("user1@example.com")
            .status("urn:oasis:names:tc:SAML:2.0:status:Requester"),
    )?;
    assert_rejected(&env.post_acs(&saml_response).await?);

    Ok(())
}

/// Tests that a subject from an unregistered domain is refused.
#[tokio::test]
async fn test_unregistered_subject_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let saml_response = env.mint(&ResponseTemplate::new("mallory@unknown.org"))?;
    let response = env.post_acs(&saml_response).await?;
    assert_rejected(&response);
    assert!(env.provider.users().get("mallory@unknown.org").is_none());

    Ok(())
}

/// Tests that garbage in the form field is refused without a panic.
#[tokio::test]
async fn test_garbage_payload_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    assert_rejected(&env.post_acs("not base64 at all!").await?);
    assert_rejected(&env.post_acs("").await?);

    Ok(())
}
