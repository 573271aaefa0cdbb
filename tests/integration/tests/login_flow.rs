//! Login flow integration tests.

use axum::http::StatusCode;
use sp_saml::bindings::HttpRedirectBinding;
use sp_saml::mock_idp::ResponseTemplate;
use url::Url;

use crate::common::{TestEnv, IDP_SSO_URL};

/// Tests that `/login` redirects a registered subject to their IdP.
#[tokio::test]
async fn test_login_redirects_to_idp() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/login?email=user1%40example.com", None).await?;
    assert_eq!(response.status, StatusCode::FOUND);

    let location = Url::parse(response.location.as_deref().unwrap_or_default())?;
    assert!(location.as_str().starts_with(IDP_SSO_URL));

    let encoded = location
        .query_pairs()
        .find(|(k, _)| k == "SAMLRequest")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("SAMLRequest missing from {location}"))?;
    let xml = HttpRedirectBinding::decode_message(&encoded)?;
    assert!(xml.contains("AuthnRequest"));
    assert!(xml.contains(env.provider.settings().acs_url.as_str()));
    assert!(xml.contains("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress"));

    Ok(())
}

/// Tests that an unregistered domain is refused before any redirect.
#[tokio::test]
async fn test_login_unknown_domain() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/login?email=someone%40unknown.org", None).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.location.is_none());

    Ok(())
}

/// Tests a complete login from redirect to session page.
#[tokio::test]
async fn test_full_login_flow() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let saml_response = env.mint(
        &ResponseTemplate::new("user1@example.com")
            .attribute("FirstName", &["Jane"])
            .attribute("LastName", &["Doe"]),
    )?;
    let response = env.post_acs(&saml_response).await?;
    assert!(
        response.status.is_redirection(),
        "Expected redirect, got {}: {}",
        response.status,
        response.body
    );
    assert_eq!(response.location.as_deref(), Some("/"));

    let cookie = response
        .cookie()
        .ok_or_else(|| anyhow::anyhow!("no session cookie"))?
        .to_string();
    let home = env.get("/", Some(&cookie)).await?;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Hello, Jane Doe!"), "{}", home.body);

    let users = env.get("/users", Some(&cookie)).await?;
    assert_eq!(users.status, StatusCode::OK);
    let users: serde_json::Value = serde_json::from_str(&users.body)?;
    let jane = users
        .as_array()
        .and_then(|list| list.iter().find(|u| u["email"] == "user1@example.com"))
        .ok_or_else(|| anyhow::anyhow!("user1 missing from {users}"))?;
    assert_eq!(jane["name"], "Jane Doe");

    let logout = env.get("/logout", Some(&cookie)).await?;
    assert!(logout.status.is_redirection());
    assert!(logout.set_cookie.as_deref().is_some_and(|c| c.contains("Max-Age=0")));
    let home = env.get("/", Some(&cookie)).await?;
    assert!(!home.body.contains("Hello"), "{}", home.body);
    let users = env.get("/users", Some(&cookie)).await?;
    assert_eq!(users.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

/// Tests that the user list is refused without a live session.
#[tokio::test]
async fn test_users_requires_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/users", None).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(!response.body.contains("user1@example.com"));

    let response = env.get("/users", Some("sp_session=forged")).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

/// Tests that the home page offers a login form without a session.
#[tokio::test]
async fn test_home_without_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let home = env.get("/", Some("sp_session=unknown")).await?;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains(r#"action="/login""#));

    Ok(())
}

/// Tests the health endpoint.
#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/health", None).await?;
    assert_eq!(response.status, StatusCode::OK);

    Ok(())
}
