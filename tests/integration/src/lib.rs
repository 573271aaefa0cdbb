//! Shared harness for the service provider end-to-end tests.
//!
//! A [`TestEnv`] writes an IdP configuration directory for `example.com`
//! trusting the mock IdP certificate and drives the real router in-process.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use sp_saml::mock_idp::{fixtures, MockIdp, ResponseTemplate};
use sp_saml::{DirectoryResolver, ServiceProvider};
use sp_server::{Server, ServerConfig};
use tempfile::TempDir;
use tower::ServiceExt;

/// SSO endpoint the test IdP advertises.
pub const IDP_SSO_URL: &str = "https://idp.example.com/sso";

/// Test environment around an in-process router.
pub struct TestEnv {
    _idp_dir: TempDir,
    /// Service provider behind the router.
    pub provider: Arc<ServiceProvider>,
    /// Mock IdP signing with the trusted key.
    pub idp: MockIdp,
    router: Router,
}

/// A response with its body collected.
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// `Location` header, if any.
    pub location: Option<String>,
    /// `Set-Cookie` header, if any.
    pub set_cookie: Option<String>,
    /// Body as text.
    pub body: String,
}

impl TestEnv {
    /// Creates an environment with the two seeded users.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_certificate(fixtures::IDP_CERT_PEM).await
    }

    /// Creates an environment whose `example.com` IdP is trusted through
    /// `certificate_pem`.
    pub async fn with_certificate(certificate_pem: &str) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("sp_saml=debug,sp_server=debug")
            .with_test_writer()
            .try_init();

        let idp_dir = tempfile::tempdir()?;
        std::fs::write(
            idp_dir.path().join("example.com.toml"),
            format!(
                "samlEndpoint = \"{IDP_SSO_URL}\"\nx509Certificate = '''\n{certificate_pem}'''\n"
            ),
        )?;

        let config = ServerConfig {
            idp_config_dir: idp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let provider = Arc::new(ServiceProvider::new(
            config.sp_settings(),
            Arc::new(DirectoryResolver::new(idp_dir.path())),
            Arc::new(fixtures::seeded_directory()),
        ));
        let router = Server::with_provider(config, provider.clone()).router();

        Ok(Self {
            _idp_dir: idp_dir,
            provider,
            idp: fixtures::idp()?,
            router,
        })
    }

    /// Mints a base64 Response from `template`.
    pub fn mint(&self, template: &ResponseTemplate) -> anyhow::Result<String> {
        Ok(self.idp.to_base64(template)?)
    }

    /// Sends `GET path`, optionally with a cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> anyhow::Result<TestResponse> {
        let mut request = Request::get(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty())?).await
    }

    /// Posts `saml_response` to the ACS as a form.
    pub async fn post_acs(&self, saml_response: &str) -> anyhow::Result<TestResponse> {
        let body = format!("SAMLResponse={}", urlencoding::encode(saml_response));
        let request = Request::post("/acs")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response: Response<Body> = self.router.clone().oneshot(request).await?;
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = response.status();
        let location = header_value(header::LOCATION);
        let set_cookie = header_value(header::SET_COOKIE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;

        Ok(TestResponse {
            status,
            location,
            set_cookie,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl TestResponse {
    /// The `name=value` part of the `Set-Cookie` header.
    pub fn cookie(&self) -> Option<&str> {
        self.set_cookie
            .as_deref()
            .and_then(|c| c.split(';').next())
    }
}
