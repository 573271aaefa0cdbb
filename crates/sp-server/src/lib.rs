//! # sp-server
//!
//! Axum front end for the SAML service provider.
//!
//! ## Endpoints
//!
//! - `GET /login?email=` redirects to the subject's IdP
//! - `POST /acs` consumes the IdP's Response and opens a session
//! - `GET /logout` ends the session
//! - `GET /` shows the session user
//! - `GET /users` lists known users to a logged-in browser
//! - `GET /health` reports liveness
//!
//! ## Usage
//!
//! ```ignore
//! use sp_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! Server::new(config).run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sp_saml::{DirectoryResolver, ServiceProvider, UserDirectory};
use tokio::net::TcpListener;

/// The service provider server.
pub struct Server {
    config: ServerConfig,
    provider: Arc<ServiceProvider>,
}

impl Server {
    /// Creates a server reading IdP settings from the configured directory.
    pub fn new(config: ServerConfig) -> Self {
        let resolver = Arc::new(DirectoryResolver::new(&config.idp_config_dir));
        let provider = ServiceProvider::new(
            config.sp_settings(),
            resolver,
            Arc::new(UserDirectory::new()),
        );
        Self::with_provider(config, Arc::new(provider))
    }

    /// Creates a server around an existing service provider.
    pub fn with_provider(config: ServerConfig, provider: Arc<ServiceProvider>) -> Self {
        Self { config, provider }
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            idp_config_dir = %self.config.idp_config_dir.display(),
            acs_url = %self.config.acs_url,
            "Server listening on http://{}",
            addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the router without starting the server.
    pub fn router(&self) -> Router {
        create_router(AppState::new(self.config.clone(), Arc::clone(&self.provider)))
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
