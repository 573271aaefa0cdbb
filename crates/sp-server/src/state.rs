//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use sp_saml::ServiceProvider;

use crate::config::ServerConfig;
use crate::session::SessionStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    /// The SAML login flow.
    pub provider: Arc<ServiceProvider>,

    /// Browser sessions.
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: ServerConfig, provider: Arc<ServiceProvider>) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_lifetime()));
        Self {
            config,
            provider,
            sessions,
        }
    }

    /// Returns the service provider.
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Returns the server configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }
}
