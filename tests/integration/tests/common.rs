//! Common test utilities and fixtures.

pub use sp_integration_tests::{TestEnv, TestResponse, IDP_SSO_URL};
