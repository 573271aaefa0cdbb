//! End-to-End Integration Tests
//!
//! These tests drive the service provider router in-process against a
//! mock IdP whose certificate is configured for `example.com`.

mod common;
mod acs_endpoint;
mod login_flow;
