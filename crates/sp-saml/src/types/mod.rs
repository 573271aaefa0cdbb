//! SAML 2.0 types and data structures.
//!
//! Outgoing requests, parsed responses and assertions, and the constants
//! they are built from.

mod assertion;
mod authn_request;
mod constants;
mod response;
mod schema;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use response::*;
pub use status::*;
