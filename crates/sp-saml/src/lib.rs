//! SAML 2.0 service provider core.
//!
//! This crate implements the relying-party side of SAML Web Browser SSO:
//!
//! - **Request construction** - AuthnRequests encoded for the HTTP-Redirect binding
//! - **Response validation** - an ordered pipeline over HTTP-POST responses
//! - **Signature verification** - enveloped XML-DSig against a trusted certificate
//! - **Attribute extraction** - flattening assertion attributes
//! - **IdP resolution** - per-domain identity provider settings
//!
//! # Architecture
//!
//! - [`types`] - SAML messages and constants
//! - [`xml`] - element tree and canonicalization
//! - [`bindings`] - POST and Redirect transport encodings
//! - [`request`] - [`RequestBuilder`]
//! - [`validator`] - [`ResponseValidator`]
//! - [`signature`] - [`SignatureVerifier`] and the test signer
//! - [`attributes`] - [`Attributes`]
//! - [`resolver`] - [`IdentityConfigResolver`] implementations
//! - [`service`] - the [`ServiceProvider`] login flow
//!
//! # Example
//!
//! ```rust,ignore
//! use sp_saml::{ResponseValidator, SignatureVerifier};
//!
//! let validated = ResponseValidator::new().validate(&saml_response)?;
//! let verifier = SignatureVerifier::from_pem(&idp.certificate_pem)?;
//! let identity = validated.verify(&verifier)?;
//! println!("{} logged in", identity.subject_name_id());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attributes;
pub mod bindings;
pub mod error;
#[cfg(any(test, feature = "mock-idp"))]
pub mod mock_idp;
pub mod request;
pub mod resolver;
pub mod service;
pub mod signature;
pub mod types;
pub mod users;
pub mod validator;
pub mod xml;

pub use attributes::{extract_attributes, Attributes};
pub use error::{SamlError, SamlResult, GENERIC_FAILURE_MESSAGE};
pub use request::RequestBuilder;
pub use resolver::{email_domain, DirectoryResolver, IdentityConfigResolver, IdpSettings, StaticResolver};
pub use service::{AuthenticatedUser, LoginRedirect, ServiceProvider, SpSettings};
pub use signature::{Certificate, SignatureVerifier};
pub use types::*;
pub use users::{KnownUser, UserDirectory};
pub use validator::{clock_skew_from_secs, ResponseValidator, ValidatedIdentity, ValidatedResponse};
