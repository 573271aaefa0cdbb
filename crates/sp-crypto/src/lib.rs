//! # sp-crypto
//!
//! Cryptographic primitives for the SAML service provider using aws-lc-rs.
//!
//! ## Scope
//!
//! - Message digests used by XML-DSig references
//! - RSA PKCS#1 v1.5 and ECDSA signature verification
//! - RSA signing for the mock identity provider
//! - Secure random identifiers for sessions and requests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod random;
pub mod signature;

pub use algorithm::{DigestAlgorithm, SignatureAlgorithm};
pub use hash::{digest, sha256, sha384, sha512};
pub use random::{random_alphanumeric, random_session_id};
pub use signature::{rsa_sign, verify_signature, EcCurve, SignatureError};
