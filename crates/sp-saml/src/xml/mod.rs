//! XML document model.
//!
//! SAML messages are parsed into an owned element tree rather than bound to
//! serde structs, because signature verification needs the exact document
//! structure (namespace scopes, attribute order, whitespace) to reproduce
//! the canonical bytes the IdP signed.

mod c14n;
mod tree;

pub use c14n::{canonicalize, CanonicalizationMethod};
pub use tree::{Element, Node, XmlAttribute, XmlDocument};
