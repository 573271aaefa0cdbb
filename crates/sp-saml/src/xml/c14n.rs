//! XML canonicalization.
//!
//! Implements Canonical XML 1.0 and Exclusive XML Canonicalization 1.0 over
//! an element subtree, optionally leaving out one descendant element (the
//! enveloped-signature transform).

use std::collections::{BTreeMap, BTreeSet};

use super::tree::{escape_attribute, escape_text, Element, Node, XmlAttribute};
use crate::types::canonicalization_algorithms;

/// Canonicalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationMethod {
    /// Exclusive C14N without comments.
    #[default]
    Exclusive,
    /// Exclusive C14N with comments.
    ExclusiveWithComments,
    /// Inclusive C14N 1.0 without comments.
    Inclusive,
    /// Inclusive C14N 1.0 with comments.
    InclusiveWithComments,
}

impl CanonicalizationMethod {
    /// Returns the URI for this method.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveWithComments => canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS,
            Self::Inclusive => canonicalization_algorithms::C14N,
            Self::InclusiveWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Parses a method from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::Exclusive),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::Inclusive),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            _ => None,
        }
    }

    /// Returns true for the exclusive variants.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    /// Returns true for the variants that keep comments.
    #[must_use]
    pub const fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveWithComments | Self::InclusiveWithComments)
    }
}

/// Canonicalizes `element` and its subtree.
///
/// `inclusive_prefixes` is the exclusive-mode `PrefixList` (`#default`
/// names the default namespace); it is ignored in inclusive mode.
/// `exclude`, when given, must point into the subtree and is omitted from
/// the output together with its descendants.
#[must_use]
pub fn canonicalize(
    element: &Element,
    method: CanonicalizationMethod,
    inclusive_prefixes: &[String],
    exclude: Option<&Element>,
) -> String {
    let prefixes: BTreeSet<String> = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let canonicalizer = Canonicalizer {
        method,
        inclusive_prefixes: prefixes,
        exclude,
    };
    let mut out = String::new();
    canonicalizer.write_element(element, &BTreeMap::new(), &mut out);
    out
}

struct Canonicalizer<'a> {
    method: CanonicalizationMethod,
    inclusive_prefixes: BTreeSet<String>,
    exclude: Option<&'a Element>,
}

impl Canonicalizer<'_> {
    fn write_element(
        &self,
        element: &Element,
        rendered: &BTreeMap<String, String>,
        out: &mut String,
    ) {
        if self.exclude.is_some_and(|ex| std::ptr::eq(ex, element)) {
            return;
        }

        let namespaces = if self.method.is_exclusive() {
            self.exclusive_namespaces(element, rendered)
        } else {
            inclusive_namespaces(element, rendered)
        };

        let mut in_output = rendered.clone();
        for (prefix, uri) in &namespaces {
            in_output.insert(prefix.clone(), uri.clone());
        }

        let name = element.qualified_name();
        out.push('<');
        out.push_str(&name);
        for (prefix, uri) in &namespaces {
            if prefix.is_empty() {
                out.push_str(" xmlns=\"");
            } else {
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
            }
            out.push_str(&escape_attribute(uri));
            out.push('"');
        }

        let mut attributes: Vec<&XmlAttribute> = element.attributes.iter().collect();
        attributes.sort_by(|a, b| {
            (a.namespace.as_deref().unwrap_or(""), a.name.as_str())
                .cmp(&(b.namespace.as_deref().unwrap_or(""), b.name.as_str()))
        });
        for attr in attributes {
            out.push(' ');
            out.push_str(&attr.qualified_name());
            out.push_str("=\"");
            out.push_str(&escape_attribute(&attr.value));
            out.push('"');
        }
        out.push('>');

        for node in &element.children {
            match node {
                Node::Element(child) => self.write_element(child, &in_output, out),
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Comment(comment) if self.method.with_comments() => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                Node::Comment(_) => {}
            }
        }

        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }

    /// Namespaces visibly utilized by the element plus the inclusive prefix
    /// list, minus those an output ancestor already rendered.
    fn exclusive_namespaces(
        &self,
        element: &Element,
        rendered: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(element.prefix.as_deref().unwrap_or(""));
        for attr in &element.attributes {
            if let Some(prefix) = attr.prefix.as_deref() {
                utilized.insert(prefix);
            }
        }

        let mut out = BTreeMap::new();
        for prefix in utilized {
            if prefix == "xml" {
                continue;
            }
            let uri = element.scope.get(prefix).map_or("", String::as_str);
            if needs_declaration(rendered, prefix, uri) {
                out.insert(prefix.to_string(), uri.to_string());
            }
        }
        for prefix in &self.inclusive_prefixes {
            if let Some(uri) = element.scope.get(prefix) {
                if needs_declaration(rendered, prefix, uri) {
                    out.insert(prefix.clone(), uri.clone());
                }
            }
        }
        out
    }
}

/// Every namespace in scope that differs from what an output ancestor
/// rendered, plus an empty default undeclaration where needed.
fn inclusive_namespaces(
    element: &Element,
    rendered: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = element
        .scope
        .iter()
        .filter(|(prefix, uri)| rendered.get(*prefix) != Some(*uri))
        .map(|(p, u)| (p.clone(), u.clone()))
        .collect();
    if !element.scope.contains_key("") && needs_declaration(rendered, "", "") {
        out.insert(String::new(), String::new());
    }
    out
}

fn needs_declaration(rendered: &BTreeMap<String, String>, prefix: &str, uri: &str) -> bool {
    match rendered.get(prefix) {
        Some(current) => current != uri,
        None => !uri.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn c14n(xml: &str, method: CanonicalizationMethod) -> String {
        let doc = XmlDocument::parse(xml).unwrap();
        canonicalize(&doc.root, method, &[], None)
    }

    #[test]
    fn expands_empty_elements_and_sorts_attributes() {
        let out = c14n(r#"<a z="1" b='2'><c/></a>"#, CanonicalizationMethod::Exclusive);
        assert_eq!(out, r#"<a b="2" z="1"><c></c></a>"#);
    }

    #[test]
    fn namespaced_attributes_sort_after_unqualified() {
        let out = c14n(
            r#"<a xmlns:x="urn:x" x:b="1" c="2"/>"#,
            CanonicalizationMethod::Inclusive,
        );
        assert_eq!(out, r#"<a xmlns:x="urn:x" c="2" x:b="1"></a>"#);
    }

    #[test]
    fn exclusive_drops_unused_namespaces() {
        let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:child>t</a:child></r>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let child = doc.root.elements().next().unwrap();

        let exclusive = canonicalize(child, CanonicalizationMethod::Exclusive, &[], None);
        assert_eq!(exclusive, r#"<a:child xmlns:a="urn:a">t</a:child>"#);

        let inclusive = canonicalize(child, CanonicalizationMethod::Inclusive, &[], None);
        assert_eq!(
            inclusive,
            r#"<a:child xmlns:a="urn:a" xmlns:b="urn:b">t</a:child>"#
        );
    }

    #[test]
    fn inclusive_prefix_list_is_honored() {
        let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:child>t</a:child></r>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let child = doc.root.elements().next().unwrap();
        let out = canonicalize(
            child,
            CanonicalizationMethod::Exclusive,
            &["b".to_string()],
            None,
        );
        assert_eq!(out, r#"<a:child xmlns:a="urn:a" xmlns:b="urn:b">t</a:child>"#);
    }

    #[test]
    fn namespace_is_not_redeclared_in_descendants() {
        let out = c14n(
            r#"<a:r xmlns:a="urn:a"><a:c xmlns:a="urn:a"/></a:r>"#,
            CanonicalizationMethod::Exclusive,
        );
        assert_eq!(out, r#"<a:r xmlns:a="urn:a"><a:c></a:c></a:r>"#);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let out = c14n(
            r#"<a v="x&amp;&quot;&#10;">1 &lt; 2 &gt; 0 &amp; "q"</a>"#,
            CanonicalizationMethod::Exclusive,
        );
        assert_eq!(out, r#"<a v="x&amp;&quot;&#xA;">1 &lt; 2 &gt; 0 &amp; "q"</a>"#);
    }

    #[test]
    fn comments_depend_on_method() {
        let xml = "<a><!--note-->x</a>";
        assert_eq!(c14n(xml, CanonicalizationMethod::Exclusive), "<a>x</a>");
        assert_eq!(
            c14n(xml, CanonicalizationMethod::ExclusiveWithComments),
            "<a><!--note-->x</a>"
        );
    }

    #[test]
    fn excluded_element_is_omitted() {
        let xml = r#"<a ID="1"><keep>k</keep><drop>d</drop> </a>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let drop = doc.root.elements().nth(1).unwrap();
        let out = canonicalize(&doc.root, CanonicalizationMethod::Exclusive, &[], Some(drop));
        assert_eq!(out, r#"<a ID="1"><keep>k</keep> </a>"#);
    }

    #[test]
    fn default_namespace_undeclared_when_needed() {
        let out = c14n(
            r#"<a xmlns="urn:x"><b xmlns=""/></a>"#,
            CanonicalizationMethod::Inclusive,
        );
        assert_eq!(out, r#"<a xmlns="urn:x"><b xmlns=""></b></a>"#);
    }

    #[test]
    fn method_uri_roundtrip() {
        for method in [
            CanonicalizationMethod::Exclusive,
            CanonicalizationMethod::ExclusiveWithComments,
            CanonicalizationMethod::Inclusive,
            CanonicalizationMethod::InclusiveWithComments,
        ] {
            assert_eq!(CanonicalizationMethod::from_uri(method.uri()), Some(method));
        }
    }
}
