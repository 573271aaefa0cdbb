//! Owned XML element tree with resolved namespaces.
//!
//! Each element keeps the namespace declarations it makes and the full set
//! of namespaces in scope, so any subtree can be canonicalized on its own.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};
use crate::types::XML_NS;

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A child element.
    Element(Element),
    /// Character data with entities resolved.
    Text(String),
    /// A comment body.
    Comment(String),
}

/// An attribute that is not a namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Prefix as written, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Normalized, unescaped value.
    pub value: String,
}

impl XmlAttribute {
    /// Returns the qualified name as written.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Namespace declarations on this element, `""` being the default namespace.
    pub declarations: Vec<(String, String)>,
    /// All namespaces in scope on this element, keyed by prefix.
    pub scope: BTreeMap<String, String>,
    /// Attributes other than namespace declarations.
    pub attributes: Vec<XmlAttribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Returns the qualified name as written.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterates over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterates over child elements with the given name.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(namespace, name))
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, name))
    }

    /// Returns the concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }

    /// Visits this element and every descendant element in document order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Element)) {
        visit(self);
        for child in self.elements() {
            child.walk(visit);
        }
    }

    /// Finds the element whose `ID` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        self.elements().find_map(|e| e.find_by_id(id))
    }

    /// Mutable variant of [`Element::find_by_id`].
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) => e.find_by_id_mut(id),
            _ => None,
        })
    }

    /// Serializes the element and its subtree.
    ///
    /// The output reparses to an identical tree.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        let name = self.qualified_name();
        out.push('<');
        out.push_str(&name);
        for (prefix, uri) in &self.declarations {
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
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.qualified_name());
            out.push_str("=\"");
            out.push_str(&escape_attribute(&attr.value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(e) => e.write_xml(out),
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::Comment(c) => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// The document element.
    pub root: Element,
}

impl XmlDocument {
    /// Parses a document from a string.
    ///
    /// Line endings are normalized to `\n` first. DOCTYPE declarations are
    /// rejected; processing instructions and the XML declaration are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed input.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let normalized = xml.replace("\r\n", "\n").replace('\r', "\n");
        let mut reader = Reader::from_str(&normalized);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                SamlError::XmlParse(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(e) => {
                    let element = open_element(&e, stack.last().map(|p| &p.scope))?;
                    stack.push(element);
                }
                Event::Empty(e) => {
                    let element = open_element(&e, stack.last().map(|p| &p.scope))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SamlError::XmlParse("unexpected end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    let raw = utf8(&t)?;
                    let text = quick_xml::escape::unescape(raw)
                        .map_err(|e| SamlError::XmlParse(format!("invalid text: {e}")))?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(c) => {
                    let raw = utf8(&c)?;
                    push_text(&mut stack, raw)?;
                }
                Event::Comment(c) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Comment(utf8(&c)?.to_string()));
                    }
                }
                Event::DocType(_) => {
                    return Err(SamlError::XmlParse(
                        "DOCTYPE declarations are not allowed".to_string(),
                    ));
                }
                Event::Decl(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(SamlError::XmlParse(format!(
                "element <{}> is not closed",
                open.qualified_name()
            )));
        }
        let root = root.ok_or_else(|| SamlError::XmlParse("document is empty".to_string()))?;
        Ok(Self { root })
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::XmlParse(format!("invalid UTF-8: {e}")))
}

fn split_name(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn open_element(
    start: &BytesStart<'_>,
    parent_scope: Option<&BTreeMap<String, String>>,
) -> SamlResult<Element> {
    let qname = utf8(start.name().as_ref())?.to_string();
    let mut scope = parent_scope.cloned().unwrap_or_default();
    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| SamlError::XmlParse(format!("invalid attribute: {e}")))?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let raw = utf8(&attr.value)?.replace(['\t', '\n'], " ");
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|e| SamlError::XmlParse(format!("invalid attribute value: {e}")))?
            .into_owned();

        if key == "xmlns" {
            declarations.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            if value.is_empty() {
                return Err(SamlError::XmlParse(format!(
                    "prefix '{prefix}' cannot be undeclared"
                )));
            }
            declarations.push((prefix.to_string(), value));
        } else {
            raw_attributes.push((key, value));
        }
    }

    for (prefix, uri) in &declarations {
        if prefix.is_empty() && uri.is_empty() {
            scope.remove("");
        } else {
            scope.insert(prefix.clone(), uri.clone());
        }
    }

    let (prefix, name) = split_name(&qname);
    let namespace = resolve(&scope, prefix.unwrap_or("")).map(str::to_string);
    if prefix.is_some() && namespace.is_none() {
        return Err(SamlError::XmlParse(format!("undeclared prefix in <{qname}>")));
    }

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (attr_prefix, attr_name) = split_name(&key);
        let attr_namespace = match attr_prefix {
            Some(p) => Some(
                resolve(&scope, p)
                    .ok_or_else(|| SamlError::XmlParse(format!("undeclared prefix in '{key}'")))?
                    .to_string(),
            ),
            None => None,
        };
        attributes.push(XmlAttribute {
            prefix: attr_prefix.map(str::to_string),
            name: attr_name.to_string(),
            namespace: attr_namespace,
            value,
        });
    }

    Ok(Element {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
        namespace,
        declarations,
        scope,
        attributes,
        children: Vec::new(),
    })
}

fn resolve<'a>(scope: &'a BTreeMap<String, String>, prefix: &str) -> Option<&'a str> {
    if prefix == "xml" {
        return Some(XML_NS);
    }
    scope.get(prefix).map(String::as_str)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(SamlError::XmlParse("multiple root elements".to_string()))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn push_text(stack: &mut [Element], text: &str) -> SamlResult<()> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(SamlError::XmlParse("text outside the document element".to_string()));
    };
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else if !text.is_empty() {
        parent.children.push(Node::Text(text.to_string()));
    }
    Ok(())
}

/// Escapes character data.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes an attribute value for a double-quoted attribute.
pub(crate) fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
