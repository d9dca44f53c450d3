//! XML namespace handling
//!
//! Qualified names and a scoped prefix mapping. The scoped context follows the
//! element nesting of the instance document: a new scope is pushed for every
//! element start and popped at its end, so bindings declared on an element are
//! visible to its subtree only.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (xsi:type, xsi:nil, ...)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace (bound to the `xml` prefix)
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName in the XML Schema namespace
    pub fn xsd(local_name: impl Into<String>) -> Self {
        Self::namespaced(XSD_NAMESPACE, local_name)
    }

    /// Namespace as a string slice
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check namespace and local name at once
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Scoped namespace context for resolving prefixes
///
/// The empty prefix stands for the default namespace. A binding to `None`
/// undeclares the default namespace (`xmlns=""`).
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    scopes: Vec<Vec<(Prefix, Option<NamespaceUri>)>>,
}

impl NamespaceContext {
    /// Create a new namespace context with the `xml` prefix pre-bound
    pub fn new() -> Self {
        Self {
            scopes: vec![vec![("xml".to_string(), Some(XML_NAMESPACE.to_string()))]],
        }
    }

    /// Build a single-scope context from `(prefix, uri)` pairs
    pub fn from_bindings<'a>(bindings: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut ctx = Self::new();
        for (prefix, uri) in bindings {
            ctx.declare_prefix(prefix, Some(uri));
        }
        ctx
    }

    /// Open a new scope
    pub fn push_context(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope, dropping its bindings
    pub fn pop_context(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind a prefix in the innermost scope
    pub fn declare_prefix(&mut self, prefix: impl Into<String>, namespace: Option<&str>) {
        let prefix = prefix.into();
        let namespace = namespace.map(str::to_string);
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(binding) = scope.iter_mut().find(|(p, _)| *p == prefix) {
                binding.1 = namespace;
            } else {
                scope.push((prefix, namespace));
            }
        }
    }

    /// Bind a prefix (convenience for non-empty URIs)
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.declare_prefix(prefix, Some(&namespace));
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.add_prefix("", namespace);
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        for scope in self.scopes.iter().rev() {
            if let Some((_, uri)) = scope.iter().rev().find(|(p, _)| p == prefix) {
                return uri.as_deref();
            }
        }
        None
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.get_namespace("")
    }

    /// Number of open scopes (including the root scope)
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Resolve a prefixed name to a QName, using the default namespace for
    /// unprefixed names
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.get_default_namespace(), prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
        assert!(qname.matches(Some("http://example.com"), "element"));
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("xs"), Some(XSD_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_scoped_bindings() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("p", "urn:outer");
        ctx.push_context();
        ctx.add_prefix("p", "urn:inner");
        ctx.declare_prefix("", None);
        assert_eq!(ctx.get_namespace("p"), Some("urn:inner"));
        assert_eq!(ctx.get_default_namespace(), None);
        ctx.pop_context();
        assert_eq!(ctx.get_namespace("p"), Some("urn:outer"));
        // the root scope never pops
        ctx.pop_context();
        ctx.pop_context();
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname, QName::xsd("element"));
        assert!(ctx.resolve("zz:element").is_err());
        assert_eq!(ctx.resolve("plain").unwrap(), QName::local("plain"));
    }
}
