//! XPath Selectors for XML Schema
//!
//! Identity constraints use a small XPath subset:
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Step     ::= '.' | NameTest | 'child::' NameTest
//! NameTest ::= QName | '*' | NCName ':*'
//! ```
//!
//! Field paths may additionally end in `@NameTest` or `attribute::NameTest`.
//! Unprefixed names in a path are in no namespace.

use crate::error::ParseError;
use crate::names::{is_valid_ncname, is_valid_qname, split_qname};
use crate::namespaces::{NamespaceContext, QName};
use std::fmt;

/// Kind of path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStepKind {
    /// Child axis (default)
    Child,
    /// Attribute axis (@)
    Attribute,
    /// Self axis (.)
    Self_,
}

/// Name test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(Option<String>),
    /// A resolved qualified name
    Name(QName),
}

impl NameTest {
    /// Check an expanded name against this test
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Namespace(ns) => ns.as_deref() == namespace,
            NameTest::Name(name) => name.matches(namespace, local_name),
        }
    }
}

/// A single step in a location path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// The kind of step
    pub kind: PathStepKind,
    /// Name test (`NameTest::Any` for self steps)
    pub test: NameTest,
}

impl PathStep {
    /// Parse a step, resolving prefixes against `namespaces`
    pub fn parse(step: &str, namespaces: &NamespaceContext) -> Result<Self, ParseError> {
        let step = step.trim();
        if step == "." {
            return Ok(Self {
                kind: PathStepKind::Self_,
                test: NameTest::Any,
            });
        }

        let (kind, rest) = if let Some(rest) = step.strip_prefix('@') {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("attribute::") {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("child::") {
            (PathStepKind::Child, rest)
        } else {
            (PathStepKind::Child, step)
        };

        Ok(Self {
            kind,
            test: parse_name_test(rest.trim(), namespaces)?,
        })
    }

    /// Check if this step matches any name (`*`)
    pub fn is_wildcard(&self) -> bool {
        self.test == NameTest::Any
    }
}

fn parse_name_test(test: &str, namespaces: &NamespaceContext) -> Result<NameTest, ParseError> {
    if test == "*" {
        return Ok(NameTest::Any);
    }
    if let Some(prefix) = test.strip_suffix(":*") {
        if !is_valid_ncname(prefix) {
            return Err(ParseError::new(format!("invalid name test '{}'", test)));
        }
        let ns = namespaces
            .get_namespace(prefix)
            .ok_or_else(|| ParseError::new(format!("unbound prefix '{}' in '{}'", prefix, test)))?;
        return Ok(NameTest::Namespace(Some(ns.to_string())));
    }
    if !is_valid_qname(test) {
        return Err(ParseError::new(format!("invalid name test '{}'", test)));
    }
    match split_qname(test) {
        (Some(prefix), local) => {
            let ns = namespaces.get_namespace(prefix).ok_or_else(|| {
                ParseError::new(format!("unbound prefix '{}' in '{}'", prefix, test))
            })?;
            Ok(NameTest::Name(QName::namespaced(ns, local)))
        }
        (None, local) => Ok(NameTest::Name(QName::local(local))),
    }
}

/// One alternative of a selector or field expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    /// Starts with `.//`
    pub descendant: bool,
    /// Steps after the optional `.//`
    pub steps: Vec<PathStep>,
}

impl LocationPath {
    /// The attribute step ending a field path, if any
    pub fn attribute_test(&self) -> Option<&NameTest> {
        match self.steps.last() {
            Some(step) if step.kind == PathStepKind::Attribute => Some(&step.test),
            _ => None,
        }
    }
}

/// A parsed selector or field expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPath {
    /// The expression text
    pub xpath: String,
    /// Union alternatives
    pub paths: Vec<LocationPath>,
}

impl IdentityPath {
    /// Parse a selector (no attribute steps)
    pub fn parse_selector(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, ParseError> {
        Self::parse(xpath, namespaces, false)
    }

    /// Parse a field (may end in an attribute step)
    pub fn parse_field(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, ParseError> {
        Self::parse(xpath, namespaces, true)
    }

    fn parse(xpath: &str, namespaces: &NamespaceContext, field: bool) -> Result<Self, ParseError> {
        let mut paths = Vec::new();
        for alternative in xpath.split('|') {
            let (descendant, steps) = split_path(alternative)
                .map_err(|e| e.with_source(xpath.to_string()))?;
            let steps = steps
                .into_iter()
                .map(|s| PathStep::parse(s, namespaces))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.with_source(xpath.to_string()))?;

            let last = steps.len().saturating_sub(1);
            for (i, step) in steps.iter().enumerate() {
                if step.kind == PathStepKind::Attribute && (!field || i != last) {
                    return Err(ParseError::new(format!(
                        "attribute step not allowed here in '{}'",
                        xpath
                    )));
                }
            }
            paths.push(LocationPath { descendant, steps });
        }
        Ok(Self {
            xpath: xpath.to_string(),
            paths,
        })
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xpath)
    }
}

/// Split one path alternative into its `.//` flag and raw steps
pub fn split_path(path: &str) -> Result<(bool, Vec<&str>), ParseError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ParseError::new("empty path expression"));
    }

    let (descendant, rest) = match path.strip_prefix(".//") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, path),
    };
    if rest.starts_with('/') || rest.contains("//") {
        return Err(ParseError::new(format!(
            "only a leading './/' may select descendants: '{}'",
            path
        )));
    }

    let steps: Vec<&str> = rest.split('/').map(str::trim).collect();
    if steps.iter().any(|s| s.is_empty()) {
        return Err(ParseError::new(format!("empty step in '{}'", path)));
    }
    Ok((descendant, steps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceContext {
        NamespaceContext::from_bindings([("p", "urn:p")])
    }

    #[test]
    fn test_split_path_simple() {
        assert_eq!(split_path("a/b/c").unwrap(), (false, vec!["a", "b", "c"]));
        assert_eq!(split_path(" .//a / b ").unwrap(), (true, vec!["a", "b"]));
        assert_eq!(split_path(".").unwrap(), (false, vec!["."]));
    }

    #[test]
    fn test_split_path_rejects() {
        assert!(split_path("").is_err());
        assert!(split_path("/a").is_err());
        assert!(split_path("a//b").is_err());
        assert!(split_path("a/").is_err());
    }

    #[test]
    fn test_path_step_parse() {
        let step = PathStep::parse("p:item", &ns()).unwrap();
        assert_eq!(step.kind, PathStepKind::Child);
        assert_eq!(step.test, NameTest::Name(QName::namespaced("urn:p", "item")));

        let step = PathStep::parse("@id", &ns()).unwrap();
        assert_eq!(step.kind, PathStepKind::Attribute);
        assert_eq!(step.test, NameTest::Name(QName::local("id")));

        let step = PathStep::parse("child::p:*", &ns()).unwrap();
        assert_eq!(step.test, NameTest::Namespace(Some("urn:p".into())));

        assert!(PathStep::parse("*", &ns()).unwrap().is_wildcard());
        assert!(PathStep::parse("q:item", &ns()).is_err());
        assert!(PathStep::parse("item[1]", &ns()).is_err());
    }

    #[test]
    fn test_parse_selector_union() {
        let path = IdentityPath::parse_selector("a/b | .//c", &ns()).unwrap();
        assert_eq!(path.paths.len(), 2);
        assert!(!path.paths[0].descendant);
        assert!(path.paths[1].descendant);
        assert_eq!(path.to_string(), "a/b | .//c");
    }

    #[test]
    fn test_attribute_steps() {
        assert!(IdentityPath::parse_selector("a/@id", &ns()).is_err());
        let field = IdentityPath::parse_field("a/@id", &ns()).unwrap();
        assert!(field.paths[0].attribute_test().is_some());
        assert!(IdentityPath::parse_field("@id/a", &ns()).is_err());
    }

    #[test]
    fn test_name_test_matching() {
        assert!(NameTest::Any.matches(Some("urn:x"), "a"));
        assert!(NameTest::Namespace(None).matches(None, "a"));
        assert!(!NameTest::Namespace(None).matches(Some("urn:x"), "a"));
        assert!(NameTest::Name(QName::local("a")).matches(None, "a"));
    }
}
