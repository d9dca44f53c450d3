//! XSD Wildcard declarations
//!
//! This module implements wildcards for XSD element and attribute content:
//! - xs:any - allows any element from specified namespaces
//! - xs:anyAttribute - allows any attribute from specified namespaces
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::particles::Occurs;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// The empty string stands for "no namespace" (`##local`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces
    Enumeration(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Create from a `namespace` attribute value
    pub fn from_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, ParseError> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.map(String::from),
            }),
            value => {
                let mut namespaces = BTreeSet::new();
                for ns in value.split_whitespace() {
                    match ns {
                        "##local" => {
                            namespaces.insert(String::new());
                        }
                        "##targetNamespace" => {
                            namespaces.insert(target_namespace.unwrap_or_default().to_string());
                        }
                        s if s.starts_with("##") => {
                            return Err(ParseError::new(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            )));
                        }
                        uri => {
                            namespaces.insert(uri.to_string());
                        }
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Check if a namespace (None = no namespace) is allowed
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        let namespace = namespace.unwrap_or("");
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => {
                !namespace.is_empty() && Some(namespace) != target_namespace.as_deref()
            }
            Self::Enumeration(set) => set.contains(namespace),
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "##any"),
            Self::Other { target_namespace } => {
                write!(f, "##other:\"{}\"", target_namespace.as_deref().unwrap_or(""))
            }
            Self::Enumeration(set) => {
                let items: Vec<String> = set.iter().map(|ns| format!("\"{}\"", ns)).collect();
                write!(f, "{}", items.join(","))
            }
        }
    }
}

/// An element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XsdWildcard {
    /// Allowed namespaces
    #[serde(default)]
    pub namespace: NamespaceConstraint,
    /// Validation strength for matched items
    #[serde(default)]
    pub process_contents: ProcessContents,
    /// Occurrence bounds (ignored for attribute wildcards)
    #[serde(default)]
    pub occurs: Occurs,
}

impl XsdWildcard {
    /// Create a wildcard
    pub fn new(namespace: NamespaceConstraint, process_contents: ProcessContents) -> Self {
        Self {
            namespace,
            process_contents,
            occurs: Occurs::once(),
        }
    }

    /// `##any` with the given process contents
    pub fn any(process_contents: ProcessContents) -> Self {
        Self::new(NamespaceConstraint::Any, process_contents)
    }

    /// Set the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Check if a namespace is allowed
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        self.namespace.allows(namespace)
    }
}

impl fmt::Display for XsdWildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WC[{}]", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_contents() {
        assert_eq!(ProcessContents::from_str("lax"), Some(ProcessContents::Lax));
        assert_eq!(ProcessContents::from_str("loose"), None);
        assert_eq!(ProcessContents::default(), ProcessContents::Strict);
        assert_eq!(ProcessContents::Skip.to_string(), "skip");
    }

    #[test]
    fn test_namespace_any() {
        let nc = NamespaceConstraint::from_namespace_attr("##any", None).unwrap();
        assert!(nc.allows(None));
        assert!(nc.allows(Some("urn:x")));
    }

    #[test]
    fn test_namespace_other() {
        let nc = NamespaceConstraint::from_namespace_attr("##other", Some("urn:tns")).unwrap();
        assert!(nc.allows(Some("urn:x")));
        assert!(!nc.allows(Some("urn:tns")));
        assert!(!nc.allows(None));
    }

    #[test]
    fn test_namespace_enumeration() {
        let nc = NamespaceConstraint::from_namespace_attr("##local ##targetNamespace urn:a", Some("urn:t"))
            .unwrap();
        assert!(nc.allows(None));
        assert!(nc.allows(Some("urn:t")));
        assert!(nc.allows(Some("urn:a")));
        assert!(!nc.allows(Some("urn:b")));
        assert!(NamespaceConstraint::from_namespace_attr("##bogus", None).is_err());
    }

    #[test]
    fn test_wildcard_display() {
        let wc = XsdWildcard::any(ProcessContents::Lax);
        assert_eq!(wc.to_string(), "WC[##any]");
        let other = XsdWildcard::new(
            NamespaceConstraint::Other { target_namespace: Some("urn:t".into()) },
            ProcessContents::Skip,
        );
        assert_eq!(other.to_string(), "WC[##other:\"urn:t\"]");
    }
}
