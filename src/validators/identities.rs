//! XSD Identity Constraints
//!
//! This module implements the identity constraint declarations:
//! - xs:unique - values must be unique within scope
//! - xs:key - like unique, but every field must be present
//! - xs:keyref - values must match a tuple of the referenced key
//!
//! Declarations keep their XPath expressions as text plus the namespace
//! bindings in scope where they were declared. The expressions are parsed
//! into [`IdentityPath`]s once, on first use.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;
use crate::namespaces::{NamespaceContext, QName};
use crate::xpath::IdentityPath;

/// Type of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityConstraintKind {
    /// xs:unique - values must be unique, but fields can be missing
    Unique,
    /// xs:key - values must be unique AND all fields must be present
    Key,
    /// xs:keyref - references a key or unique constraint
    #[serde(rename = "keyref")]
    KeyRef,
}

impl IdentityConstraintKind {
    /// Schema element name of the constraint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Key => "key",
            Self::KeyRef => "keyref",
        }
    }
}

impl fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed selector and field paths of one constraint
#[derive(Debug, Clone)]
pub struct CompiledIdentity {
    /// Selector expression
    pub selector: Arc<IdentityPath>,
    /// Field expressions in declaration order
    pub fields: Vec<Arc<IdentityPath>>,
}

/// Identity constraint declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsdIdentity {
    /// Constraint name
    pub name: QName,
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// XPath selector
    pub selector: String,
    /// XPath fields
    pub fields: Vec<String>,
    /// Referenced key or unique constraint (keyref only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refer: Option<QName>,
    /// Prefix bindings used by the XPath expressions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, String>,
    #[serde(skip)]
    compiled: OnceCell<Option<CompiledIdentity>>,
}

impl XsdIdentity {
    /// Create a new identity constraint without fields
    pub fn new(name: QName, kind: IdentityConstraintKind, selector: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            selector: selector.into(),
            fields: Vec::new(),
            refer: None,
            namespaces: BTreeMap::new(),
            compiled: OnceCell::new(),
        }
    }

    /// Create a unique constraint
    pub fn unique(name: QName, selector: impl Into<String>) -> Self {
        Self::new(name, IdentityConstraintKind::Unique, selector)
    }

    /// Create a key constraint
    pub fn key(name: QName, selector: impl Into<String>) -> Self {
        Self::new(name, IdentityConstraintKind::Key, selector)
    }

    /// Create a keyref constraint
    pub fn keyref(name: QName, selector: impl Into<String>, refer: QName) -> Self {
        let mut identity = Self::new(name, IdentityConstraintKind::KeyRef, selector);
        identity.refer = Some(refer);
        identity
    }

    /// Add a field
    pub fn with_field(mut self, xpath: impl Into<String>) -> Self {
        self.fields.push(xpath.into());
        self
    }

    /// Bind a prefix for the XPath expressions
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Check if this is a unique constraint
    pub fn is_unique(&self) -> bool {
        self.kind == IdentityConstraintKind::Unique
    }

    /// Check if this is a key constraint
    pub fn is_key(&self) -> bool {
        self.kind == IdentityConstraintKind::Key
    }

    /// Check if this is a keyref constraint
    pub fn is_keyref(&self) -> bool {
        self.kind == IdentityConstraintKind::KeyRef
    }

    /// Parse the selector and field expressions
    pub fn parse_paths(&self) -> Result<CompiledIdentity, ParseError> {
        if self.fields.is_empty() {
            return Err(ParseError::new(format!(
                "identity constraint '{}' must have at least one field",
                self.name
            )));
        }
        let namespaces = NamespaceContext::from_bindings(
            self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str())),
        );
        let location = format!("{} '{}'", self.kind, self.name);
        let selector = IdentityPath::parse_selector(&self.selector, &namespaces)
            .map_err(|e| e.with_location(location.clone()))?;
        let fields = self
            .fields
            .iter()
            .map(|f| {
                IdentityPath::parse_field(f, &namespaces)
                    .map(Arc::new)
                    .map_err(|e| e.with_location(location.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledIdentity {
            selector: Arc::new(selector),
            fields,
        })
    }

    /// Parsed paths, or None when the expressions are malformed
    ///
    /// A malformed constraint is logged once and then ignored.
    pub fn compiled(&self) -> Option<&CompiledIdentity> {
        self.compiled
            .get_or_init(|| match self.parse_paths() {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    log::warn!("ignoring identity constraint: {}", e);
                    None
                }
            })
            .as_ref()
    }
}

/// Builder for identity constraints
#[derive(Debug)]
pub struct IdentityBuilder {
    name: Option<QName>,
    kind: IdentityConstraintKind,
    selector: Option<String>,
    fields: Vec<String>,
    refer: Option<QName>,
    namespaces: BTreeMap<String, String>,
}

impl IdentityBuilder {
    fn with_kind(kind: IdentityConstraintKind) -> Self {
        Self {
            name: None,
            kind,
            selector: None,
            fields: Vec::new(),
            refer: None,
            namespaces: BTreeMap::new(),
        }
    }

    /// Create a builder for a unique constraint
    pub fn unique() -> Self {
        Self::with_kind(IdentityConstraintKind::Unique)
    }

    /// Create a builder for a key constraint
    pub fn key() -> Self {
        Self::with_kind(IdentityConstraintKind::Key)
    }

    /// Create a builder for a keyref constraint
    pub fn keyref() -> Self {
        Self::with_kind(IdentityConstraintKind::KeyRef)
    }

    /// Set the constraint name
    pub fn name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the selector
    pub fn selector(mut self, xpath: impl Into<String>) -> Self {
        self.selector = Some(xpath.into());
        self
    }

    /// Add a field
    pub fn field(mut self, xpath: impl Into<String>) -> Self {
        self.fields.push(xpath.into());
        self
    }

    /// Set the refer attribute (for keyref)
    pub fn refer(mut self, refer: QName) -> Self {
        self.refer = Some(refer);
        self
    }

    /// Bind a prefix for the XPath expressions
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Build the identity constraint, checking its expressions
    pub fn build(self) -> Result<XsdIdentity, ParseError> {
        let name = self
            .name
            .ok_or_else(|| ParseError::new("identity constraint must have a name"))?;

        let selector = self
            .selector
            .ok_or_else(|| ParseError::new("identity constraint must have a selector"))?;

        if self.kind == IdentityConstraintKind::KeyRef && self.refer.is_none() {
            return Err(ParseError::new("keyref must have a 'refer' attribute"));
        }

        let mut identity = XsdIdentity::new(name, self.kind, selector);
        identity.fields = self.fields;
        identity.refer = self.refer;
        identity.namespaces = self.namespaces;
        identity.parse_paths()?;

        Ok(identity)
    }
}
