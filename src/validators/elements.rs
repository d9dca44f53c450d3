//! XSD Element declarations
//!
//! Element declarations are read-only schema components. The validator looks
//! them up from content-model transitions or from the grammar's global
//! elements, then asks them for their type, value constraint, nillability,
//! substitution-group head and identity constraints.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cElement_Declarations

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::namespaces::QName;

use super::complex_types::{DerivationFlags, XsdComplexType};
use super::identities::XsdIdentity;
use super::simple_types::XsdSimpleType;

/// Default or fixed value of an element or attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueConstraint {
    /// Used when the instance supplies no value
    Default(String),
    /// Used when absent and enforced when present
    Fixed(String),
}

impl ValueConstraint {
    /// The lexical constraint value
    pub fn value(&self) -> &str {
        match self {
            Self::Default(v) | Self::Fixed(v) => v,
        }
    }

    /// Check if this is a fixed constraint
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

/// How a declaration refers to its type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeReference {
    /// A global type, looked up through the grammar resolver
    Named(QName),
    /// An anonymous simple type
    Simple(Arc<XsdSimpleType>),
    /// An anonymous complex type
    Complex(Arc<XsdComplexType>),
}

impl TypeReference {
    /// Name of a named reference
    pub fn name(&self) -> Option<&QName> {
        match self {
            Self::Named(name) => Some(name),
            Self::Simple(t) => t.name.as_ref(),
            Self::Complex(t) => t.name.as_ref(),
        }
    }
}

/// XSD Element declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsdElement {
    /// Element name
    pub name: QName,

    /// Declared type; absent means the substitution head's type or xs:anyType
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeReference>,

    /// Whether xsi:nil is allowed
    #[serde(default)]
    pub nillable: bool,

    /// Whether the declaration may not be used directly in an instance
    #[serde(rename = "abstract", default)]
    pub abstract_element: bool,

    /// Default or fixed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_constraint: Option<ValueConstraint>,

    /// Disallowed substitutions / xsi:type derivations
    #[serde(default)]
    pub block: DerivationFlags,

    /// Substitution group head element name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_group: Option<QName>,

    /// Identity constraints scoped to this element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Arc<XsdIdentity>>,
}

impl XsdElement {
    /// Create a declaration with no type (xs:anyType unless in a substitution group)
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_ref: None,
            nillable: false,
            abstract_element: false,
            value_constraint: None,
            block: DerivationFlags::default(),
            substitution_group: None,
            identities: Vec::new(),
        }
    }

    /// Create a declaration referring to a named type
    pub fn typed(name: QName, type_name: QName) -> Self {
        Self {
            type_ref: Some(TypeReference::Named(type_name)),
            ..Self::new(name)
        }
    }

    /// Create a declaration with an anonymous simple type
    pub fn simple(name: QName, simple_type: XsdSimpleType) -> Self {
        Self {
            type_ref: Some(TypeReference::Simple(Arc::new(simple_type))),
            ..Self::new(name)
        }
    }

    /// Create a declaration with an anonymous complex type
    pub fn complex(name: QName, complex_type: XsdComplexType) -> Self {
        Self {
            type_ref: Some(TypeReference::Complex(Arc::new(complex_type))),
            ..Self::new(name)
        }
    }

    /// Set nillable flag
    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Set abstract flag
    pub fn with_abstract(mut self, abstract_element: bool) -> Self {
        self.abstract_element = abstract_element;
        self
    }

    /// Set a default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Default(default.into()));
        self
    }

    /// Set a fixed value
    pub fn with_fixed(mut self, fixed: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Fixed(fixed.into()));
        self
    }

    /// Set the substitution group head
    pub fn with_substitution_group(mut self, head: QName) -> Self {
        self.substitution_group = Some(head);
        self
    }

    /// Set block flags
    pub fn with_block(mut self, block: DerivationFlags) -> Self {
        self.block = block;
        self
    }

    /// Attach an identity constraint
    pub fn with_identity(mut self, identity: XsdIdentity) -> Self {
        self.identities.push(Arc::new(identity));
        self
    }

    /// The fixed value, if the constraint is fixed
    pub fn fixed_value(&self) -> Option<&str> {
        match &self.value_constraint {
            Some(ValueConstraint::Fixed(v)) => Some(v),
            _ => None,
        }
    }
}

/// Builder for XSD elements
#[derive(Debug)]
pub struct XsdElementBuilder {
    name: Option<QName>,
    type_ref: Option<TypeReference>,
    nillable: bool,
    abstract_element: bool,
    value_constraint: Option<ValueConstraint>,
    block: DerivationFlags,
    substitution_group: Option<QName>,
    identities: Vec<Arc<XsdIdentity>>,
}

impl XsdElementBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            name: None,
            type_ref: None,
            nillable: false,
            abstract_element: false,
            value_constraint: None,
            block: DerivationFlags::default(),
            substitution_group: None,
            identities: Vec::new(),
        }
    }

    /// Set the element name
    pub fn name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Refer to a named type
    pub fn type_name(mut self, type_name: QName) -> Self {
        self.type_ref = Some(TypeReference::Named(type_name));
        self
    }

    /// Use an anonymous simple type
    pub fn simple_type(mut self, simple: XsdSimpleType) -> Self {
        self.type_ref = Some(TypeReference::Simple(Arc::new(simple)));
        self
    }

    /// Use an anonymous complex type
    pub fn complex_type(mut self, complex: XsdComplexType) -> Self {
        self.type_ref = Some(TypeReference::Complex(Arc::new(complex)));
        self
    }

    /// Set nillable flag
    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Set abstract flag
    pub fn abstract_element(mut self, abstract_element: bool) -> Self {
        self.abstract_element = abstract_element;
        self
    }

    /// Set default value
    pub fn default(mut self, default: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Default(default.into()));
        self
    }

    /// Set fixed value
    pub fn fixed(mut self, fixed: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Fixed(fixed.into()));
        self
    }

    /// Set substitution group
    pub fn substitution_group(mut self, group: QName) -> Self {
        self.substitution_group = Some(group);
        self
    }

    /// Set block flags
    pub fn block(mut self, block: DerivationFlags) -> Self {
        self.block = block;
        self
    }

    /// Attach an identity constraint
    pub fn identity(mut self, identity: XsdIdentity) -> Self {
        self.identities.push(Arc::new(identity));
        self
    }

    /// Build the element
    pub fn build(self) -> Result<XsdElement, &'static str> {
        let name = self.name.ok_or("Element name is required")?;

        Ok(XsdElement {
            name,
            type_ref: self.type_ref,
            nillable: self.nillable,
            abstract_element: self.abstract_element,
            value_constraint: self.value_constraint,
            block: self.block,
            substitution_group: self.substitution_group,
            identities: self.identities,
        })
    }
}

impl Default for XsdElementBuilder {
    fn default() -> Self {
        Self::new()
    }
}
