//! XSD Complex Type Validators
//!
//! This module implements complex type definitions for XSD schemas.
//! Complex types can have element content (model groups), simple content,
//! or mixed content with both text and elements.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Complex_Type_Definitions

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::namespaces::QName;

use super::attributes::{AttributeUse, XsdAttributeGroup};
use super::builtins::BuiltinType;
use super::elements::TypeReference;
use super::groups::{GroupParticle, XsdGroup};
use super::models::ContentModel;
use super::particles::Occurs;
use super::simple_types::XsdSimpleType;
use super::wildcards::{ProcessContents, XsdWildcard};

/// Derivation method for types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl DerivationMethod {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Content type label for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentTypeLabel {
    /// No content (empty element)
    Empty,
    /// Simple content (text only)
    Simple,
    /// Mixed content (text and elements)
    Mixed,
    /// Element-only content
    ElementOnly,
}

impl std::fmt::Display for ContentTypeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Simple => write!(f, "simple"),
            Self::Mixed => write!(f, "mixed"),
            Self::ElementOnly => write!(f, "element-only"),
        }
    }
}

/// Block derivation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivationFlags {
    /// Block restriction
    #[serde(default)]
    pub restriction: bool,
    /// Block extension
    #[serde(default)]
    pub extension: bool,
    /// Block substitution (element declarations only)
    #[serde(default)]
    pub substitution: bool,
}

impl DerivationFlags {
    /// All derivations blocked
    pub fn all() -> Self {
        Self {
            restriction: true,
            extension: true,
            substitution: true,
        }
    }

    /// Parse from attribute value
    pub fn from_attr(value: &str) -> Self {
        let mut flags = DerivationFlags::default();
        for token in value.split_whitespace() {
            match token {
                "#all" => return Self::all(),
                "restriction" => flags.restriction = true,
                "extension" => flags.extension = true,
                "substitution" => flags.substitution = true,
                _ => {}
            }
        }
        flags
    }

    /// Check if a derivation method is blocked
    pub fn is_blocked(&self, method: DerivationMethod) -> bool {
        match method {
            DerivationMethod::Restriction => self.restriction,
            DerivationMethod::Extension => self.extension,
        }
    }

    /// Flags blocked by either set
    pub fn union(self, other: DerivationFlags) -> Self {
        Self {
            restriction: self.restriction || other.restriction,
            extension: self.extension || other.extension,
            substitution: self.substitution || other.substitution,
        }
    }
}

/// XSD Complex Type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsdComplexType {
    /// Type name (None for anonymous types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<QName>,

    /// Base type (None only for xs:anyType)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<QName>,

    /// Derivation method from the base
    #[serde(default)]
    pub derivation: DerivationMethod,

    /// Content type
    pub content_type: ContentTypeLabel,

    /// Model group for element-only and mixed content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle: Option<XsdGroup>,

    /// Value type for simple content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<TypeReference>,

    /// Attribute uses and wildcard
    #[serde(default, skip_serializing_if = "XsdAttributeGroup::is_empty")]
    pub attributes: XsdAttributeGroup,

    /// Whether this type is abstract
    #[serde(rename = "abstract", default)]
    pub abstract_type: bool,

    /// Block derivation flags
    #[serde(default)]
    pub block: DerivationFlags,

    #[serde(skip)]
    automaton: OnceCell<Arc<ContentModel>>,
}

impl XsdComplexType {
    fn with_content(name: Option<QName>, content_type: ContentTypeLabel, particle: Option<XsdGroup>) -> Self {
        Self {
            name,
            base: Some(QName::xsd("anyType")),
            derivation: DerivationMethod::Restriction,
            content_type,
            particle,
            simple_type: None,
            attributes: XsdAttributeGroup::default(),
            abstract_type: false,
            block: DerivationFlags::default(),
            automaton: OnceCell::new(),
        }
    }

    /// Element-only content governed by `group`
    pub fn element_only(name: Option<QName>, group: XsdGroup) -> Self {
        Self::with_content(name, ContentTypeLabel::ElementOnly, Some(group))
    }

    /// Mixed content governed by `group`
    pub fn mixed(name: Option<QName>, group: XsdGroup) -> Self {
        Self::with_content(name, ContentTypeLabel::Mixed, Some(group))
    }

    /// Empty content
    pub fn empty(name: Option<QName>) -> Self {
        Self::with_content(name, ContentTypeLabel::Empty, None)
    }

    /// Simple content of type `simple_type`
    pub fn simple_content(name: Option<QName>, simple_type: TypeReference) -> Self {
        let mut complex = Self::with_content(name, ContentTypeLabel::Simple, None);
        complex.base = simple_type.name().cloned();
        complex.derivation = DerivationMethod::Extension;
        complex.simple_type = Some(simple_type);
        complex
    }

    /// The ur-type xs:anyType
    pub fn any_type() -> Self {
        let wildcard = XsdWildcard::any(ProcessContents::Lax).with_occurs(Occurs::zero_or_more());
        let mut any = Self::mixed(
            Some(QName::xsd("anyType")),
            XsdGroup::sequence(vec![GroupParticle::Any(wildcard)]),
        );
        any.base = None;
        any.attributes.wildcard = Some(XsdWildcard::any(ProcessContents::Lax));
        any
    }

    /// Check if this is xs:anyType
    pub fn is_any_type(&self) -> bool {
        self.name.as_ref() == Some(&QName::xsd("anyType"))
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "#AnonType".to_string(),
        }
    }

    /// Check if the content type is element-only
    pub fn is_element_only(&self) -> bool {
        self.content_type == ContentTypeLabel::ElementOnly
    }

    /// Check if the content type is mixed
    pub fn has_mixed_content(&self) -> bool {
        self.content_type == ContentTypeLabel::Mixed
    }

    /// Check if the content type is simple
    pub fn has_simple_content(&self) -> bool {
        self.content_type == ContentTypeLabel::Simple
    }

    /// Compiled automaton for element-only and mixed content, built on first use
    pub fn content_model(&self) -> Option<Arc<ContentModel>> {
        match self.content_type {
            ContentTypeLabel::ElementOnly | ContentTypeLabel::Mixed => {
                let model = self.automaton.get_or_init(|| {
                    let empty = XsdGroup::default();
                    Arc::new(ContentModel::compile(self.particle.as_ref().unwrap_or(&empty)))
                });
                Some(Arc::clone(model))
            }
            ContentTypeLabel::Empty | ContentTypeLabel::Simple => None,
        }
    }
}

/// Builder for complex types
#[derive(Debug, Default)]
pub struct ComplexTypeBuilder {
    name: Option<QName>,
    base: Option<(QName, DerivationMethod)>,
    particle: Option<XsdGroup>,
    simple_type: Option<TypeReference>,
    mixed: bool,
    abstract_type: bool,
    block: DerivationFlags,
    attributes: XsdAttributeGroup,
}

impl ComplexTypeBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the type name
    pub fn name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the content model group
    pub fn content_group(mut self, group: XsdGroup) -> Self {
        self.particle = Some(group);
        self
    }

    /// Use simple content of the named simple type
    pub fn content_simple(mut self, type_name: QName) -> Self {
        self.simple_type = Some(TypeReference::Named(type_name));
        self
    }

    /// Use simple content of an anonymous simple type
    pub fn content_simple_type(mut self, simple: XsdSimpleType) -> Self {
        self.simple_type = Some(TypeReference::Simple(Arc::new(simple)));
        self
    }

    /// Set the base type and derivation method
    pub fn base(mut self, base: QName, method: DerivationMethod) -> Self {
        self.base = Some((base, method));
        self
    }

    /// Set the mixed flag
    pub fn mixed(mut self, mixed: bool) -> Self {
        self.mixed = mixed;
        self
    }

    /// Set the abstract flag
    pub fn abstract_type(mut self, abstract_type: bool) -> Self {
        self.abstract_type = abstract_type;
        self
    }

    /// Set block flags
    pub fn block(mut self, block: DerivationFlags) -> Self {
        self.block = block;
        self
    }

    /// Add an attribute use
    pub fn attribute(mut self, attribute_use: AttributeUse) -> Self {
        self.attributes.uses.push(attribute_use);
        self
    }

    /// Set the attribute wildcard
    pub fn attribute_wildcard(mut self, wildcard: XsdWildcard) -> Self {
        self.attributes.wildcard = Some(wildcard);
        self
    }

    /// Build the complex type
    pub fn build(self) -> XsdComplexType {
        let mut complex = match (self.simple_type, self.particle) {
            (Some(simple), _) => XsdComplexType::simple_content(self.name, simple),
            (None, Some(group)) if self.mixed => XsdComplexType::mixed(self.name, group),
            (None, None) if self.mixed => XsdComplexType::mixed(self.name, XsdGroup::default()),
            (None, Some(group)) if !group.is_empty() => XsdComplexType::element_only(self.name, group),
            (None, _) => XsdComplexType::empty(self.name),
        };
        if let Some((base, method)) = self.base {
            complex.base = Some(base);
            complex.derivation = method;
        }
        complex.abstract_type = self.abstract_type;
        complex.block = self.block;
        complex.attributes = self.attributes;
        complex
    }
}

/// A simple or complex type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XsdType {
    /// Simple type
    Simple(Arc<XsdSimpleType>),
    /// Complex type
    Complex(Arc<XsdComplexType>),
}

impl XsdType {
    /// The built-in simple type `builtin`
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::Simple(Arc::new(XsdSimpleType::builtin(builtin)))
    }

    /// Type name, None for anonymous types
    pub fn name(&self) -> Option<&QName> {
        match self {
            Self::Simple(t) => t.name.as_ref(),
            Self::Complex(t) => t.name.as_ref(),
        }
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match self {
            Self::Simple(t) => t.display_name(),
            Self::Complex(t) => t.display_name(),
        }
    }

    /// Base type name
    pub fn base(&self) -> Option<&QName> {
        match self {
            Self::Simple(t) => t.base.as_ref(),
            Self::Complex(t) => t.base.as_ref(),
        }
    }

    /// How this type was derived from its base
    pub fn derivation(&self) -> DerivationMethod {
        match self {
            Self::Simple(_) => DerivationMethod::Restriction,
            Self::Complex(t) => t.derivation,
        }
    }

    /// Check if the type is abstract
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Complex(t) if t.abstract_type)
    }

    /// Block flags (empty for simple types)
    pub fn block(&self) -> DerivationFlags {
        match self {
            Self::Simple(_) => DerivationFlags::default(),
            Self::Complex(t) => t.block,
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    /// Identity comparison of the underlying definitions
    pub fn same_as(&self, other: &XsdType) -> bool {
        match (self, other) {
            (Self::Simple(a), Self::Simple(b)) => {
                Arc::ptr_eq(a, b) || (a.name.is_some() && a.name == b.name)
            }
            (Self::Complex(a), Self::Complex(b)) => {
                Arc::ptr_eq(a, b) || (a.name.is_some() && a.name == b.name)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for XsdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
