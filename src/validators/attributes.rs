//! XSD attribute validators
//!
//! This module implements attribute declarations, attribute uses and
//! attribute groups, and the per-element attribute check:
//!
//! 1. insert defaulted/fixed attributes that are absent
//! 2. match every instance attribute to a use or the wildcard
//! 3. validate values (and fixed values)
//! 4. report missing required attributes
//! 5. enforce the wildcard ID rules

use crate::events::{Attribute, Attributes, XmlName};
use crate::namespaces::{NamespaceContext, QName, XMLNS_NAMESPACE, XSI_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::builtins::XsdValue;
use super::elements::{TypeReference, ValueConstraint};
use super::exceptions::{ErrorCode, ErrorReporter};
use super::globals::GrammarResolver;
use super::simple_types::{IdKind, XsdSimpleType};
use super::wildcards::{ProcessContents, XsdWildcard};

/// Attributes of the instance namespace that are never matched against uses
pub const XSI_SPECIAL_ATTRIBUTES: [&str; 4] =
    ["type", "nil", "schemaLocation", "noNamespaceSchemaLocation"];

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeUseMode {
    /// Attribute is optional (default)
    #[default]
    Optional,
    /// Attribute is required
    Required,
    /// Attribute is prohibited
    Prohibited,
}

impl AttributeUseMode {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }

    /// Get the use as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Prohibited => "prohibited",
        }
    }
}

impl std::fmt::Display for AttributeUseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// XSD attribute declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsdAttribute {
    /// Attribute name
    pub name: QName,
    /// Attribute type; absent means xs:anySimpleType
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeReference>,
    /// Declaration-level default or fixed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_constraint: Option<ValueConstraint>,
}

impl XsdAttribute {
    /// Create an attribute declaration of type xs:anySimpleType
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_ref: None,
            value_constraint: None,
        }
    }

    /// Set the type by name
    pub fn with_type_name(mut self, type_name: QName) -> Self {
        self.type_ref = Some(TypeReference::Named(type_name));
        self
    }

    /// Set an anonymous simple type
    pub fn with_simple_type(mut self, simple_type: XsdSimpleType) -> Self {
        self.type_ref = Some(TypeReference::Simple(Arc::new(simple_type)));
        self
    }

    /// Set a default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Default(value.into()));
        self
    }

    /// Set a fixed value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.value_constraint = Some(ValueConstraint::Fixed(value.into()));
        self
    }
}

/// Attribute use inside a complex type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeUse {
    /// The declaration used
    pub attribute: Arc<XsdAttribute>,
    /// Required / optional / prohibited
    #[serde(rename = "use", default)]
    pub use_mode: AttributeUseMode,
    /// Use-level value constraint, overriding the declaration's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_constraint: Option<ValueConstraint>,
}

impl AttributeUse {
    /// An optional use of `attribute`
    pub fn optional(attribute: XsdAttribute) -> Self {
        Self {
            attribute: Arc::new(attribute),
            use_mode: AttributeUseMode::Optional,
            value_constraint: None,
        }
    }

    /// A required use of `attribute`
    pub fn required(attribute: XsdAttribute) -> Self {
        Self {
            use_mode: AttributeUseMode::Required,
            ..Self::optional(attribute)
        }
    }

    /// Set a use-level value constraint
    pub fn with_value_constraint(mut self, constraint: ValueConstraint) -> Self {
        self.value_constraint = Some(constraint);
        self
    }

    /// Check if required
    pub fn is_required(&self) -> bool {
        self.use_mode == AttributeUseMode::Required
    }

    /// Effective value constraint (use first, then declaration)
    pub fn effective_constraint(&self) -> Option<&ValueConstraint> {
        self.value_constraint
            .as_ref()
            .or(self.attribute.value_constraint.as_ref())
    }
}

/// Attribute uses and wildcard of a complex type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XsdAttributeGroup {
    /// Attribute uses in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<AttributeUse>,
    /// Optional attribute wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<XsdWildcard>,
}

impl XsdAttributeGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a use
    pub fn with_use(mut self, attribute_use: AttributeUse) -> Self {
        self.uses.push(attribute_use);
        self
    }

    /// Set the attribute wildcard
    pub fn with_wildcard(mut self, wildcard: XsdWildcard) -> Self {
        self.wildcard = Some(wildcard);
        self
    }

    /// The non-prohibited use declaring `namespace:local_name`
    pub fn get_use(&self, namespace: Option<&str>, local_name: &str) -> Option<&AttributeUse> {
        self.uses.iter().find(|u| {
            u.use_mode != AttributeUseMode::Prohibited
                && u.attribute.name.matches(namespace, local_name)
        })
    }

    /// Check if the group has no uses and no wildcard
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.wildcard.is_none()
    }
}

/// Typed value of a validated attribute
#[derive(Debug, Clone, PartialEq)]
pub struct TypedAttribute {
    /// Value in the attribute type's value space
    pub value: XsdValue,
    /// ID/IDREF participation
    pub id_kind: IdKind,
}

/// Check whether an attribute is one of the xsi attributes handled by the
/// validator itself, or a namespace declaration
pub fn is_special_attribute(name: &XmlName) -> bool {
    match name.namespace() {
        Some(XSI_NAMESPACE) => XSI_SPECIAL_ATTRIBUTES.contains(&name.local_name.as_str()),
        Some(XMLNS_NAMESPACE) => true,
        _ => name.prefix.as_deref() == Some("xmlns") || (name.prefix.is_none() && name.local_name == "xmlns"),
    }
}

/// Checks and augments the attributes of one element
pub struct AttributeValidator<'a> {
    resolver: &'a GrammarResolver,
    namespaces: &'a NamespaceContext,
    validate: bool,
}

impl<'a> AttributeValidator<'a> {
    /// Create a validator; with `validate == false` only defaults are inserted
    pub fn new(resolver: &'a GrammarResolver, namespaces: &'a NamespaceContext, validate: bool) -> Self {
        Self {
            resolver,
            namespaces,
            validate,
        }
    }

    /// Insert absent defaulted/fixed attributes; returns how many were added
    pub fn insert_defaults(&self, attributes: &mut Attributes, group: &XsdAttributeGroup) -> usize {
        let mut added = 0;
        for attribute_use in &group.uses {
            if attribute_use.use_mode == AttributeUseMode::Prohibited {
                continue;
            }
            let name = &attribute_use.attribute.name;
            if attributes.position(name.namespace(), &name.local_name).is_some() {
                continue;
            }
            if let Some(constraint) = attribute_use.effective_constraint() {
                attributes.push(Attribute::defaulted(
                    XmlName::new(None::<String>, name.local_name.clone(), name.namespace.clone()),
                    constraint.value(),
                ));
                added += 1;
            }
        }
        added
    }

    /// Run all attribute checks for `element`
    ///
    /// `group` is `None` for simple-typed elements, which admit no attributes
    /// besides the special xsi ones. Returns one entry per attribute (after
    /// default insertion) holding its typed value when it was validated.
    pub fn validate(
        &self,
        element: &str,
        attributes: &mut Attributes,
        group: Option<&XsdAttributeGroup>,
        reporter: &mut dyn ErrorReporter,
    ) -> Vec<Option<TypedAttribute>> {
        if let Some(group) = group {
            self.insert_defaults(attributes, group);
        }
        let mut typed = vec![None; attributes.len()];
        if !self.validate {
            return typed;
        }

        let group = match group {
            Some(group) => group,
            None => {
                for attr in attributes.iter() {
                    if !is_special_attribute(&attr.name) {
                        reporter.report(
                            ErrorCode::SimpleTypeAttribute,
                            element,
                            &[element.to_string(), attr.name.raw()],
                        );
                    }
                }
                return typed;
            }
        };

        let mut wildcard_id: Option<String> = None;
        for (index, attr) in attributes.iter().enumerate() {
            if is_special_attribute(&attr.name) {
                continue;
            }
            let raw = attr.name.raw();
            let attribute_use = group.get_use(attr.name.namespace(), &attr.name.local_name);

            let declaration = match attribute_use {
                Some(u) => Arc::clone(&u.attribute),
                None => {
                    let wildcard = match &group.wildcard {
                        Some(wc) if wc.allows(attr.name.namespace()) => wc,
                        _ => {
                            reporter.report(
                                ErrorCode::AttributeNotAllowed,
                                element,
                                &[element.to_string(), raw],
                            );
                            continue;
                        }
                    };
                    if wildcard.process_contents == ProcessContents::Skip {
                        continue;
                    }
                    match self.resolver.get_global_attribute(&attr.name.qname()) {
                        Some(decl) => {
                            let id_kind = self.resolver.simple_type_of(decl.type_ref.as_ref()).id_kind();
                            if id_kind == IdKind::Id {
                                match &wildcard_id {
                                    Some(previous) => reporter.report(
                                        ErrorCode::MultipleWildcardIds,
                                        element,
                                        &[element.to_string(), decl.name.local_name.clone(), previous.clone()],
                                    ),
                                    None => wildcard_id = Some(decl.name.local_name.clone()),
                                }
                            }
                            decl
                        }
                        None => {
                            if wildcard.process_contents == ProcessContents::Strict {
                                reporter.report(
                                    ErrorCode::AttributeNotAllowed,
                                    element,
                                    &[element.to_string(), raw],
                                );
                            }
                            continue;
                        }
                    }
                }
            };

            let simple_type = self.resolver.simple_type_of(declaration.type_ref.as_ref());
            let value = match simple_type.validate(&attr.value, self.namespaces) {
                Ok(value) => value,
                Err(e) => {
                    reporter.report(
                        ErrorCode::AttributeValue,
                        element,
                        &[element.to_string(), raw, simple_type.normalize(&attr.value), e.to_string()],
                    );
                    continue;
                }
            };

            if let Some(ValueConstraint::Fixed(fixed)) = &declaration.value_constraint {
                if !simple_type.equals_lexical(&value, fixed, self.namespaces) {
                    reporter.report(
                        ErrorCode::AttributeFixed,
                        element,
                        &[element.to_string(), raw.clone(), attr.value.clone(), fixed.clone()],
                    );
                }
            }
            if let Some(ValueConstraint::Fixed(fixed)) =
                attribute_use.and_then(|u| u.value_constraint.as_ref())
            {
                if !simple_type.equals_lexical(&value, fixed, self.namespaces) {
                    reporter.report(
                        ErrorCode::AttributeUseFixed,
                        element,
                        &[element.to_string(), raw, attr.value.clone(), fixed.clone()],
                    );
                }
            }

            typed[index] = Some(TypedAttribute {
                value,
                id_kind: simple_type.id_kind(),
            });
        }

        for attribute_use in group.uses.iter().filter(|u| u.is_required()) {
            let name = &attribute_use.attribute.name;
            let present = attributes
                .iter()
                .any(|a| a.specified && a.name.matches(name.namespace(), &name.local_name));
            if !present {
                reporter.report(
                    ErrorCode::RequiredAttributeMissing,
                    element,
                    &[element.to_string(), name.local_name.clone()],
                );
            }
        }

        if let Some(wildcard_id) = wildcard_id {
            if let Some(declared) = self.declared_id_attribute(group) {
                reporter.report(
                    ErrorCode::WildcardIdWithDeclaredId,
                    element,
                    &[element.to_string(), wildcard_id, declared],
                );
            }
        }

        typed
    }

    fn declared_id_attribute(&self, group: &XsdAttributeGroup) -> Option<String> {
        group
            .uses
            .iter()
            .filter(|u| u.use_mode != AttributeUseMode::Prohibited)
            .find(|u| self.resolver.simple_type_of(u.attribute.type_ref.as_ref()).id_kind() == IdKind::Id)
            .map(|u| u.attribute.name.local_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::builtins::BuiltinType;
    use crate::validators::exceptions::DiagnosticCollector;
    use crate::validators::globals::Grammar;
    use crate::validators::wildcards::NamespaceConstraint;

    fn resolver() -> GrammarResolver {
        let mut grammar = Grammar::new(None::<String>);
        grammar.add_attribute(XsdAttribute::new(QName::local("gid")).with_type_name(QName::xsd("ID")));
        let mut resolver = GrammarResolver::new();
        resolver.put_grammar(grammar);
        resolver
    }

    fn run(group: &XsdAttributeGroup, attrs: &mut Attributes) -> DiagnosticCollector {
        let resolver = resolver();
        let ns = NamespaceContext::new();
        let mut collector = DiagnosticCollector::new();
        AttributeValidator::new(&resolver, &ns, true).validate("e", attrs, Some(group), &mut collector);
        collector
    }

    fn int_attr(name: &str) -> XsdAttribute {
        XsdAttribute::new(QName::local(name)).with_type_name(QName::xsd("int"))
    }

    #[test]
    fn test_attribute_use_mode() {
        assert_eq!(AttributeUseMode::from_str("required"), Some(AttributeUseMode::Required));
        assert_eq!(AttributeUseMode::from_str("mandatory"), None);
        assert_eq!(AttributeUseMode::Prohibited.to_string(), "prohibited");
    }

    #[test]
    fn test_default_insertion_is_idempotent() {
        let group = XsdAttributeGroup::new()
            .with_use(AttributeUse::optional(int_attr("size").with_default("3")));
        let mut attrs = Attributes::new();
        assert!(run(&group, &mut attrs).is_empty());
        assert!(run(&group, &mut attrs).is_empty());
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.value(None, "size"), Some("3"));
        assert!(!attrs.get(0).unwrap().specified);
    }

    #[test]
    fn test_defaults_inserted_without_validation() {
        let group = XsdAttributeGroup::new()
            .with_use(AttributeUse::optional(int_attr("size").with_default("3")));
        let resolver = resolver();
        let ns = NamespaceContext::new();
        let mut collector = DiagnosticCollector::new();
        let mut attrs = Attributes::new().with("bogus", "x");
        AttributeValidator::new(&resolver, &ns, false).validate("e", &mut attrs, Some(&group), &mut collector);
        assert_eq!(attrs.len(), 2);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_not_allowed_and_required() {
        let group = XsdAttributeGroup::new().with_use(AttributeUse::required(int_attr("a")));
        let mut attrs = Attributes::new().with("b", "1");
        let collector = run(&group, &mut attrs);
        assert_eq!(collector.count(ErrorCode::AttributeNotAllowed), 1);
        assert_eq!(collector.count(ErrorCode::RequiredAttributeMissing), 1);
    }

    #[test]
    fn test_value_and_fixed() {
        let group = XsdAttributeGroup::new()
            .with_use(AttributeUse::optional(int_attr("a")))
            .with_use(AttributeUse::optional(int_attr("b").with_fixed("1")))
            .with_use(
                AttributeUse::optional(int_attr("c"))
                    .with_value_constraint(ValueConstraint::Fixed("7".into())),
            );
        let mut attrs = Attributes::new().with("a", "x").with("b", "01").with("c", "8");
        let collector = run(&group, &mut attrs);
        assert_eq!(collector.count(ErrorCode::AttributeValue), 1);
        assert_eq!(collector.count(ErrorCode::AttributeFixed), 0);
        assert_eq!(collector.count(ErrorCode::AttributeUseFixed), 1);
    }

    #[test]
    fn test_special_attributes_skipped() {
        let group = XsdAttributeGroup::new();
        let mut attrs = Attributes::new();
        attrs.push(Attribute::new(XmlName::new(Some("xsi"), "nil", Some(XSI_NAMESPACE)), "true"));
        assert!(run(&group, &mut attrs).is_empty());
    }

    #[test]
    fn test_simple_type_rejects_attributes() {
        let resolver = resolver();
        let ns = NamespaceContext::new();
        let mut collector = DiagnosticCollector::new();
        let mut attrs = Attributes::new().with("a", "1");
        AttributeValidator::new(&resolver, &ns, true).validate("e", &mut attrs, None, &mut collector);
        assert_eq!(collector.count(ErrorCode::SimpleTypeAttribute), 1);
    }

    #[test]
    fn test_wildcard_process_contents() {
        let strict = XsdAttributeGroup::new()
            .with_wildcard(XsdWildcard::new(NamespaceConstraint::Any, ProcessContents::Strict));
        let mut attrs = Attributes::new().with("unknown", "1");
        assert_eq!(run(&strict, &mut attrs).count(ErrorCode::AttributeNotAllowed), 1);

        let lax = XsdAttributeGroup::new()
            .with_wildcard(XsdWildcard::any(ProcessContents::Lax));
        let mut attrs = Attributes::new().with("unknown", "1").with("gid", "not an id");
        let collector = run(&lax, &mut attrs);
        assert_eq!(collector.count(ErrorCode::AttributeValue), 1);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_wildcard_ids() {
        let group = XsdAttributeGroup::new()
            .with_use(AttributeUse::optional(
                XsdAttribute::new(QName::local("key")).with_simple_type(XsdSimpleType::builtin(BuiltinType::Id)),
            ))
            .with_wildcard(XsdWildcard::any(ProcessContents::Lax));
        let mut attrs = Attributes::new().with("gid", "g1");
        let collector = run(&group, &mut attrs);
        assert_eq!(collector.count(ErrorCode::WildcardIdWithDeclaredId), 1);
    }
}
