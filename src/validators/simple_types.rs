//! XSD Simple Type validators
//!
//! This module implements XSD simple type validation including:
//! - Atomic types (built-in and derived by restriction)
//! - List types (whitespace-separated lists)
//! - Union types (value matching any member type)
//!
//! A simple type carries its complete effective facet set; facets inherited
//! from named bases are expected to be merged when the grammar is built.

use crate::namespaces::{NamespaceContext, QName};
use crate::validators::builtins::{BuiltinType, ValueError, XsdValue};
use crate::validators::facets::{FacetSet, WhiteSpace};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variety of a simple type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimpleVariety {
    /// Atomic type parsed by a built-in datatype
    Atomic(BuiltinType),
    /// List type with an item type
    List(Box<XsdSimpleType>),
    /// Union type with ordered member types
    Union(Vec<XsdSimpleType>),
}

/// How values of a type take part in ID/IDREF checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Not ID-related
    None,
    /// xs:ID or derived
    Id,
    /// xs:IDREF, xs:IDREFS or derived
    IdRef,
}

/// A simple type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsdSimpleType {
    /// Type name (None for anonymous types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<QName>,
    /// Base type name for derivation checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<QName>,
    /// Variety and underlying datatype
    pub variety: SimpleVariety,
    /// Effective constraining facets
    #[serde(default, skip_serializing_if = "FacetSet::is_empty")]
    pub facets: FacetSet,
}

impl XsdSimpleType {
    /// The built-in atomic type `builtin`
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self {
            name: Some(builtin.qname()),
            base: builtin.base().map(|b| b.qname()),
            variety: SimpleVariety::Atomic(builtin),
            facets: FacetSet::default(),
        }
    }

    /// A built-in list type such as xs:IDREFS
    pub fn builtin_list(name: &str, item: BuiltinType) -> Self {
        Self {
            name: Some(QName::xsd(name)),
            base: Some(BuiltinType::AnySimpleType.qname()),
            variety: SimpleVariety::List(Box::new(Self::builtin(item))),
            facets: FacetSet::new().with_length_bounds(Some(1), None),
        }
    }

    /// Derive by restriction from `base`, replacing its facets with `facets`
    pub fn restriction(name: Option<QName>, base: &XsdSimpleType, facets: FacetSet) -> Self {
        Self {
            name,
            base: base.name.clone(),
            variety: base.variety.clone(),
            facets,
        }
    }

    /// A list type over `item`
    pub fn list_of(name: Option<QName>, item: XsdSimpleType) -> Self {
        Self {
            name,
            base: Some(BuiltinType::AnySimpleType.qname()),
            variety: SimpleVariety::List(Box::new(item)),
            facets: FacetSet::default(),
        }
    }

    /// A union type over `members`
    pub fn union_of(name: Option<QName>, members: Vec<XsdSimpleType>) -> Self {
        Self {
            name,
            base: Some(BuiltinType::AnySimpleType.qname()),
            variety: SimpleVariety::Union(members),
            facets: FacetSet::default(),
        }
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "#AnonType".to_string(),
        }
    }

    /// The underlying built-in datatype for atomic types
    pub fn primitive(&self) -> Option<BuiltinType> {
        match &self.variety {
            SimpleVariety::Atomic(b) => Some(*b),
            _ => None,
        }
    }

    /// Effective white space handling
    pub fn white_space(&self) -> WhiteSpace {
        if let Some(ws) = self.facets.white_space {
            return ws;
        }
        match &self.variety {
            SimpleVariety::Atomic(b) => b.white_space(),
            SimpleVariety::List(_) => WhiteSpace::Collapse,
            SimpleVariety::Union(_) => WhiteSpace::Collapse,
        }
    }

    /// Normalize a lexical value by the white space facet
    pub fn normalize(&self, text: &str) -> String {
        self.white_space().normalize(text)
    }

    /// ID/IDREF participation of this type's values
    pub fn id_kind(&self) -> IdKind {
        match &self.variety {
            SimpleVariety::Atomic(b) if b.is_derived_from(BuiltinType::Id) => IdKind::Id,
            SimpleVariety::Atomic(b) if b.is_derived_from(BuiltinType::IdRef) => IdKind::IdRef,
            SimpleVariety::List(item) if item.id_kind() == IdKind::IdRef => IdKind::IdRef,
            _ => IdKind::None,
        }
    }

    /// Check whether a union lists `member` among its member types
    pub fn has_member(&self, member: &QName) -> bool {
        match &self.variety {
            SimpleVariety::Union(members) => members
                .iter()
                .any(|m| m.name.as_ref() == Some(member) || m.has_member(member)),
            _ => false,
        }
    }

    /// Normalize and validate a lexical value, returning its typed value
    pub fn validate(&self, text: &str, namespaces: &NamespaceContext) -> Result<XsdValue, ValueError> {
        let normalized = self.normalize(text);
        self.validate_normalized(&normalized, namespaces)
    }

    /// Compare a typed value with a lexical constraint value in the value space
    pub fn equals_lexical(&self, value: &XsdValue, lexical: &str, namespaces: &NamespaceContext) -> bool {
        match self.validate(lexical, namespaces) {
            Ok(constraint) => *value == constraint,
            Err(_) => value.to_string() == self.normalize(lexical),
        }
    }

    fn validate_normalized(
        &self,
        normalized: &str,
        namespaces: &NamespaceContext,
    ) -> Result<XsdValue, ValueError> {
        let value = match &self.variety {
            SimpleVariety::Atomic(b) => b.parse(normalized, namespaces)?,
            SimpleVariety::List(item) => {
                let items = normalized
                    .split(' ')
                    .filter(|s| !s.is_empty())
                    .map(|s| item.validate(s, namespaces))
                    .collect::<Result<Vec<_>, _>>()?;
                XsdValue::List(items)
            }
            SimpleVariety::Union(members) => members
                .iter()
                .find_map(|m| m.validate(normalized, namespaces).ok())
                .ok_or_else(|| ValueError::NoUnionMember(normalized.to_string()))?,
        };
        if !self.facets.is_empty() {
            self.facets
                .validate(normalized, &value, |s| self.parse_facet_value(s, namespaces))?;
        }
        Ok(value)
    }

    fn parse_facet_value(&self, lexical: &str, namespaces: &NamespaceContext) -> Result<XsdValue, ValueError> {
        match &self.variety {
            SimpleVariety::Atomic(b) => b.parse(&b.white_space().normalize(lexical), namespaces),
            SimpleVariety::List(item) => Ok(XsdValue::List(
                WhiteSpace::Collapse
                    .normalize(lexical)
                    .split(' ')
                    .filter(|s| !s.is_empty())
                    .map(|s| item.validate(s, namespaces))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            SimpleVariety::Union(members) => members
                .iter()
                .find_map(|m| m.validate(lexical, namespaces).ok())
                .ok_or_else(|| ValueError::NoUnionMember(lexical.to_string())),
        }
    }
}

impl fmt::Display for XsdSimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceContext {
        NamespaceContext::new()
    }

    #[test]
    fn test_builtin_simple_type() {
        let t = XsdSimpleType::builtin(BuiltinType::Integer);
        assert_eq!(t.name, Some(QName::xsd("integer")));
        assert_eq!(t.base, Some(QName::xsd("decimal")));
        assert_eq!(t.validate("  42 ", &ns()).unwrap().to_string(), "42");
        assert!(t.validate("4 2", &ns()).is_err());
    }

    #[test]
    fn test_restriction_with_facets() {
        let base = XsdSimpleType::builtin(BuiltinType::String);
        let sku = XsdSimpleType::restriction(
            Some(QName::local("SKU")),
            &base,
            FacetSet::new().with_pattern(r"\d{3}-[A-Z]{2}"),
        );
        assert!(sku.validate("123-AB", &ns()).is_ok());
        assert!(matches!(
            sku.validate("123-ab", &ns()),
            Err(ValueError::Facet { facet: "pattern", .. })
        ));
        assert_eq!(sku.base, Some(QName::xsd("string")));
    }

    #[test]
    fn test_list_type() {
        let list = XsdSimpleType::list_of(None, XsdSimpleType::builtin(BuiltinType::Int));
        let value = list.validate(" 1\n2   3 ", &ns()).unwrap();
        assert_eq!(value.facet_length(), Some(3));
        assert!(list.validate("1 x", &ns()).is_err());

        let idrefs = XsdSimpleType::builtin_list("IDREFS", BuiltinType::IdRef);
        assert_eq!(idrefs.id_kind(), IdKind::IdRef);
        assert!(idrefs.validate("   ", &ns()).is_err());
    }

    #[test]
    fn test_union_type() {
        let union = XsdSimpleType::union_of(
            Some(QName::local("sizeOrAuto")),
            vec![
                XsdSimpleType::builtin(BuiltinType::Int),
                XsdSimpleType::restriction(
                    None,
                    &XsdSimpleType::builtin(BuiltinType::Token),
                    FacetSet::new().with_enumeration(["auto"]),
                ),
            ],
        );
        assert!(matches!(union.validate("12", &ns()).unwrap(), XsdValue::Decimal(_)));
        assert!(union.validate("auto", &ns()).is_ok());
        assert!(matches!(
            union.validate("big", &ns()),
            Err(ValueError::NoUnionMember(_))
        ));
        assert!(union.has_member(&QName::xsd("int")));
    }

    #[test]
    fn test_id_kind() {
        assert_eq!(XsdSimpleType::builtin(BuiltinType::Id).id_kind(), IdKind::Id);
        assert_eq!(XsdSimpleType::builtin(BuiltinType::String).id_kind(), IdKind::None);
    }

    #[test]
    fn test_serde_roundtrip_keeps_behaviour() {
        let t = XsdSimpleType::restriction(
            Some(QName::local("small")),
            &XsdSimpleType::builtin(BuiltinType::Int),
            FacetSet::new().with_range(Some("0"), Some("9")),
        );
        let json = serde_json::to_string(&t).unwrap();
        let back: XsdSimpleType = serde_json::from_str(&json).unwrap();
        assert!(back.validate("5", &ns()).is_ok());
        assert!(back.validate("10", &ns()).is_err());
    }
}
