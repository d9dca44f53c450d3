//! XSD Validation diagnostics
//!
//! Validity findings are never returned as `Err`: they are reported to an
//! [`ErrorReporter`] as a code, the name of the element being validated and
//! a list of arguments. Validation then continues.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of diagnostic codes raised while validating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // =========================================================================
    // Elements
    // =========================================================================
    /// No declaration found for the root (or an undeclared element)
    ElementNotDeclared,
    /// Element declaration is abstract
    AbstractElement,
    /// xsi:nil used on a non-nillable element
    NotNillable,
    /// Nil element has content
    NilWithContent,
    /// Nil element carries a fixed value constraint
    NilWithFixed,
    /// xsi:type value is not a QName
    InvalidXsiType,
    /// xsi:type names an unknown type
    XsiTypeNotFound,
    /// xsi:type is not validly derived from the declared type
    XsiTypeNotDerived,
    /// Value constraint is not valid for the xsi:type override
    InvalidDefaultForType,
    /// Element with a fixed value has element children
    FixedWithChildren,
    /// Mixed content does not match the fixed value
    FixedMixedMismatch,
    /// Simple content does not match the fixed value
    FixedValueMismatch,

    // =========================================================================
    // Types
    // =========================================================================
    /// Governing type is abstract
    AbstractType,
    /// Simple-typed element has an attribute
    SimpleTypeAttribute,
    /// Simple-typed element has element children
    SimpleTypeChildren,
    /// Simple-typed element has an invalid value
    SimpleTypeValue,
    /// Empty content type has children or text
    EmptyContent,
    /// Simple content type has element children
    SimpleContentChildren,
    /// Element-only content has character data
    ElementOnlyText,
    /// Child not allowed by the content model
    InvalidChild,
    /// Content model not satisfied at element end
    IncompleteContent,
    /// Strict wildcard matched an undeclared element
    StrictWildcardUndeclared,

    // =========================================================================
    // Attributes
    // =========================================================================
    /// Attribute does not match the use's fixed value
    AttributeUseFixed,
    /// Attribute is not declared and no wildcard admits it
    AttributeNotAllowed,
    /// Required attribute is missing
    RequiredAttributeMissing,
    /// More than one ID attribute admitted by the wildcard
    MultipleWildcardIds,
    /// Wildcard ID attribute alongside a declared ID attribute
    WildcardIdWithDeclaredId,
    /// Attribute value not valid for its type
    AttributeValue,
    /// Attribute value does not match the declaration's fixed value
    AttributeFixed,

    // =========================================================================
    // Document
    // =========================================================================
    /// ID value declared twice
    DuplicateId,
    /// IDREF names no ID
    UnresolvedIdref,
    /// A schema-location hint could not be loaded
    SchemaLoad,

    // =========================================================================
    // Identity constraints
    // =========================================================================
    /// Duplicate tuple for a unique constraint
    DuplicateUnique,
    /// Duplicate tuple for a key constraint
    DuplicateKey,
    /// Key selector matched but no field produced a value
    AbsentKeyValue,
    /// Unique tuple left incomplete
    UniqueNotEnoughValues,
    /// Key tuple left incomplete
    KeyNotEnoughValues,
    /// KeyRef tuple left incomplete
    KeyRefNotEnoughValues,
    /// A field matched more than once in one scope
    FieldMultipleMatch,
    /// A value arrived for a field the store does not know
    UnknownField,
    /// A key field matched a nillable element
    KeyMatchesNillable,
    /// KeyRef tuple has no matching key tuple
    KeyNotFound,
    /// Referenced key is not in scope
    KeyRefOutOfScope,
}

impl ErrorCode {
    /// Stable code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElementNotDeclared => "cvc-elt.1",
            Self::AbstractElement => "cvc-elt.2",
            Self::NotNillable => "cvc-elt.3.1",
            Self::NilWithContent => "cvc-elt.3.2.1",
            Self::NilWithFixed => "cvc-elt.3.2.2",
            Self::InvalidXsiType => "cvc-elt.4.1",
            Self::XsiTypeNotFound => "cvc-elt.4.2",
            Self::XsiTypeNotDerived => "cvc-elt.4.3",
            Self::InvalidDefaultForType => "cvc-elt.5.1.1",
            Self::FixedWithChildren => "cvc-elt.5.2.2.1",
            Self::FixedMixedMismatch => "cvc-elt.5.2.2.2.1",
            Self::FixedValueMismatch => "cvc-elt.5.2.2.2.2",
            Self::AbstractType => "cvc-type.2",
            Self::SimpleTypeAttribute => "cvc-type.3.1.1",
            Self::SimpleTypeChildren => "cvc-type.3.1.2",
            Self::SimpleTypeValue => "cvc-type.3.1.3",
            Self::EmptyContent => "cvc-complex-type.2.1",
            Self::SimpleContentChildren => "cvc-complex-type.2.2",
            Self::ElementOnlyText => "cvc-complex-type.2.3",
            Self::InvalidChild => "cvc-complex-type.2.4.a",
            Self::IncompleteContent => "cvc-complex-type.2.4.b",
            Self::StrictWildcardUndeclared => "cvc-complex-type.2.4.c",
            Self::AttributeUseFixed => "cvc-complex-type.3.1",
            Self::AttributeNotAllowed => "cvc-complex-type.3.2.2",
            Self::RequiredAttributeMissing => "cvc-complex-type.4",
            Self::MultipleWildcardIds => "cvc-complex-type.5.1",
            Self::WildcardIdWithDeclaredId => "cvc-complex-type.5.2",
            Self::AttributeValue => "cvc-attribute.3",
            Self::AttributeFixed => "cvc-attribute.4",
            Self::DuplicateId => "cvc-id.2",
            Self::UnresolvedIdref => "cvc-id.1",
            Self::SchemaLoad => "schema_reference.4",
            Self::DuplicateUnique => "DuplicateUnique",
            Self::DuplicateKey => "DuplicateKey",
            Self::AbsentKeyValue => "AbsentKeyValue",
            Self::UniqueNotEnoughValues => "UniqueNotEnoughValues",
            Self::KeyNotEnoughValues => "KeyNotEnoughValues",
            Self::KeyRefNotEnoughValues => "KeyRefNotEnoughValues",
            Self::FieldMultipleMatch => "FieldMultipleMatch",
            Self::UnknownField => "UnknownField",
            Self::KeyMatchesNillable => "KeyMatchesNillable",
            Self::KeyNotFound => "KeyNotFound",
            Self::KeyRefOutOfScope => "KeyRefOutOfScope",
        }
    }

    /// True for identity-constraint findings
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUnique
                | Self::DuplicateKey
                | Self::AbsentKeyValue
                | Self::UniqueNotEnoughValues
                | Self::KeyNotEnoughValues
                | Self::KeyRefNotEnoughValues
                | Self::FieldMultipleMatch
                | Self::UnknownField
                | Self::KeyMatchesNillable
                | Self::KeyNotFound
                | Self::KeyRefOutOfScope
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reported finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What went wrong
    pub code: ErrorCode,
    /// Raw name of the element being validated when it was found
    pub element: String,
    /// Code-specific arguments
    pub args: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: <{}>", self.code, self.element)?;
        if !self.args.is_empty() {
            write!(f, " [{}]", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// Sink for validation findings
pub trait ErrorReporter {
    /// Receive one finding
    fn report(&mut self, code: ErrorCode, element: &str, args: &[String]);
}

impl<R: ErrorReporter + ?Sized> ErrorReporter for &mut R {
    fn report(&mut self, code: ErrorCode, element: &str, args: &[String]) {
        (**self).report(code, element, args)
    }
}

/// Reporter that keeps every finding in order
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Findings in report order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the findings, leaving the collector empty
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Number of findings with `code`
    pub fn count(&self, code: ErrorCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// Check whether `code` was reported
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.count(code) > 0
    }

    /// True when nothing was reported
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of findings
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Drop all findings
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

impl ErrorReporter for DiagnosticCollector {
    fn report(&mut self, code: ErrorCode, element: &str, args: &[String]) {
        log::debug!("{} at <{}> {:?}", code, element, args);
        self.diagnostics.push(Diagnostic {
            code,
            element: element.to_string(),
            args: args.to_vec(),
        });
    }
}

/// Reporter that drops every finding
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&mut self, _code: ErrorCode, _element: &str, _args: &[String]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strings() {
        assert_eq!(ErrorCode::InvalidChild.as_str(), "cvc-complex-type.2.4.a");
        assert_eq!(ErrorCode::NotNillable.to_string(), "cvc-elt.3.1");
        assert_eq!(ErrorCode::KeyNotFound.as_str(), "KeyNotFound");
        assert!(ErrorCode::DuplicateKey.is_identity());
        assert!(!ErrorCode::DuplicateId.is_identity());
    }

    #[test]
    fn test_collector() {
        let mut collector = DiagnosticCollector::new();
        collector.report(ErrorCode::DuplicateKey, "b", &["1".into(), "a".into()]);
        collector.report(ErrorCode::InvalidChild, "root", &[]);
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.count(ErrorCode::DuplicateKey), 1);
        assert!(!collector.has_code(ErrorCode::KeyNotFound));
        assert_eq!(
            collector.diagnostics()[0].to_string(),
            "DuplicateKey: <b> [1, a]"
        );
        assert_eq!(collector.take().len(), 2);
        assert!(collector.is_empty());
    }
}
