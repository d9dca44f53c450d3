//! XML Schema validators
//!
//! Grammar components, the content model engine, attribute validation,
//! identity constraints and the streaming document validator.

// Configuration and diagnostics
pub mod base;
pub mod exceptions;
pub mod validation;

// Type system
pub mod builtins;
pub mod facets;
pub mod simple_types;
pub mod attributes;

// Complex structures
pub mod particles;
pub mod wildcards;
pub mod groups;
pub mod models;
pub mod complex_types;
pub mod elements;

// Grammars and identity constraints
pub mod identities;
pub mod globals;
pub mod value_stores;
pub mod identity_engine;

// Instance validation
pub mod document_validation;

// Re-exports
pub use attributes::{
    AttributeUse, AttributeUseMode, AttributeValidator, TypedAttribute, XsdAttribute,
    XsdAttributeGroup,
};
pub use base::{ValidatorConfig, FEATURE_DYNAMIC_VALIDATION, FEATURE_VALIDATION};
pub use builtins::{BuiltinType, ValueError, XsdValue};
pub use complex_types::{
    ComplexTypeBuilder, ContentTypeLabel, DerivationFlags, DerivationMethod, XsdComplexType,
    XsdType,
};
pub use document_validation::{ElementFrame, SchemaValidator};
pub use elements::{TypeReference, ValueConstraint, XsdElement, XsdElementBuilder};
pub use exceptions::{Diagnostic, DiagnosticCollector, ErrorCode, ErrorReporter, NullReporter};
pub use facets::{FacetSet, WhiteSpace};
pub use globals::{Grammar, GrammarResolver};
pub use groups::{GroupParticle, ModelType, XsdGroup};
pub use identities::{IdentityConstraintKind, XsdIdentity};
pub use identity_engine::IdentityEngine;
pub use models::{ContentModel, MatchedParticle, ModelState};
pub use particles::Occurs;
pub use simple_types::{IdKind, XsdSimpleType};
pub use validation::ValidationState;
pub use value_stores::{ValueStore, ValueStoreCache};
pub use wildcards::{NamespaceConstraint, ProcessContents, XsdWildcard};
