//! Grammars and global declaration lookup
//!
//! A [`Grammar`] holds the global element, type and attribute declarations
//! of one target namespace. The [`GrammarResolver`] maps namespaces to
//! grammars, answers every cross-component question the validator asks
//! (type of an element, derivation checks, substitution group membership)
//! and loads further grammars on demand from schema-location hints.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loaders::GrammarLoader;
use crate::locations::Location;
use crate::namespaces::{QName, XSD_NAMESPACE};

use super::attributes::XsdAttribute;
use super::builtins::{BuiltinType, ATOMIC_BUILTINS, LIST_BUILTINS};
use super::complex_types::{DerivationFlags, XsdComplexType, XsdType};
use super::elements::{TypeReference, XsdElement};
use super::simple_types::XsdSimpleType;

/// Longest derivation or substitution chain followed before giving up
const MAX_CHAIN: usize = 64;

/// Global declarations of one target namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grammar {
    /// Target namespace (None for no-namespace grammars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    /// Global element declarations by local name
    #[serde(default)]
    pub elements: IndexMap<String, Arc<XsdElement>>,
    /// Global type definitions by local name
    #[serde(default)]
    pub types: IndexMap<String, XsdType>,
    /// Global attribute declarations by local name
    #[serde(default)]
    pub attributes: IndexMap<String, Arc<XsdAttribute>>,
}

impl Grammar {
    /// Create an empty grammar
    pub fn new(target_namespace: Option<impl Into<String>>) -> Self {
        Self {
            target_namespace: target_namespace.map(Into::into),
            ..Self::default()
        }
    }

    /// The built-in XML Schema grammar
    pub fn builtin() -> Self {
        let mut grammar = Self::new(Some(XSD_NAMESPACE));
        grammar.add_complex_type(XsdComplexType::any_type());
        for builtin in ATOMIC_BUILTINS {
            grammar.add_simple_type(XsdSimpleType::builtin(*builtin));
        }
        for (name, item) in LIST_BUILTINS {
            grammar.add_simple_type(XsdSimpleType::builtin_list(name, *item));
        }
        grammar
    }

    /// Add a global element declaration
    pub fn add_element(&mut self, element: XsdElement) -> Arc<XsdElement> {
        let element = Arc::new(element);
        self.elements
            .insert(element.name.local_name.clone(), Arc::clone(&element));
        element
    }

    /// Add a named simple type
    pub fn add_simple_type(&mut self, simple_type: XsdSimpleType) {
        if let Some(name) = simple_type.name.clone() {
            self.types
                .insert(name.local_name, XsdType::Simple(Arc::new(simple_type)));
        } else {
            log::warn!("anonymous simple type cannot be global");
        }
    }

    /// Add a named complex type
    pub fn add_complex_type(&mut self, complex_type: XsdComplexType) {
        if let Some(name) = complex_type.name.clone() {
            self.types
                .insert(name.local_name, XsdType::Complex(Arc::new(complex_type)));
        } else {
            log::warn!("anonymous complex type cannot be global");
        }
    }

    /// Add a global attribute declaration
    pub fn add_attribute(&mut self, attribute: XsdAttribute) -> Arc<XsdAttribute> {
        let attribute = Arc::new(attribute);
        self.attributes
            .insert(attribute.name.local_name.clone(), Arc::clone(&attribute));
        attribute
    }

    /// Global element declaration by local name
    pub fn get_global_element(&self, local_name: &str) -> Option<&Arc<XsdElement>> {
        self.elements.get(local_name)
    }

    /// Global type by local name
    pub fn get_global_type(&self, local_name: &str) -> Option<&XsdType> {
        self.types.get(local_name)
    }

    /// Global attribute declaration by local name
    pub fn get_global_attribute(&self, local_name: &str) -> Option<&Arc<XsdAttribute>> {
        self.attributes.get(local_name)
    }

    /// Read a grammar from its JSON form
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the grammar as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Namespace-to-grammar registry used during validation
#[derive(Clone)]
pub struct GrammarResolver {
    grammars: HashMap<Option<String>, Arc<Grammar>>,
    loader: Option<Arc<dyn GrammarLoader>>,
    any_type: Arc<XsdComplexType>,
    any_simple_type: Arc<XsdSimpleType>,
}

impl fmt::Debug for GrammarResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarResolver")
            .field("namespaces", &self.grammars.keys().collect::<Vec<_>>())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

impl Default for GrammarResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarResolver {
    /// Create a resolver holding the built-in grammar only
    pub fn new() -> Self {
        let builtin = Grammar::builtin();
        let any_type = match builtin.get_global_type("anyType") {
            Some(XsdType::Complex(t)) => Arc::clone(t),
            _ => Arc::new(XsdComplexType::any_type()),
        };
        let any_simple_type = match builtin.get_global_type("anySimpleType") {
            Some(XsdType::Simple(t)) => Arc::clone(t),
            _ => Arc::new(XsdSimpleType::builtin(BuiltinType::AnySimpleType)),
        };
        let mut grammars = HashMap::new();
        grammars.insert(Some(XSD_NAMESPACE.to_string()), Arc::new(builtin));
        Self {
            grammars,
            loader: None,
            any_type,
            any_simple_type,
        }
    }

    /// Use `loader` for schema-location driven loading
    pub fn with_loader(mut self, loader: Arc<dyn GrammarLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Register a grammar, replacing any grammar for the same namespace
    pub fn put_grammar(&mut self, grammar: Grammar) -> Arc<Grammar> {
        let grammar = Arc::new(grammar);
        self.grammars
            .insert(grammar.target_namespace.clone(), Arc::clone(&grammar));
        grammar
    }

    /// Grammar for a namespace
    pub fn get_grammar(&self, namespace: Option<&str>) -> Option<&Arc<Grammar>> {
        self.grammars.get(&namespace.map(str::to_string))
    }

    /// Check if a grammar is registered for `namespace`
    pub fn has_grammar(&self, namespace: Option<&str>) -> bool {
        self.get_grammar(namespace).is_some()
    }

    /// All registered grammars
    pub fn grammars(&self) -> impl Iterator<Item = &Arc<Grammar>> {
        self.grammars.values()
    }

    /// Load the grammar for `namespace` from a location hint, once per namespace
    pub fn load_grammar(
        &mut self,
        namespace: Option<&str>,
        hint: &str,
        base_dir: Option<&Path>,
    ) -> Result<Arc<Grammar>> {
        if let Some(grammar) = self.get_grammar(namespace) {
            return Ok(Arc::clone(grammar));
        }
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| Error::Resource("no grammar loader configured".to_string()))?;
        let location = Location::resolve(hint, base_dir)?;
        let grammar = loader.load_grammar(&location)?;
        if grammar.target_namespace.as_deref() != namespace {
            return Err(Error::Resource(format!(
                "grammar at '{}' has target namespace {:?}, expected {:?}",
                location.as_str(),
                grammar.target_namespace,
                namespace
            )));
        }
        log::debug!("loaded grammar for {:?} from {}", namespace, location.as_str());
        Ok(self.put_grammar(grammar))
    }

    /// Global element declaration by expanded name
    pub fn get_global_element(&self, name: &QName) -> Option<Arc<XsdElement>> {
        self.get_grammar(name.namespace())?
            .get_global_element(&name.local_name)
            .cloned()
    }

    /// Global type by expanded name
    pub fn get_global_type(&self, name: &QName) -> Option<XsdType> {
        self.get_grammar(name.namespace())?
            .get_global_type(&name.local_name)
            .cloned()
    }

    /// Global attribute declaration by expanded name
    pub fn get_global_attribute(&self, name: &QName) -> Option<Arc<XsdAttribute>> {
        self.get_grammar(name.namespace())?
            .get_global_attribute(&name.local_name)
            .cloned()
    }

    /// xs:anyType
    pub fn any_type(&self) -> XsdType {
        XsdType::Complex(Arc::clone(&self.any_type))
    }

    /// xs:anySimpleType
    pub fn any_simple_type(&self) -> Arc<XsdSimpleType> {
        Arc::clone(&self.any_simple_type)
    }

    /// Resolve a type reference
    pub fn resolve_type(&self, type_ref: &TypeReference) -> Option<XsdType> {
        match type_ref {
            TypeReference::Named(name) => self.get_global_type(name),
            TypeReference::Simple(t) => Some(XsdType::Simple(Arc::clone(t))),
            TypeReference::Complex(t) => Some(XsdType::Complex(Arc::clone(t))),
        }
    }

    /// Simple type of an attribute or of simple content
    ///
    /// A missing reference means xs:anySimpleType; an unresolvable one is
    /// logged and treated the same way.
    pub fn simple_type_of(&self, type_ref: Option<&TypeReference>) -> Arc<XsdSimpleType> {
        match type_ref.map(|t| (t, self.resolve_type(t))) {
            None => self.any_simple_type(),
            Some((_, Some(XsdType::Simple(t)))) => t,
            Some((_, Some(XsdType::Complex(t)))) if t.has_simple_content() => {
                self.simple_type_of(t.simple_type.as_ref())
            }
            Some((t, _)) => {
                log::warn!("{:?} is not a simple type; using xs:anySimpleType", t.name());
                self.any_simple_type()
            }
        }
    }

    /// Governing type of an element declaration
    ///
    /// Untyped members of a substitution group take the head's type; other
    /// untyped declarations are xs:anyType.
    pub fn element_type(&self, element: &XsdElement) -> XsdType {
        let mut current: Option<Arc<XsdElement>> = None;
        for _ in 0..MAX_CHAIN {
            let decl = current.as_deref().unwrap_or(element);
            if let Some(type_ref) = &decl.type_ref {
                return self.resolve_type(type_ref).unwrap_or_else(|| {
                    log::warn!(
                        "type {:?} of element {} not found; using xs:anyType",
                        type_ref.name(),
                        decl.name
                    );
                    self.any_type()
                });
            }
            match decl
                .substitution_group
                .as_ref()
                .and_then(|head| self.get_global_element(head))
            {
                Some(head) => current = Some(head),
                None => break,
            }
        }
        self.any_type()
    }

    /// Check whether `derived` is validly derived from `base` when the
    /// derivation methods in `block` are disallowed
    pub fn is_derived_from(&self, derived: &XsdType, base: &XsdType, block: DerivationFlags) -> bool {
        if let XsdType::Complex(b) = base {
            if b.is_any_type() {
                return true;
            }
        }
        if let (XsdType::Simple(d), XsdType::Simple(b)) = (derived, base) {
            if let Some(name) = &d.name {
                if b.has_member(name) {
                    return true;
                }
            }
        }

        let mut current = derived.clone();
        for _ in 0..MAX_CHAIN {
            if current.same_as(base) {
                return true;
            }
            if block.is_blocked(current.derivation()) {
                return false;
            }
            match current.base().and_then(|name| self.get_global_type(name)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// The declaration for `name` if it may substitute for the global element `head`
    pub fn substitution_member(&self, name: &QName, head: &QName) -> Option<Arc<XsdElement>> {
        let head_decl = self.get_global_element(head)?;
        if head_decl.block.substitution {
            return None;
        }
        let member = self.get_global_element(name)?;

        let mut group = member.substitution_group.clone();
        let mut found = false;
        for _ in 0..MAX_CHAIN {
            match group {
                Some(ref current) if current == head => {
                    found = true;
                    break;
                }
                Some(ref current) => {
                    group = self
                        .get_global_element(current)
                        .and_then(|d| d.substitution_group.clone());
                }
                None => break,
            }
        }
        if !found || member.abstract_element {
            return None;
        }

        let member_type = self.element_type(&member);
        let head_type = self.element_type(&head_decl);
        let block = head_decl.block.union(head_type.block());
        self.is_derived_from(&member_type, &head_type, block)
            .then_some(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::complex_types::{ComplexTypeBuilder, DerivationMethod};
    use crate::validators::groups::XsdGroup;
    use std::sync::Mutex;

    fn resolver_with(grammar: Grammar) -> GrammarResolver {
        let mut resolver = GrammarResolver::new();
        resolver.put_grammar(grammar);
        resolver
    }

    fn derived_types() -> Grammar {
        let mut grammar = Grammar::new(Some("urn:t"));
        grammar.add_complex_type(
            ComplexTypeBuilder::new()
                .name(QName::namespaced("urn:t", "Base"))
                .content_group(XsdGroup::sequence(vec![]))
                .build(),
        );
        grammar.add_complex_type(
            ComplexTypeBuilder::new()
                .name(QName::namespaced("urn:t", "Ext"))
                .base(QName::namespaced("urn:t", "Base"), DerivationMethod::Extension)
                .build(),
        );
        grammar
    }

    #[test]
    fn test_builtin_grammar() {
        let resolver = GrammarResolver::new();
        assert!(resolver.has_grammar(Some(XSD_NAMESPACE)));
        assert!(resolver.get_global_type(&QName::xsd("IDREFS")).is_some());
        assert!(resolver.get_global_type(&QName::xsd("anyType")).is_some());
        assert!(resolver.get_global_type(&QName::xsd("nope")).is_none());
    }

    #[test]
    fn test_global_lookup() {
        let mut grammar = Grammar::new(Some("urn:a"));
        grammar.add_element(XsdElement::typed(QName::namespaced("urn:a", "root"), QName::xsd("int")));
        let resolver = resolver_with(grammar);
        assert!(resolver.get_global_element(&QName::namespaced("urn:a", "root")).is_some());
        assert!(resolver.get_global_element(&QName::local("root")).is_none());
    }

    #[test]
    fn test_simple_type_of() {
        let resolver = GrammarResolver::new();
        assert_eq!(resolver.simple_type_of(None).name, Some(QName::xsd("anySimpleType")));
        let int = resolver.simple_type_of(Some(&TypeReference::Named(QName::xsd("int"))));
        assert_eq!(int.name, Some(QName::xsd("int")));
        let missing = resolver.simple_type_of(Some(&TypeReference::Named(QName::local("gone"))));
        assert_eq!(missing.name, Some(QName::xsd("anySimpleType")));
    }

    #[test]
    fn test_element_type_from_head() {
        let mut grammar = Grammar::new(None::<String>);
        grammar.add_element(XsdElement::typed(QName::local("head"), QName::xsd("int")));
        grammar.add_element(XsdElement::new(QName::local("member")).with_substitution_group(QName::local("head")));
        grammar.add_element(XsdElement::new(QName::local("plain")));
        let resolver = resolver_with(grammar);

        let member = resolver.get_global_element(&QName::local("member")).unwrap();
        assert_eq!(resolver.element_type(&member).name(), Some(&QName::xsd("int")));
        let plain = resolver.get_global_element(&QName::local("plain")).unwrap();
        assert_eq!(resolver.element_type(&plain).name(), Some(&QName::xsd("anyType")));
    }

    #[test]
    fn test_derivation() {
        let resolver = resolver_with(derived_types());
        let base = resolver.get_global_type(&QName::namespaced("urn:t", "Base")).unwrap();
        let ext = resolver.get_global_type(&QName::namespaced("urn:t", "Ext")).unwrap();

        assert!(resolver.is_derived_from(&ext, &base, DerivationFlags::default()));
        assert!(!resolver.is_derived_from(&ext, &base, DerivationFlags::from_attr("extension")));
        assert!(!resolver.is_derived_from(&base, &ext, DerivationFlags::default()));
        assert!(resolver.is_derived_from(&base, &resolver.any_type(), DerivationFlags::all()));

        let int = XsdType::builtin(BuiltinType::Int);
        let decimal = resolver.get_global_type(&QName::xsd("decimal")).unwrap();
        assert!(resolver.is_derived_from(&int, &decimal, DerivationFlags::default()));
        assert!(!resolver.is_derived_from(&decimal, &int, DerivationFlags::default()));
    }

    #[test]
    fn test_substitution_member() {
        let mut grammar = Grammar::new(None::<String>);
        grammar.add_element(XsdElement::typed(QName::local("head"), QName::xsd("decimal")));
        grammar.add_element(
            XsdElement::typed(QName::local("direct"), QName::xsd("int"))
                .with_substitution_group(QName::local("head")),
        );
        grammar.add_element(
            XsdElement::new(QName::local("indirect")).with_substitution_group(QName::local("direct")),
        );
        grammar.add_element(
            XsdElement::typed(QName::local("wrong"), QName::xsd("string"))
                .with_substitution_group(QName::local("head")),
        );
        grammar.add_element(
            XsdElement::typed(QName::local("blocked"), QName::xsd("int"))
                .with_substitution_group(QName::local("bhead")),
        );
        grammar.add_element(
            XsdElement::typed(QName::local("bhead"), QName::xsd("int"))
                .with_block(DerivationFlags::from_attr("substitution")),
        );
        let resolver = resolver_with(grammar);
        let head = QName::local("head");

        assert!(resolver.substitution_member(&QName::local("direct"), &head).is_some());
        assert!(resolver.substitution_member(&QName::local("indirect"), &head).is_some());
        assert!(resolver.substitution_member(&QName::local("wrong"), &head).is_none());
        assert!(resolver
            .substitution_member(&QName::local("blocked"), &QName::local("bhead"))
            .is_none());
    }

    struct FixedLoader {
        grammar: Grammar,
        calls: Mutex<usize>,
    }

    impl GrammarLoader for FixedLoader {
        fn load_grammar(&self, _location: &Location) -> Result<Grammar> {
            if let Ok(mut calls) = self.calls.lock() {
                *calls += 1;
            }
            Ok(self.grammar.clone())
        }
    }

    #[test]
    fn test_load_grammar_once_per_namespace() {
        let loader = Arc::new(FixedLoader {
            grammar: Grammar::new(Some("urn:x")),
            calls: Mutex::new(0),
        });
        let mut resolver = GrammarResolver::new().with_loader(loader.clone());
        resolver.load_grammar(Some("urn:x"), "x.json", None).unwrap();
        resolver.load_grammar(Some("urn:x"), "other.json", None).unwrap();
        assert_eq!(*loader.calls.lock().unwrap(), 1);

        assert!(resolver.load_grammar(Some("urn:y"), "x.json", None).is_err());
        assert!(GrammarResolver::new().load_grammar(None, "x.json", None).is_err());
    }

    #[test]
    fn test_grammar_json() {
        let grammar = derived_types();
        let json = grammar.to_json().unwrap();
        let back = Grammar::from_json(&json).unwrap();
        assert_eq!(back.target_namespace.as_deref(), Some("urn:t"));
        assert_eq!(back.types.len(), 2);
        assert!(Grammar::from_json("{\"elements\": 3}").is_err());
    }
}
