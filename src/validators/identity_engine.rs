//! Identity constraint evaluation over the element stream
//!
//! Every element opens a context. Constraints declared on the element get a
//! fresh [`ValueStore`](super::value_stores::ValueStore) and a selector
//! matcher in that context. When a selector matches, one field matcher per
//! field is spawned with the selected element as its context node. Field
//! values come from attributes on the start tag and from the element's
//! value at its end tag.
//!
//! Leaving an element closes its context: unique and key stores are merged
//! into the scoped global map first, then keyrefs are checked against it.

use std::sync::Arc;

use crate::events::{Attributes, XmlName};
use crate::xpath::{IdentityPath, StepMatch, XPathMatcher};

use super::attributes::TypedAttribute;
use super::builtins::XsdValue;
use super::elements::XsdElement;
use super::exceptions::{ErrorCode, ErrorReporter};
use super::value_stores::{StoreId, ValueStoreCache};

#[derive(Debug)]
enum ActiveMatcher {
    Selector {
        matcher: XPathMatcher,
        fields: Vec<Arc<IdentityPath>>,
        store: StoreId,
    },
    Field {
        matcher: XPathMatcher,
        store: StoreId,
        field: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Context {
    matcher_base: usize,
    store_base: StoreId,
}

/// The start tag being processed, as seen by the matchers
#[derive(Debug, Clone, Copy)]
pub struct ElementEvent<'a> {
    /// Expanded name
    pub name: &'a XmlName,
    /// Raw name, for diagnostics
    pub raw: &'a str,
    /// Attributes, defaults included
    pub attributes: &'a Attributes,
    /// Typed values aligned with `attributes`
    pub typed: &'a [Option<TypedAttribute>],
    /// Governing declaration, if any
    pub decl: Option<&'a XsdElement>,
}

/// Active selector and field matchers plus the value stores they feed
#[derive(Debug, Default)]
pub struct IdentityEngine {
    matchers: Vec<ActiveMatcher>,
    contexts: Vec<Context>,
    cache: ValueStoreCache,
}

impl IdentityEngine {
    /// Create an idle engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state (start of a document)
    pub fn reset(&mut self) {
        self.matchers.clear();
        self.contexts.clear();
        self.cache.reset();
    }

    /// Number of open contexts
    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// Number of live selector and field matchers
    pub fn active_matchers(&self) -> usize {
        self.matchers.len()
    }

    /// The value store cache
    pub fn cache(&self) -> &ValueStoreCache {
        &self.cache
    }

    /// Open a context for an element and feed its start tag to every matcher
    pub fn start_element(&mut self, event: ElementEvent<'_>, reporter: &mut dyn ErrorReporter) {
        self.cache.start_element();
        self.contexts.push(Context {
            matcher_base: self.matchers.len(),
            store_base: self.cache.next_id(),
        });

        if let Some(decl) = event.decl {
            let ordered = decl
                .identities
                .iter()
                .filter(|i| !i.is_keyref())
                .chain(decl.identities.iter().filter(|i| i.is_keyref()));
            for identity in ordered {
                let Some(compiled) = identity.compiled() else {
                    continue;
                };
                let store = self
                    .cache
                    .create(Arc::clone(identity), decl.name.local_name.clone());
                self.matchers.push(ActiveMatcher::Selector {
                    matcher: XPathMatcher::new(Arc::clone(&compiled.selector)),
                    fields: compiled.fields.clone(),
                    store,
                });
            }
        }

        let count = self.matchers.len();
        for i in 0..count {
            match &mut self.matchers[i] {
                ActiveMatcher::Selector {
                    matcher,
                    fields,
                    store,
                } => {
                    if matcher.start_element(event.name, event.attributes).element {
                        let (fields, store) = (fields.clone(), *store);
                        self.select(store, fields, event, reporter);
                    }
                }
                ActiveMatcher::Field {
                    matcher,
                    store,
                    field,
                } => {
                    let step = matcher.start_element(event.name, event.attributes);
                    let (store, field) = (*store, *field);
                    self.field_matched(store, field, &step, event, reporter);
                }
            }
        }
    }

    fn select(
        &mut self,
        store: StoreId,
        fields: Vec<Arc<IdentityPath>>,
        event: ElementEvent<'_>,
        reporter: &mut dyn ErrorReporter,
    ) {
        if let Some(values) = self.cache.store_mut(store) {
            values.start_value_scope();
        }
        for (field, path) in fields.into_iter().enumerate() {
            let mut matcher = XPathMatcher::new(path);
            let step = matcher.start_element(event.name, event.attributes);
            self.field_matched(store, field, &step, event, reporter);
            self.matchers.push(ActiveMatcher::Field {
                matcher,
                store,
                field,
            });
        }
    }

    fn field_matched(
        &mut self,
        store: StoreId,
        field: usize,
        step: &StepMatch,
        event: ElementEvent<'_>,
        reporter: &mut dyn ErrorReporter,
    ) {
        let Some(values) = self.cache.store_mut(store) else {
            return;
        };
        for &index in &step.attributes {
            let value = match event.typed.get(index).and_then(Option::as_ref) {
                Some(typed) => Some(typed.value.clone()),
                None => event
                    .attributes
                    .get(index)
                    .map(|a| XsdValue::String(a.value.clone())),
            };
            if let Some(value) = value {
                values.add_value(field, value, event.raw, reporter);
            }
        }
        if step.element && values.identity().is_key() && event.decl.is_some_and(|d| d.nillable) {
            let constraint_element = values.element().to_string();
            reporter.report(ErrorCode::KeyMatchesNillable, event.raw, &[constraint_element]);
        }
    }

    /// Feed an end tag to every matcher and close the element's context
    ///
    /// `value` is the element's value, or `None` when it is nil.
    pub fn end_element(
        &mut self,
        value: Option<&XsdValue>,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) {
        let Self {
            matchers, cache, ..
        } = self;
        for active in matchers.iter_mut().rev() {
            match active {
                ActiveMatcher::Field {
                    matcher,
                    store,
                    field,
                } => {
                    if matcher.end_element() {
                        if let (Some(value), Some(values)) = (value, cache.store_mut(*store)) {
                            values.add_value(*field, value.clone(), element, reporter);
                        }
                    }
                }
                ActiveMatcher::Selector { matcher, store, .. } => {
                    if matcher.end_element() {
                        if let Some(values) = cache.store_mut(*store) {
                            values.end_value_scope(element, reporter);
                        }
                    }
                }
            }
        }

        if let Some(context) = self.contexts.pop() {
            self.matchers.truncate(context.matcher_base);
            let created = context.store_base..self.cache.next_id();
            for id in created.clone() {
                if self.cache.store(id).is_some_and(|s| !s.identity().is_keyref()) {
                    self.cache.transplant(id);
                }
            }
            for id in created {
                if self.cache.store(id).is_some_and(|s| s.identity().is_keyref()) {
                    self.cache.check_keyref(id, element, reporter);
                }
            }
            self.cache.truncate(context.store_base);
        }
        self.cache.end_element();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::exceptions::DiagnosticCollector;
    use crate::validators::identities::XsdIdentity;

    struct Driver {
        engine: IdentityEngine,
        reporter: DiagnosticCollector,
    }

    impl Driver {
        fn new() -> Self {
            Self {
                engine: IdentityEngine::new(),
                reporter: DiagnosticCollector::new(),
            }
        }

        fn start(&mut self, name: &str, attributes: Attributes, decl: Option<&XsdElement>) {
            let xml_name = XmlName::local(name);
            let typed = vec![None; attributes.len()];
            let event = ElementEvent {
                name: &xml_name,
                raw: name,
                attributes: &attributes,
                typed: &typed,
                decl,
            };
            self.engine.start_element(event, &mut self.reporter);
        }

        fn end(&mut self, name: &str, text: Option<&str>) {
            let value = text.map(|t| XsdValue::String(t.to_string()));
            self.engine.end_element(value.as_ref(), name, &mut self.reporter);
        }
    }

    fn declaring(identities: Vec<XsdIdentity>) -> XsdElement {
        identities
            .into_iter()
            .fold(XsdElement::new(QName::local("a")), |e, i| e.with_identity(i))
    }

    #[test]
    fn test_duplicate_key() {
        let a = declaring(vec![XsdIdentity::key(QName::local("k"), "b").with_field("@id")]);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        for _ in 0..2 {
            d.start("b", Attributes::new().with("id", "1"), None);
            d.end("b", Some(""));
        }
        d.end("a", None);
        assert_eq!(d.reporter.len(), 1);
        let diagnostic = &d.reporter.diagnostics()[0];
        assert_eq!(diagnostic.code, ErrorCode::DuplicateKey);
        assert_eq!(diagnostic.element, "b");
        assert_eq!(diagnostic.args, vec!["1".to_string(), "a".to_string()]);
        assert_eq!(d.engine.depth(), 0);
        assert_eq!(d.engine.active_matchers(), 0);
    }

    #[test]
    fn test_element_field_value_at_end() {
        let a = declaring(vec![XsdIdentity::unique(QName::local("u"), "b").with_field("c")]);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        for _ in 0..2 {
            d.start("b", Attributes::new(), None);
            d.start("c", Attributes::new(), None);
            d.end("c", Some("x"));
            d.end("b", Some(""));
        }
        d.end("a", None);
        assert_eq!(d.reporter.count(ErrorCode::DuplicateUnique), 1);
    }

    #[test]
    fn test_absent_key_field() {
        let a = declaring(vec![XsdIdentity::key(QName::local("k"), "b").with_field("@id")]);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        d.start("b", Attributes::new(), None);
        d.end("b", Some(""));
        d.end("a", None);
        assert!(d.reporter.has_code(ErrorCode::AbsentKeyValue));
    }

    #[test]
    fn test_keyref_on_same_element() {
        let a = declaring(vec![
            XsdIdentity::keyref(QName::local("r"), "ref", QName::local("k")).with_field("@to"),
            XsdIdentity::key(QName::local("k"), "b").with_field("@id"),
        ]);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        d.start("ref", Attributes::new().with("to", "1"), None);
        d.end("ref", Some(""));
        d.start("b", Attributes::new().with("id", "1"), None);
        d.end("b", Some(""));
        d.start("ref", Attributes::new().with("to", "2"), None);
        d.end("ref", Some(""));
        d.end("a", None);
        assert_eq!(d.reporter.len(), 1);
        assert_eq!(d.reporter.diagnostics()[0].code, ErrorCode::KeyNotFound);
        assert_eq!(d.reporter.diagnostics()[0].args[0], "2");
    }

    #[test]
    fn test_nil_element_contributes_no_value() {
        let a = declaring(vec![XsdIdentity::unique(QName::local("u"), "b").with_field(".")]);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        for _ in 0..2 {
            d.start("b", Attributes::new(), None);
            d.end("b", None);
        }
        d.end("a", None);
        assert!(d.reporter.is_empty());
    }

    #[test]
    fn test_key_matches_nillable() {
        let a = declaring(vec![XsdIdentity::key(QName::local("k"), "b").with_field(".")]);
        let b = XsdElement::new(QName::local("b")).with_nillable(true);
        let mut d = Driver::new();
        d.start("a", Attributes::new(), Some(&a));
        d.start("b", Attributes::new(), Some(&b));
        d.end("b", Some("v"));
        d.end("a", None);
        assert_eq!(d.reporter.count(ErrorCode::KeyMatchesNillable), 1);
    }
}
