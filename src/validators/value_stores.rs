//! Identity constraint value stores
//!
//! A [`ValueStore`] collects the field tuples of one identity constraint for
//! one occurrence of the element that declares it. When that element ends,
//! unique and key stores are merged into the cache's global map, where key
//! references look them up.
//!
//! The global map is scoped by element nesting: each element start saves the
//! current map and starts an empty one; each element end folds the saved map
//! back in. A keyref checked at an element end therefore sees the tables of
//! its own subtree plus those of the preceding siblings of its element.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::namespaces::QName;

use super::builtins::XsdValue;
use super::exceptions::{ErrorCode, ErrorReporter};
use super::identities::{IdentityConstraintKind, XsdIdentity};

/// Index of a store in the cache
pub type StoreId = usize;

/// One value per field, in field declaration order
pub type Tuple = Vec<XsdValue>;

/// Render a tuple for diagnostics
pub fn tuple_to_string(tuple: &[XsdValue]) -> String {
    tuple
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Ordered set of tuples compared in the value space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TupleSet {
    tuples: Vec<Tuple>,
}

impl TupleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Check membership
    pub fn contains(&self, tuple: &[XsdValue]) -> bool {
        self.tuples.iter().any(|t| t.as_slice() == tuple)
    }

    /// Insert; returns false when an equal tuple is already present
    pub fn insert(&mut self, tuple: Tuple) -> bool {
        if self.contains(&tuple) {
            return false;
        }
        self.tuples.push(tuple);
        true
    }

    /// Append every tuple of `other` not already present
    pub fn merge(&mut self, other: TupleSet) {
        for tuple in other.tuples {
            self.insert(tuple);
        }
    }

    /// Number of tuples
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }
}

/// Field tuples of one constraint within one scope
#[derive(Debug, Clone)]
pub struct ValueStore {
    identity: Arc<XsdIdentity>,
    element: String,
    current: Vec<Option<XsdValue>>,
    assigned: usize,
    tuples: TupleSet,
    keyref_tuples: Vec<Tuple>,
}

impl ValueStore {
    /// Create a store for `identity` declared on element `element`
    pub fn new(identity: Arc<XsdIdentity>, element: impl Into<String>) -> Self {
        let field_count = identity.fields.len();
        Self {
            identity,
            element: element.into(),
            current: vec![None; field_count],
            assigned: 0,
            tuples: TupleSet::new(),
            keyref_tuples: Vec::new(),
        }
    }

    /// The constraint
    pub fn identity(&self) -> &Arc<XsdIdentity> {
        &self.identity
    }

    /// Name of the element declaring the constraint
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Completed unique/key tuples
    pub fn tuples(&self) -> &TupleSet {
        &self.tuples
    }

    /// Completed keyref tuples, duplicates included
    pub fn keyref_tuples(&self) -> &[Tuple] {
        &self.keyref_tuples
    }

    /// Start a new tuple (the selector matched an element)
    pub fn start_value_scope(&mut self) {
        self.current.iter_mut().for_each(|v| *v = None);
        self.assigned = 0;
    }

    /// Assign a field of the tuple in progress
    pub fn add_value(
        &mut self,
        field: usize,
        value: XsdValue,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) {
        let xpath = match self.identity.fields.get(field) {
            Some(xpath) => xpath.clone(),
            None => {
                reporter.report(ErrorCode::UnknownField, element, &[field.to_string()]);
                return;
            }
        };
        if self.current[field].is_some() {
            reporter.report(ErrorCode::FieldMultipleMatch, element, &[xpath]);
            return;
        }
        self.current[field] = Some(value);
        self.assigned += 1;
        if self.assigned == self.current.len() {
            let tuple: Tuple = self.current.iter().flatten().cloned().collect();
            self.complete(tuple, element, reporter);
        }
    }

    fn complete(&mut self, tuple: Tuple, element: &str, reporter: &mut dyn ErrorReporter) {
        let code = match self.identity.kind {
            IdentityConstraintKind::KeyRef => {
                self.keyref_tuples.push(tuple);
                return;
            }
            IdentityConstraintKind::Unique => ErrorCode::DuplicateUnique,
            IdentityConstraintKind::Key => ErrorCode::DuplicateKey,
        };
        if self.tuples.contains(&tuple) {
            reporter.report(code, element, &[tuple_to_string(&tuple), self.element.clone()]);
        } else {
            self.tuples.insert(tuple);
        }
    }

    /// End the tuple in progress (the selected element ended)
    pub fn end_value_scope(&mut self, element: &str, reporter: &mut dyn ErrorReporter) {
        if self.assigned == 0 {
            if self.identity.is_key() {
                reporter.report(ErrorCode::AbsentKeyValue, element, &[self.element.clone()]);
            }
            return;
        }
        if self.assigned == self.current.len() {
            return;
        }
        match self.identity.kind {
            IdentityConstraintKind::Unique => reporter.report(
                ErrorCode::UniqueNotEnoughValues,
                element,
                &[self.element.clone()],
            ),
            IdentityConstraintKind::Key => reporter.report(
                ErrorCode::KeyNotEnoughValues,
                element,
                &[self.element.clone(), self.identity.name.local_name.clone()],
            ),
            IdentityConstraintKind::KeyRef => reporter.report(
                ErrorCode::KeyRefNotEnoughValues,
                element,
                &[
                    self.element.clone(),
                    self.identity
                        .refer
                        .as_ref()
                        .map(|r| r.local_name.clone())
                        .unwrap_or_default(),
                ],
            ),
        }
    }
}

/// Per-run registry of value stores and the scoped global key tables
#[derive(Debug, Default)]
pub struct ValueStoreCache {
    stores: Vec<ValueStore>,
    global: IndexMap<QName, TupleSet>,
    saved: Vec<IndexMap<QName, TupleSet>>,
}

impl ValueStoreCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything (start of a document)
    pub fn reset(&mut self) {
        self.stores.clear();
        self.global.clear();
        self.saved.clear();
    }

    /// Save the global map and start an empty one for a new element
    pub fn start_element(&mut self) {
        self.saved.push(std::mem::take(&mut self.global));
    }

    /// Fold the map saved at the element's start back into the global map
    pub fn end_element(&mut self) {
        if let Some(saved) = self.saved.pop() {
            for (name, tuples) in saved {
                self.global.entry(name).or_default().merge(tuples);
            }
        }
    }

    /// Identifier the next created store will get
    pub fn next_id(&self) -> StoreId {
        self.stores.len()
    }

    /// Create a store for a newly activated constraint
    pub fn create(&mut self, identity: Arc<XsdIdentity>, element: impl Into<String>) -> StoreId {
        self.stores.push(ValueStore::new(identity, element));
        self.stores.len() - 1
    }

    /// Store by id
    pub fn store(&self, id: StoreId) -> Option<&ValueStore> {
        self.stores.get(id)
    }

    /// Mutable store by id
    pub fn store_mut(&mut self, id: StoreId) -> Option<&mut ValueStore> {
        self.stores.get_mut(id)
    }

    /// Drop the stores created since `base`
    pub fn truncate(&mut self, base: StoreId) {
        self.stores.truncate(base);
    }

    /// Tuples of a constraint in the current global map
    pub fn global_tuples(&self, name: &QName) -> Option<&TupleSet> {
        self.global.get(name)
    }

    /// Merge a unique/key store into the global map
    pub fn transplant(&mut self, id: StoreId) {
        if let Some(store) = self.stores.get(id) {
            log::trace!("transplant {} tuples of {}", store.tuples.len(), store.identity.name);
            self.global
                .entry(store.identity.name.clone())
                .or_default()
                .merge(store.tuples.clone());
        }
    }

    /// Check every tuple of a keyref store against its referenced key
    pub fn check_keyref(&self, id: StoreId, element: &str, reporter: &mut dyn ErrorReporter) {
        let Some(store) = self.stores.get(id) else {
            return;
        };
        let Some(refer) = store.identity.refer.as_ref() else {
            return;
        };
        let own = self.global.get(refer);
        let siblings = self.saved.last().and_then(|m| m.get(refer));
        if own.is_none() && siblings.is_none() {
            reporter.report(
                ErrorCode::KeyRefOutOfScope,
                element,
                &[store.identity.name.local_name.clone()],
            );
            return;
        }
        for tuple in &store.keyref_tuples {
            let found = own.is_some_and(|t| t.contains(tuple))
                || siblings.is_some_and(|t| t.contains(tuple));
            if !found {
                reporter.report(
                    ErrorCode::KeyNotFound,
                    element,
                    &[tuple_to_string(tuple), store.element.clone()],
                );
            }
        }
    }
}
