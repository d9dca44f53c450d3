//! Per-document validation state
//!
//! ID values must be unique within a document and every IDREF must name one
//! of them. IDs are recorded as they are validated; IDREFs are checked once
//! the root element has ended.

use indexmap::IndexSet;
use std::collections::HashSet;

/// ID/IDREF bookkeeping for one validation run
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    ids: HashSet<String>,
    idrefs: IndexSet<String>,
}

impl ValidationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything (start of a new document)
    pub fn reset(&mut self) {
        self.ids.clear();
        self.idrefs.clear();
    }

    /// Record an ID; returns false if it was already declared
    pub fn add_id(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    /// Check if an ID has been declared
    pub fn is_id_declared(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an IDREF for the end-of-document check
    pub fn add_idref(&mut self, idref: &str) {
        self.idrefs.insert(idref.to_string());
    }

    /// IDREFs that name no declared ID, in first-seen order
    pub fn unresolved_idrefs(&self) -> Vec<String> {
        self.idrefs
            .iter()
            .filter(|r| !self.ids.contains(*r))
            .cloned()
            .collect()
    }

    /// Number of declared IDs
    pub fn id_count(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_id() {
        let mut state = ValidationState::new();
        assert!(state.add_id("a"));
        assert!(!state.add_id("a"));
        assert_eq!(state.id_count(), 1);
    }

    #[test]
    fn test_unresolved_idrefs_in_order() {
        let mut state = ValidationState::new();
        state.add_idref("z");
        state.add_idref("a");
        state.add_idref("z");
        state.add_id("a");
        assert_eq!(state.unresolved_idrefs(), vec!["z".to_string()]);
        state.reset();
        assert!(state.unresolved_idrefs().is_empty());
        assert!(!state.is_id_declared("a"));
    }
}
