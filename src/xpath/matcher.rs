//! Streaming matcher for identity-constraint paths
//!
//! A matcher is activated on a context element and then fed every start and
//! end tag below it. Each open element keeps, per union alternative, the set
//! of step positions reached so far; a path matches an element when its last
//! step is reached and an attribute when every step before a final
//! attribute step is reached.

use std::sync::Arc;

use crate::events::{Attributes, XmlName};

use super::selectors::{IdentityPath, LocationPath, PathStepKind};

/// What matched on one start tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMatch {
    /// The element itself matched
    pub element: bool,
    /// Indexes of matched attributes
    pub attributes: Vec<usize>,
}

impl StepMatch {
    /// True when nothing matched
    pub fn is_empty(&self) -> bool {
        !self.element && self.attributes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Level {
    states: Vec<Vec<usize>>,
    matched: bool,
}

/// Tracks one selector or field expression over the event stream
#[derive(Debug, Clone)]
pub struct XPathMatcher {
    path: Arc<IdentityPath>,
    levels: Vec<Level>,
}

impl XPathMatcher {
    /// Create a matcher; the first start tag it sees is the context node
    pub fn new(path: Arc<IdentityPath>) -> Self {
        Self {
            path,
            levels: Vec::new(),
        }
    }

    /// The expression being matched
    pub fn path(&self) -> &IdentityPath {
        &self.path
    }

    /// Number of open elements since activation
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Advance over a start tag
    pub fn start_element(&mut self, name: &XmlName, attributes: &Attributes) -> StepMatch {
        let states: Vec<Vec<usize>> = match self.levels.last() {
            None => self
                .path
                .paths
                .iter()
                .map(|p| closure(p, vec![0]))
                .collect(),
            Some(parent) => self
                .path
                .paths
                .iter()
                .zip(&parent.states)
                .map(|(p, reached)| {
                    let mut next = Vec::new();
                    for &s in reached {
                        if s == 0 && p.descendant {
                            next.push(0);
                        }
                        if let Some(step) = p.steps.get(s) {
                            if step.kind == PathStepKind::Child
                                && step.test.matches(name.namespace(), &name.local_name)
                            {
                                next.push(s + 1);
                            }
                        }
                    }
                    closure(p, next)
                })
                .collect(),
        };

        let mut result = StepMatch::default();
        for (p, reached) in self.path.paths.iter().zip(&states) {
            if reached.contains(&p.steps.len()) {
                result.element = true;
            }
            if let Some(test) = p.attribute_test() {
                if reached.contains(&(p.steps.len() - 1)) {
                    for (i, attr) in attributes.iter().enumerate() {
                        if test.matches(attr.name.namespace(), &attr.name.local_name)
                            && !result.attributes.contains(&i)
                        {
                            result.attributes.push(i);
                        }
                    }
                }
            }
        }

        self.levels.push(Level {
            states,
            matched: result.element,
        });
        result
    }

    /// Leave the innermost element; returns whether it matched as an element
    pub fn end_element(&mut self) -> bool {
        self.levels.pop().map(|l| l.matched).unwrap_or(false)
    }
}

fn closure(path: &LocationPath, mut states: Vec<usize>) -> Vec<usize> {
    let mut i = 0;
    while i < states.len() {
        let s = states[i];
        if let Some(step) = path.steps.get(s) {
            if step.kind == PathStepKind::Self_ && !states.contains(&(s + 1)) {
                states.push(s + 1);
            }
        }
        i += 1;
    }
    states.sort_unstable();
    states.dedup();
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;

    fn selector(xpath: &str) -> XPathMatcher {
        let path = IdentityPath::parse_selector(xpath, &NamespaceContext::new()).unwrap();
        XPathMatcher::new(Arc::new(path))
    }

    fn field(xpath: &str) -> XPathMatcher {
        let path = IdentityPath::parse_field(xpath, &NamespaceContext::new()).unwrap();
        XPathMatcher::new(Arc::new(path))
    }

    fn start(m: &mut XPathMatcher, name: &str) -> bool {
        m.start_element(&XmlName::local(name), &Attributes::new()).element
    }

    #[test]
    fn test_child_path() {
        let mut m = selector("b");
        assert!(!start(&mut m, "a"));
        assert!(start(&mut m, "b"));
        assert!(!start(&mut m, "b"));
        assert!(!m.end_element());
        assert!(m.end_element());
        assert!(!start(&mut m, "c"));
        m.end_element();
        assert_eq!(m.depth(), 1);
    }

    #[test]
    fn test_descendant_path() {
        let mut m = selector(".//b");
        assert!(!start(&mut m, "a"));
        assert!(!start(&mut m, "c"));
        assert!(start(&mut m, "b"));
        assert!(start(&mut m, "b"));
    }

    #[test]
    fn test_self_path() {
        let mut m = field(".");
        assert!(start(&mut m, "a"));
        assert!(!start(&mut m, "a"));
    }

    #[test]
    fn test_union_and_wildcard() {
        let mut m = selector("x/* | y");
        start(&mut m, "root");
        assert!(start(&mut m, "y"));
        m.end_element();
        assert!(!start(&mut m, "x"));
        assert!(start(&mut m, "anything"));
    }

    #[test]
    fn test_attribute_field() {
        let mut m = field("@id");
        let attrs = Attributes::new().with("name", "n").with("id", "7");
        let result = m.start_element(&XmlName::local("b"), &attrs);
        assert!(!result.element);
        assert_eq!(result.attributes, vec![1]);

        let mut m = field("c/@id");
        assert!(m.start_element(&XmlName::local("b"), &attrs).is_empty());
        assert_eq!(m.start_element(&XmlName::local("c"), &attrs).attributes, vec![1]);
    }
}
