//! XPath Support for identity constraints
//!
//! ## Overview
//!
//! XSD identity constraints (xs:unique, xs:key, xs:keyref) locate nodes
//! with a restricted XPath subset. This module parses those expressions and
//! matches them incrementally against a stream of start/end tags, so no tree
//! is ever built.
//!
//! ## Limitations
//!
//! Only the identity-constraint grammar is supported: child and attribute
//! axes, a leading `.//`, `.` steps, name tests and `|` unions. Predicates,
//! functions and other axes are rejected at parse time.

mod matcher;
mod selectors;

pub use matcher::{StepMatch, XPathMatcher};
pub use selectors::{
    split_path, IdentityPath, LocationPath, NameTest, PathStep, PathStepKind,
};
