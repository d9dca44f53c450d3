//! Property tests over arbitrary child sequences
//!
//! The validator is driven directly with events so the frame stack can be
//! inspected between them.

mod common;

use common::*;
use proptest::prelude::*;
use xmlschema_stream::validators::{ElementFrame, Occurs, XsdGroup};
use xmlschema_stream::{Attributes, DocumentHandler, Grammar, GrammarResolver, SchemaValidator, XmlName};

#[derive(Debug, Clone)]
struct Child {
    name: &'static str,
    text: Option<String>,
    grandchildren: usize,
}

fn child_strategy() -> impl Strategy<Value = Child> {
    (
        prop::sample::select(vec!["x", "y", "z"]),
        prop::option::of("[a-z0-9 ]{0,6}"),
        0usize..3,
    )
        .prop_map(|(name, text, grandchildren)| Child {
            name,
            text,
            grandchildren,
        })
}

fn resolver() -> GrammarResolver {
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(container(
        "r",
        XsdGroup::sequence(vec![
            particle(typed("x", "string")).with_occurs(Occurs::new(1, Some(3))),
            particle(typed("y", "int")).with_occurs(Occurs::optional()),
        ]),
    ));
    resolver_with(grammar)
}

fn snapshot(frame: &ElementFrame) -> (usize, bool, String, bool, String) {
    (
        frame.child_count,
        frame.saw_text,
        frame.text.clone(),
        frame.nil,
        format!("{:?}", frame.state),
    )
}

proptest! {
    #[test]
    fn test_parent_frame_restored_after_child(children in prop::collection::vec(child_strategy(), 0..8)) {
        let mut validator = SchemaValidator::new(resolver());
        validator.start_document().unwrap();
        validator.start_element(&XmlName::local("r"), &Attributes::new()).unwrap();

        for child in &children {
            let name = XmlName::local(child.name);
            validator.start_element(&name, &Attributes::new()).unwrap();
            let parent = snapshot(&validator.frames()[0]);
            let depth = validator.depth();

            if let Some(text) = &child.text {
                validator.characters(text).unwrap();
            }
            for _ in 0..child.grandchildren {
                let inner = XmlName::local("g");
                validator.start_element(&inner, &Attributes::new()).unwrap();
                validator.end_element(&inner).unwrap();
            }
            prop_assert_eq!(validator.depth(), depth);
            validator.end_element(&name).unwrap();

            prop_assert_eq!(validator.frames().len(), 1);
            prop_assert_eq!(snapshot(&validator.frames()[0]), parent);
            prop_assert!(!validator.is_skipping());
        }

        validator.end_element(&XmlName::local("r")).unwrap();
        validator.end_document().unwrap();
        prop_assert!(validator.frames().is_empty());
        prop_assert_eq!(validator.depth(), 0);
    }

    #[test]
    fn test_at_most_one_content_error(children in prop::collection::vec(child_strategy(), 0..8)) {
        let mut validator = SchemaValidator::new(resolver());
        validator.start_document().unwrap();
        validator.start_element(&XmlName::local("r"), &Attributes::new()).unwrap();
        for child in &children {
            let name = XmlName::local(child.name);
            validator.start_element(&name, &Attributes::new()).unwrap();
            validator.end_element(&name).unwrap();
        }
        validator.end_element(&XmlName::local("r")).unwrap();

        let content_errors = validator
            .reporter()
            .diagnostics()
            .iter()
            .filter(|d| {
                matches!(
                    d.code,
                    xmlschema_stream::ErrorCode::InvalidChild | xmlschema_stream::ErrorCode::IncompleteContent
                )
            })
            .count();
        prop_assert!(content_errors <= 1);
    }
}
