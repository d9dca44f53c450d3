//! Schema-location hints and JSON grammar files

mod common;

use std::fs;
use std::sync::Arc;

use common::*;
use tempfile::TempDir;
use xmlschema_stream::namespaces::QName;
use xmlschema_stream::validators::XsdElement;
use xmlschema_stream::{
    validate_file, ErrorCode, Grammar, GrammarResolver, JsonGrammarLoader, ValidatorConfig,
};

fn write_grammar(dir: &TempDir, file: &str, grammar: &Grammar) {
    fs::write(dir.path().join(file), grammar.to_json().unwrap()).unwrap();
}

fn loading_resolver() -> GrammarResolver {
    GrammarResolver::new().with_loader(Arc::new(JsonGrammarLoader::new()))
}

fn run(dir: &TempDir, xml: &str) -> Vec<ErrorCode> {
    let path = dir.path().join("doc.xml");
    fs::write(&path, xml).unwrap();
    let config = ValidatorConfig::default().with_base_dir(dir.path());
    codes(&validate_file(loading_resolver(), config, &path).unwrap())
}

#[test]
fn test_no_namespace_schema_location() {
    let dir = TempDir::new().unwrap();
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(typed("note", "int"));
    write_grammar(&dir, "note.json", &grammar);

    let valid = format!(r#"<note xmlns:xsi="{}" xsi:noNamespaceSchemaLocation="note.json">4</note>"#, XSI);
    assert!(run(&dir, &valid).is_empty());
    let invalid = format!(r#"<note xmlns:xsi="{}" xsi:noNamespaceSchemaLocation="note.json">four</note>"#, XSI);
    assert_eq!(run(&dir, &invalid), vec![ErrorCode::SimpleTypeValue]);
}

#[test]
fn test_schema_location_pairs() {
    let dir = TempDir::new().unwrap();
    let mut grammar = Grammar::new(Some("urn:orders"));
    grammar.add_element(XsdElement::typed(QName::namespaced("urn:orders", "order"), QName::xsd("date")));
    write_grammar(&dir, "orders.json", &grammar);

    let xml = format!(
        r#"<o:order xmlns:o="urn:orders" xmlns:xsi="{}" xsi:schemaLocation="urn:orders orders.json">2024-02-29</o:order>"#,
        XSI
    );
    assert!(run(&dir, &xml).is_empty());
}

#[test]
fn test_missing_grammar() {
    let dir = TempDir::new().unwrap();
    let xml = format!(r#"<note xmlns:xsi="{}" xsi:noNamespaceSchemaLocation="gone.json">4</note>"#, XSI);
    assert_eq!(run(&dir, &xml), vec![ErrorCode::SchemaLoad, ErrorCode::ElementNotDeclared]);
}

#[test]
fn test_namespace_mismatch() {
    let dir = TempDir::new().unwrap();
    let mut grammar = Grammar::new(Some("urn:other"));
    grammar.add_element(XsdElement::typed(QName::namespaced("urn:other", "note"), QName::xsd("int")));
    write_grammar(&dir, "other.json", &grammar);

    let xml = format!(r#"<note xmlns:xsi="{}" xsi:noNamespaceSchemaLocation="other.json">4</note>"#, XSI);
    assert_eq!(run(&dir, &xml), vec![ErrorCode::SchemaLoad, ErrorCode::ElementNotDeclared]);
}

#[test]
fn test_hints_ignored_when_disabled() {
    let dir = TempDir::new().unwrap();
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(typed("note", "int"));
    write_grammar(&dir, "note.json", &grammar);

    let path = dir.path().join("doc.xml");
    let xml = format!(r#"<note xmlns:xsi="{}" xsi:noNamespaceSchemaLocation="note.json">4</note>"#, XSI);
    fs::write(&path, xml).unwrap();
    let config = ValidatorConfig::default()
        .with_base_dir(dir.path())
        .with_schema_locations(false);
    let diagnostics = validate_file(loading_resolver(), config, &path).unwrap();
    assert_eq!(codes(&diagnostics), vec![ErrorCode::ElementNotDeclared]);
}
