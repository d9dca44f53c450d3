//! Identity constraint integration tests
//!
//! xs:unique, xs:key and xs:keyref evaluated over parsed instances.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use xmlschema_stream::namespaces::QName;
use xmlschema_stream::validators::{ErrorCode, XsdGroup, XsdIdentity};
use xmlschema_stream::Grammar;

fn catalog_grammar(id_type: &str, identity: XsdIdentity) -> Grammar {
    let mut grammar = Grammar::new(None::<String>);
    let item = empty_with("item", vec![attribute("id", id_type), attribute("alt", "string")]);
    grammar.add_element(
        container("catalog", XsdGroup::sequence(vec![repeated(item)])).with_identity(identity),
    );
    grammar
}

fn item_key() -> XsdIdentity {
    XsdIdentity::key(QName::local("itemKey"), "item").with_field("@id")
}

#[test]
fn test_duplicate_key() {
    let resolver = resolver_with(catalog_grammar("string", item_key()));
    let diagnostics = validate(&resolver, r#"<catalog><item id="1"/><item id="1"/></catalog>"#);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::DuplicateKey);
    assert_eq!(diagnostics[0].element, "item");
    assert_eq!(diagnostics[0].args, vec!["1".to_string(), "catalog".to_string()]);
}

#[test]
fn test_key_compares_values() {
    let resolver = resolver_with(catalog_grammar("int", item_key()));
    let diagnostics = validate(&resolver, r#"<catalog><item id="1"/><item id="01"/></catalog>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::DuplicateKey]);

    let resolver = resolver_with(catalog_grammar("string", item_key()));
    assert!(validate(&resolver, r#"<catalog><item id="1"/><item id="01"/></catalog>"#).is_empty());
}

#[test]
fn test_absent_key_field() {
    let resolver = resolver_with(catalog_grammar("string", item_key()));
    let diagnostics = validate(&resolver, r#"<catalog><item id="1"/><item/></catalog>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::AbsentKeyValue]);
}

#[test]
fn test_unique_allows_absent_fields() {
    let unique = XsdIdentity::unique(QName::local("u"), "item").with_field("@id");
    let resolver = resolver_with(catalog_grammar("string", unique));
    assert!(validate(&resolver, r#"<catalog><item/><item/><item id="a"/></catalog>"#).is_empty());
}

#[test]
fn test_multi_field_key() {
    let key = XsdIdentity::key(QName::local("pair"), "item")
        .with_field("@id")
        .with_field("@alt");
    let resolver = resolver_with(catalog_grammar("string", key));
    let xml = r#"<catalog><item id="1" alt="a"/><item id="1" alt="b"/><item id="1" alt="a"/></catalog>"#;
    let diagnostics = validate(&resolver, xml);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::DuplicateKey]);
    assert_eq!(diagnostics[0].args[0], "1,a");

    let diagnostics = validate(&resolver, r#"<catalog><item id="1"/></catalog>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::KeyNotEnoughValues]);
}

#[test]
fn test_element_value_field() {
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(
        container("names", XsdGroup::sequence(vec![repeated(typed("name", "token"))]))
            .with_identity(XsdIdentity::unique(QName::local("u"), "name").with_field(".")),
    );
    let resolver = resolver_with(grammar);
    assert!(validate(&resolver, "<names><name>a</name><name>b</name></names>").is_empty());
    let diagnostics = validate(&resolver, "<names><name>a</name><name> a </name></names>");
    assert_eq!(codes(&diagnostics), vec![ErrorCode::DuplicateUnique]);
}

// ============================================================================
// Keyref scoping
// ============================================================================

fn scoped_grammar() -> Grammar {
    let mut grammar = Grammar::new(None::<String>);
    let keys = container(
        "keys",
        XsdGroup::sequence(vec![repeated(empty_with("key", vec![attribute("id", "string")]))]),
    )
    .with_identity(XsdIdentity::key(QName::local("k"), "key").with_field("@id"));
    let refs = container(
        "refs",
        XsdGroup::sequence(vec![repeated(empty_with("ref", vec![attribute("to", "string")]))]),
    )
    .with_identity(XsdIdentity::keyref(QName::local("r"), "ref", QName::local("k")).with_field("@to"));
    grammar.add_element(container(
        "doc",
        XsdGroup::choice(vec![particle(keys), particle(refs)])
            .with_occurs(xmlschema_stream::validators::Occurs::zero_or_more()),
    ));
    grammar
}

#[test]
fn test_keyref_to_preceding_sibling() {
    let resolver = resolver_with(scoped_grammar());
    let xml = r#"<doc><keys><key id="a"/><key id="b"/></keys><refs><ref to="b"/><ref to="a"/></refs></doc>"#;
    assert!(validate(&resolver, xml).is_empty());
}

#[test]
fn test_keyref_value_missing() {
    let resolver = resolver_with(scoped_grammar());
    let xml = r#"<doc><keys><key id="a"/></keys><refs><ref to="z"/></refs></doc>"#;
    let diagnostics = validate(&resolver, xml);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::KeyNotFound]);
    assert_eq!(diagnostics[0].args, vec!["z".to_string(), "refs".to_string()]);
}

#[test]
fn test_keyref_to_following_sibling() {
    let resolver = resolver_with(scoped_grammar());
    let xml = r#"<doc><refs><ref to="a"/></refs><keys><key id="a"/></keys></doc>"#;
    let diagnostics = validate(&resolver, xml);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::KeyRefOutOfScope]);
    assert_eq!(diagnostics[0].args, vec!["r".to_string()]);
}

#[test]
fn test_keyref_within_same_element() {
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(
        container(
            "doc",
            XsdGroup::sequence(vec![
                repeated(empty_with("ref", vec![attribute("to", "int")])),
                repeated(empty_with("key", vec![attribute("id", "int")])),
            ]),
        )
        .with_identity(XsdIdentity::keyref(QName::local("r"), "ref", QName::local("k")).with_field("@to"))
        .with_identity(XsdIdentity::key(QName::local("k"), "key").with_field("@id")),
    );
    let resolver = resolver_with(grammar);
    assert!(validate(&resolver, r#"<doc><ref to="01"/><key id="1"/></doc>"#).is_empty());
    let diagnostics = validate(&resolver, r#"<doc><ref to="2"/><key id="1"/></doc>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::KeyNotFound]);
}

// ============================================================================
// Incomplete tuples
// ============================================================================

#[test]
fn test_unique_with_partial_tuple() {
    let unique = XsdIdentity::unique(QName::local("u"), "item")
        .with_field("@id")
        .with_field("@alt");
    let resolver = resolver_with(catalog_grammar("string", unique));
    assert!(validate(&resolver, r#"<catalog><item/><item id="1" alt="a"/></catalog>"#).is_empty());
    let diagnostics = validate(&resolver, r#"<catalog><item id="1"/></catalog>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::UniqueNotEnoughValues]);
    assert_eq!(diagnostics[0].element, "item");
}

#[test]
fn test_keyref_with_partial_tuple() {
    let mut grammar = Grammar::new(None::<String>);
    grammar.add_element(
        container(
            "doc",
            XsdGroup::sequence(vec![
                repeated(empty_with("key", vec![attribute("id", "string"), attribute("alt", "string")])),
                repeated(empty_with("ref", vec![attribute("to", "string"), attribute("alt", "string")])),
            ]),
        )
        .with_identity(
            XsdIdentity::key(QName::local("k"), "key")
                .with_field("@id")
                .with_field("@alt"),
        )
        .with_identity(
            XsdIdentity::keyref(QName::local("r"), "ref", QName::local("k"))
                .with_field("@to")
                .with_field("@alt"),
        ),
    );
    let resolver = resolver_with(grammar);
    let xml = r#"<doc><key id="1" alt="a"/><ref to="1" alt="a"/></doc>"#;
    assert!(validate(&resolver, xml).is_empty());
    let diagnostics = validate(&resolver, r#"<doc><key id="1" alt="a"/><ref to="1"/></doc>"#);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::KeyRefNotEnoughValues]);
    assert_eq!(diagnostics[0].element, "ref");
}
