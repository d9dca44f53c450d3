//! Grammar builders and helpers shared by the integration tests

#![allow(dead_code)]

use std::fmt::Write;
use std::sync::Arc;

use xmlschema_stream::events::Event;
use xmlschema_stream::namespaces::QName;
use xmlschema_stream::validators::{
    AttributeUse, ComplexTypeBuilder, ErrorCode, GroupParticle, Occurs, ValueConstraint,
    XsdAttribute, XsdElement, XsdGroup,
};
use xmlschema_stream::{Diagnostic, Grammar, GrammarResolver};

pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Resolver holding `grammar` next to the built-in types
pub fn resolver_with(grammar: Grammar) -> GrammarResolver {
    let mut resolver = GrammarResolver::new();
    resolver.put_grammar(grammar);
    resolver
}

/// Validate and collect the findings; panics on malformed input
pub fn validate(resolver: &GrammarResolver, xml: &str) -> Vec<Diagnostic> {
    xmlschema_stream::validate_str(resolver.clone(), xml).unwrap()
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

/// Optional attribute of a built-in type
pub fn attribute(name: &str, type_name: &str) -> AttributeUse {
    AttributeUse::optional(XsdAttribute::new(QName::local(name)).with_type_name(QName::xsd(type_name)))
}

/// Optional attribute with a default value
pub fn defaulted_attribute(name: &str, type_name: &str, default: &str) -> AttributeUse {
    attribute(name, type_name).with_value_constraint(ValueConstraint::Default(default.to_string()))
}

/// Local element of a built-in type
pub fn typed(name: &str, type_name: &str) -> XsdElement {
    XsdElement::typed(QName::local(name), QName::xsd(type_name))
}

/// Local element with empty content and the given attributes
pub fn empty_with(name: &str, attributes: Vec<AttributeUse>) -> XsdElement {
    let complex = attributes
        .into_iter()
        .fold(ComplexTypeBuilder::new(), |builder, a| builder.attribute(a))
        .build();
    XsdElement::complex(QName::local(name), complex)
}

pub fn particle(decl: XsdElement) -> GroupParticle {
    GroupParticle::element(Arc::new(decl))
}

pub fn repeated(decl: XsdElement) -> GroupParticle {
    particle(decl).with_occurs(Occurs::zero_or_more())
}

/// Element-only element with content `group`
pub fn container(name: &str, group: XsdGroup) -> XsdElement {
    XsdElement::complex(QName::local(name), ComplexTypeBuilder::new().content_group(group).build())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write recorded element and text events back as markup
pub fn serialize(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            Event::StartElement(name, attributes) => {
                out.push('<');
                out.push_str(&name.raw());
                for attribute in attributes {
                    let _ = write!(out, " {}=\"{}\"", attribute.name.raw(), escape(&attribute.value));
                }
                out.push('>');
            }
            Event::Characters(text) => out.push_str(&escape(text)),
            Event::EndElement(name) => {
                let _ = write!(out, "</{}>", name.raw());
            }
            _ => {}
        }
    }
    out
}
