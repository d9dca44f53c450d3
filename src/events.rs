//! Streaming document events
//!
//! The validator sits between an upstream producer (see [`crate::reader`]) and a
//! downstream consumer. Both sides speak [`DocumentHandler`]: implement the
//! callbacks you care about, every method has a no-op default.

use crate::error::Result;
use crate::namespaces::QName;
use std::fmt;

/// A namespace-resolved element or attribute name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName {
    /// Prefix as written in the document
    pub prefix: Option<String>,
    /// Local part
    pub local_name: String,
    /// Namespace URI bound to the prefix (or the default namespace for elements)
    pub namespace: Option<String>,
}

impl XmlName {
    /// A name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: local_name.into(),
            namespace: None,
        }
    }

    /// A namespaced name
    pub fn new(
        prefix: Option<impl Into<String>>,
        local_name: impl Into<String>,
        namespace: Option<impl Into<String>>,
    ) -> Self {
        Self {
            prefix: prefix.map(Into::into),
            local_name: local_name.into(),
            namespace: namespace.map(Into::into),
        }
    }

    /// The expanded name
    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone(), self.local_name.clone())
    }

    /// Namespace URI, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The name as written (`prefix:local`)
    pub fn raw(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.local_name),
            _ => self.local_name.clone(),
        }
    }

    /// Check namespace and local name
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace() == namespace
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// One attribute of a start tag
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub name: XmlName,
    /// Attribute value (entity-expanded)
    pub value: String,
    /// False when the attribute was inserted from a schema default
    pub specified: bool,
}

impl Attribute {
    /// An attribute present in the instance
    pub fn new(name: XmlName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            specified: true,
        }
    }

    /// An attribute synthesized from a default or fixed value
    pub fn defaulted(name: XmlName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            specified: false,
        }
    }
}

/// Ordered attribute list of a start tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// An empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute
    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    /// Builder-style append of an unprefixed attribute
    pub fn with(mut self, local_name: &str, value: &str) -> Self {
        self.push(Attribute::new(XmlName::local(local_name), value));
        self
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in document order
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    /// Attribute at `index`
    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.0.get(index)
    }

    /// Index of the attribute with the given expanded name
    pub fn position(&self, namespace: Option<&str>, local_name: &str) -> Option<usize> {
        self.0.iter().position(|a| a.name.matches(namespace, local_name))
    }

    /// Value of the attribute with the given expanded name
    pub fn value(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.position(namespace, local_name)
            .map(|i| self.0[i].value.as_str())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Receiver of document events
///
/// Every callback may fail; an `Err` stops the producer.
#[allow(unused_variables)]
pub trait DocumentHandler {
    /// Start of the document, before any other event
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// The XML declaration
    fn xml_decl(
        &mut self,
        version: &str,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    /// The document type declaration, verbatim
    fn doctype(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// A prefix binding comes into scope (before the element that declares it)
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        Ok(())
    }

    /// A prefix binding goes out of scope (after the element that declared it)
    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
        Ok(())
    }

    /// An element start tag
    fn start_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    /// A self-closing element
    fn empty_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        self.start_element(name, attributes)?;
        self.end_element(name)
    }

    /// Character data
    fn characters(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// An element end tag
    fn end_element(&mut self, name: &XmlName) -> Result<()> {
        Ok(())
    }

    /// A comment
    fn comment(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// A processing instruction
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        Ok(())
    }

    /// Start of a CDATA section; its text arrives through `characters`
    fn start_cdata(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of a CDATA section
    fn end_cdata(&mut self) -> Result<()> {
        Ok(())
    }

    /// Start of a general entity expansion
    fn start_entity(&mut self, name: &str) -> Result<()> {
        Ok(())
    }

    /// End of a general entity expansion
    fn end_entity(&mut self, name: &str) -> Result<()> {
        Ok(())
    }

    /// End of the document, after all other events
    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A handler that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl DocumentHandler for NullHandler {}

impl<H: DocumentHandler + ?Sized> DocumentHandler for &mut H {
    fn start_document(&mut self) -> Result<()> {
        (**self).start_document()
    }
    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<&str>) -> Result<()> {
        (**self).xml_decl(version, encoding, standalone)
    }
    fn doctype(&mut self, text: &str) -> Result<()> {
        (**self).doctype(text)
    }
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        (**self).start_prefix_mapping(prefix, uri)
    }
    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
        (**self).end_prefix_mapping(prefix)
    }
    fn start_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        (**self).start_element(name, attributes)
    }
    fn empty_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        (**self).empty_element(name, attributes)
    }
    fn characters(&mut self, text: &str) -> Result<()> {
        (**self).characters(text)
    }
    fn end_element(&mut self, name: &XmlName) -> Result<()> {
        (**self).end_element(name)
    }
    fn comment(&mut self, text: &str) -> Result<()> {
        (**self).comment(text)
    }
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        (**self).processing_instruction(target, data)
    }
    fn start_cdata(&mut self) -> Result<()> {
        (**self).start_cdata()
    }
    fn end_cdata(&mut self) -> Result<()> {
        (**self).end_cdata()
    }
    fn start_entity(&mut self, name: &str) -> Result<()> {
        (**self).start_entity(name)
    }
    fn end_entity(&mut self, name: &str) -> Result<()> {
        (**self).end_entity(name)
    }
    fn end_document(&mut self) -> Result<()> {
        (**self).end_document()
    }
}

/// A recorded event, as seen by [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Document start
    StartDocument,
    /// XML declaration (version, encoding, standalone)
    XmlDecl(String, Option<String>, Option<String>),
    /// Doctype text
    Doctype(String),
    /// Prefix binding start (prefix, uri)
    StartPrefixMapping(String, String),
    /// Prefix binding end
    EndPrefixMapping(String),
    /// Start tag
    StartElement(XmlName, Attributes),
    /// Character data
    Characters(String),
    /// End tag
    EndElement(XmlName),
    /// Comment
    Comment(String),
    /// Processing instruction (target, data)
    ProcessingInstruction(String, Option<String>),
    /// CDATA start
    StartCdata,
    /// CDATA end
    EndCdata,
    /// Entity start
    StartEntity(String),
    /// Entity end
    EndEntity(String),
    /// Document end
    EndDocument,
}

/// A handler that stores every event it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    /// Events in arrival order
    pub events: Vec<Event>,
}

impl RecordingHandler {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated character data of the whole document
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Characters(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Attributes of the n-th start tag
    pub fn attributes_of(&self, index: usize) -> Option<&Attributes> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StartElement(_, attrs) => Some(attrs),
                _ => None,
            })
            .nth(index)
    }
}

impl DocumentHandler for RecordingHandler {
    fn start_document(&mut self) -> Result<()> {
        self.events.push(Event::StartDocument);
        Ok(())
    }
    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<&str>) -> Result<()> {
        self.events.push(Event::XmlDecl(
            version.to_string(),
            encoding.map(String::from),
            standalone.map(String::from),
        ));
        Ok(())
    }
    fn doctype(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Doctype(text.to_string()));
        Ok(())
    }
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.events
            .push(Event::StartPrefixMapping(prefix.to_string(), uri.to_string()));
        Ok(())
    }
    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
        self.events.push(Event::EndPrefixMapping(prefix.to_string()));
        Ok(())
    }
    fn start_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        self.events
            .push(Event::StartElement(name.clone(), attributes.clone()));
        Ok(())
    }
    fn characters(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Characters(text.to_string()));
        Ok(())
    }
    fn end_element(&mut self, name: &XmlName) -> Result<()> {
        self.events.push(Event::EndElement(name.clone()));
        Ok(())
    }
    fn comment(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Comment(text.to_string()));
        Ok(())
    }
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        self.events.push(Event::ProcessingInstruction(
            target.to_string(),
            data.map(String::from),
        ));
        Ok(())
    }
    fn start_cdata(&mut self) -> Result<()> {
        self.events.push(Event::StartCdata);
        Ok(())
    }
    fn end_cdata(&mut self) -> Result<()> {
        self.events.push(Event::EndCdata);
        Ok(())
    }
    fn start_entity(&mut self, name: &str) -> Result<()> {
        self.events.push(Event::StartEntity(name.to_string()));
        Ok(())
    }
    fn end_entity(&mut self, name: &str) -> Result<()> {
        self.events.push(Event::EndEntity(name.to_string()));
        Ok(())
    }
    fn end_document(&mut self) -> Result<()> {
        self.events.push(Event::EndDocument);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_name() {
        let name = XmlName::new(Some("p"), "item", Some("urn:x"));
        assert_eq!(name.raw(), "p:item");
        assert_eq!(name.qname(), QName::namespaced("urn:x", "item"));
        assert!(name.matches(Some("urn:x"), "item"));
        assert_eq!(XmlName::local("a").to_string(), "a");
    }

    #[test]
    fn test_attributes_lookup() {
        let attrs = Attributes::new().with("id", "1").with("name", "x");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.value(None, "name"), Some("x"));
        assert_eq!(attrs.position(Some("urn:x"), "name"), None);
    }

    #[test]
    fn test_empty_element_default_splits() {
        let mut rec = RecordingHandler::new();
        let name = XmlName::local("a");
        rec.empty_element(&name, &Attributes::new()).unwrap();
        assert_eq!(
            rec.events,
            vec![
                Event::StartElement(name.clone(), Attributes::new()),
                Event::EndElement(name)
            ]
        );
    }
}
