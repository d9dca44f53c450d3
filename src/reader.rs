//! Streaming XML reader
//!
//! Turns markup into [`DocumentHandler`] callbacks with quick-xml. Names are
//! resolved against in-scope namespace declarations; `xmlns` attributes are
//! reported through the prefix-mapping callbacks instead of the attribute
//! list.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::events::{Attribute, Attributes, DocumentHandler, XmlName};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::NamespaceContext;

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("Invalid {}: {}", what, e)))
}

/// Event producer over XML text
#[derive(Debug, Clone, Default)]
pub struct DocumentReader {
    limits: Limits,
}

impl DocumentReader {
    /// Create a reader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read a file and stream it to `handler`
    pub fn parse_file<H: DocumentHandler>(&self, path: impl AsRef<Path>, handler: &mut H) -> Result<()> {
        let location = Location::Path(path.as_ref().to_path_buf());
        let xml = Loader::new().with_limits(self.limits.clone()).load(&location)?;
        self.parse_str(&xml, handler)
    }

    /// Stream `xml` to `handler`
    pub fn parse_str<H: DocumentHandler>(&self, xml: &str, handler: &mut H) -> Result<()> {
        self.limits.check_xml_size(xml.len())?;
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut namespaces = NamespaceContext::new();
        let mut open: Vec<(XmlName, Vec<String>)> = Vec::new();
        let mut seen_root = false;

        handler.start_document()?;
        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Xml(format!(
                    "Error parsing XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            match event {
                Event::Start(e) => {
                    let (name, attributes, prefixes) = start_tag(&e, &mut namespaces, handler)?;
                    seen_root = true;
                    handler.start_element(&name, &attributes)?;
                    open.push((name, prefixes));
                }
                Event::Empty(e) => {
                    let (name, attributes, prefixes) = start_tag(&e, &mut namespaces, handler)?;
                    seen_root = true;
                    handler.empty_element(&name, &attributes)?;
                    end_scope(&prefixes, &mut namespaces, handler)?;
                }
                Event::End(_) => {
                    let (name, prefixes) = open
                        .pop()
                        .ok_or_else(|| Error::Xml("unexpected end tag".to_string()))?;
                    handler.end_element(&name)?;
                    end_scope(&prefixes, &mut namespaces, handler)?;
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                    if open.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(Error::Xml("text outside of the root element".to_string()));
                        }
                    } else {
                        handler.characters(&text)?;
                    }
                }
                Event::CData(e) => {
                    let text = utf8(&e.into_inner(), "CDATA section")?;
                    handler.start_cdata()?;
                    handler.characters(&text)?;
                    handler.end_cdata()?;
                }
                Event::Comment(e) => {
                    let text = utf8(&e, "comment")?;
                    handler.comment(&text)?;
                }
                Event::Decl(e) => {
                    let version = e
                        .version()
                        .map_err(|e| Error::Xml(format!("Invalid XML declaration: {}", e)))?;
                    let version = utf8(&version, "XML version")?;
                    let encoding = match e.encoding() {
                        Some(Ok(v)) => Some(utf8(&v, "encoding")?),
                        _ => None,
                    };
                    let standalone = match e.standalone() {
                        Some(Ok(v)) => Some(utf8(&v, "standalone")?),
                        _ => None,
                    };
                    handler.xml_decl(&version, encoding.as_deref(), standalone.as_deref())?;
                }
                Event::PI(e) => {
                    let content = utf8(&e, "processing instruction")?;
                    let (target, data) = match content.split_once(char::is_whitespace) {
                        Some((target, data)) => (target, Some(data.trim_start())),
                        None => (content.as_str(), None),
                    };
                    handler.processing_instruction(target, data)?;
                }
                Event::DocType(e) => {
                    let text = utf8(&e, "doctype")?;
                    handler.doctype(text.trim())?;
                }
                Event::Eof => break,
            }
        }
        if !open.is_empty() {
            return Err(Error::Xml(format!("unclosed element <{}>", open[open.len() - 1].0.raw())));
        }
        if !seen_root {
            return Err(Error::Xml("document has no root element".to_string()));
        }
        handler.end_document()
    }
}

/// Bind the tag's namespace declarations and resolve its names
fn start_tag<H: DocumentHandler>(
    start: &BytesStart,
    namespaces: &mut NamespaceContext,
    handler: &mut H,
) -> Result<(XmlName, Attributes, Vec<String>)> {
    let raw_name = utf8(start.name().as_ref(), "element name")?;
    let mut raw_attributes = Vec::new();
    let mut prefixes = Vec::new();
    namespaces.push_context();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
        let key = utf8(attr.key.as_ref(), "attribute name")?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .to_string();

        let prefix = if key == "xmlns" {
            Some(String::new())
        } else {
            key.strip_prefix("xmlns:").map(str::to_string)
        };
        match prefix {
            Some(prefix) => {
                let namespace = (!value.is_empty()).then_some(value.as_str());
                namespaces.declare_prefix(prefix.clone(), namespace);
                handler.start_prefix_mapping(&prefix, &value)?;
                prefixes.push(prefix);
            }
            None => raw_attributes.push((key, value)),
        }
    }

    let name = match raw_name.split_once(':') {
        Some((prefix, local)) => {
            let namespace = namespaces.get_namespace(prefix).ok_or_else(|| {
                Error::Namespace(format!("unbound prefix '{}' in <{}>", prefix, raw_name))
            })?;
            XmlName::new(Some(prefix), local, Some(namespace))
        }
        None => XmlName::new(None::<String>, raw_name.as_str(), namespaces.get_default_namespace()),
    };

    let mut attributes = Attributes::new();
    for (key, value) in raw_attributes {
        let attr_name = match key.split_once(':') {
            Some((prefix, local)) => {
                let namespace = namespaces.get_namespace(prefix).ok_or_else(|| {
                    Error::Namespace(format!("unbound prefix '{}' in attribute {}", prefix, key))
                })?;
                XmlName::new(Some(prefix), local, Some(namespace))
            }
            None => XmlName::local(key),
        };
        if attributes.position(attr_name.namespace(), &attr_name.local_name).is_some() {
            return Err(Error::Xml(format!("duplicate attribute {} in <{}>", attr_name, raw_name)));
        }
        attributes.push(Attribute::new(attr_name, value));
    }
    Ok((name, attributes, prefixes))
}

fn end_scope<H: DocumentHandler>(
    prefixes: &[String],
    namespaces: &mut NamespaceContext,
    handler: &mut H,
) -> Result<()> {
    namespaces.pop_context();
    for prefix in prefixes.iter().rev() {
        handler.end_prefix_mapping(prefix)?;
    }
    Ok(())
}

/// Stream `xml` to `handler` with default limits
pub fn parse_str<H: DocumentHandler>(xml: &str, handler: &mut H) -> Result<()> {
    DocumentReader::new().parse_str(xml, handler)
}

/// Stream the file at `path` to `handler` with default limits
pub fn parse_file<H: DocumentHandler>(path: impl AsRef<Path>, handler: &mut H) -> Result<()> {
    DocumentReader::new().parse_file(path, handler)
}
