//! Resource loading utilities
//!
//! This module reads instance documents and grammars from files or in-memory
//! strings. Grammars are stored as JSON documents of [`Grammar`]; schema
//! location hints found in instances are handed to a [`GrammarLoader`].

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use crate::validators::Grammar;
use std::fs;

/// Resource loader for grammars and documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                self.limits.check_xml_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(format!(
                        "Remote resources are not allowed: {}",
                        url
                    )));
                }
                Err(Error::Resource(format!("no transport for URL: {}", url)))
            }
            Location::String(s) => {
                self.limits.check_xml_size(s.len())?;
                Ok(s.clone())
            }
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of grammars for schema-location hints
pub trait GrammarLoader: Send + Sync {
    /// Load the grammar found at `location`
    fn load_grammar(&self, location: &Location) -> Result<Grammar>;
}

/// Loads grammars serialized as JSON
#[derive(Debug, Clone, Default)]
pub struct JsonGrammarLoader {
    loader: Loader,
}

impl JsonGrammarLoader {
    /// Create a loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configured resource loader
    pub fn with_loader(loader: Loader) -> Self {
        Self { loader }
    }
}

impl GrammarLoader for JsonGrammarLoader {
    fn load_grammar(&self, location: &Location) -> Result<Grammar> {
        let text = self.loader.load(location)?;
        Grammar::from_json(&text).map_err(|e| {
            Error::Resource(format!("invalid grammar '{}': {}", location.as_str(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::XsdElement;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert!(content.contains("<root>test</root>"));
    }

    #[test]
    fn test_load_from_string() {
        let location = Location::String("<root>test</root>".to_string());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert_eq!(content, "<root>test</root>");
    }

    #[test]
    fn test_remote_refused() {
        let location = Location::from_str("http://example.com/a.json").unwrap();
        assert!(Loader::new().load(&location).is_err());
        assert!(Loader::new().with_allow_remote(true).load(&location).is_err());
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024); // 11 MB
        write!(file, "{}", large_content).unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new().with_limits(Limits::strict());
        let result = loader.load(&location);

        // Strict limits (10 MB max) should reject 11MB file
        assert!(result.is_err());
    }

    #[test]
    fn test_json_grammar_loader() {
        let mut grammar = Grammar::new(Some("urn:test"));
        grammar.add_element(XsdElement::typed(
            QName::namespaced("urn:test", "root"),
            QName::xsd("string"),
        ));
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", grammar.to_json().unwrap()).unwrap();

        let loaded = JsonGrammarLoader::new()
            .load_grammar(&Location::Path(file.path().to_path_buf()))
            .unwrap();
        assert_eq!(loaded.target_namespace.as_deref(), Some("urn:test"));
        assert!(loaded.get_global_element("root").is_some());

        let broken = Location::String("{not json".to_string());
        assert!(JsonGrammarLoader::new().load_grammar(&broken).is_err());
    }
}
