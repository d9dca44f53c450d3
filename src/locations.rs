//! Resource location resolution
//!
//! Turns schema-location hints from instance documents (`xsi:schemaLocation`,
//! `xsi:noNamespaceSchemaLocation`) into concrete resource locations.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// Non-file URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Resource(format!("invalid file URL: {}", s)))?;
                return Ok(Location::Path(path));
            }
            // single letters are drive prefixes, not schemes
            if url.scheme().len() > 1 {
                return Ok(Location::Url(url));
            }
        }

        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') || s.contains(['/', '\\']) {
            return Ok(Location::Path(path));
        }

        if s.ends_with(".json") || s.ends_with(".xsd") {
            return Ok(Location::Path(path));
        }

        Ok(Location::String(s.to_string()))
    }

    /// Resolve a hint relative to an optional base directory
    pub fn resolve(hint: &str, base_dir: Option<&Path>) -> Result<Self> {
        let hint = hint.trim();
        if hint.is_empty() {
            return Err(Error::Resource("empty schema location".to_string()));
        }
        match Self::from_str(hint)? {
            Location::Path(path) if path.is_relative() => match base_dir {
                Some(base) => Ok(Location::Path(base.join(path))),
                None => Ok(Location::Path(path)),
            },
            other => Ok(other),
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::from_str("http://example.com/schema.json").unwrap();
        assert!(matches!(loc, Location::Url(_)));
        assert!(loc.is_remote());
    }

    #[test]
    fn test_location_from_file_url() {
        let loc = Location::from_str("file:///tmp/grammar.json").unwrap();
        assert_eq!(loc, Location::Path(PathBuf::from("/tmp/grammar.json")));
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::from_str("/tmp/schema.json").unwrap();
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());
    }

    #[test]
    fn test_resolve_relative() {
        let loc = Location::resolve(" orders.json ", Some(Path::new("/srv/schemas"))).unwrap();
        assert_eq!(loc, Location::Path(PathBuf::from("/srv/schemas/orders.json")));

        let loc = Location::resolve("/abs/orders.json", Some(Path::new("/srv"))).unwrap();
        assert_eq!(loc, Location::Path(PathBuf::from("/abs/orders.json")));

        assert!(Location::resolve("  ", None).is_err());
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::String("test".to_string());
        assert_eq!(loc.as_str(), "test");
    }
}
