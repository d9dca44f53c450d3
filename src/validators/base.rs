//! Validator configuration
//!
//! Switches and limits for one [`SchemaValidator`](super::SchemaValidator)
//! run. Flags can also be set by their feature URI, the way SAX parsers are
//! configured.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::limits::Limits;

/// Feature URI of the "perform validation" switch
pub const FEATURE_VALIDATION: &str = "http://xml.org/sax/features/validation";

/// Feature URI of the dynamic validation switch
pub const FEATURE_DYNAMIC_VALIDATION: &str = "http://apache.org/xml/features/validation/dynamic";

/// Configuration of a validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Report validity findings; defaults are inserted either way
    pub validation: bool,
    /// Validate only when a grammar exists for the root element
    pub dynamic_validation: bool,
    /// Honour xsi:schemaLocation and xsi:noNamespaceSchemaLocation
    pub load_schema_locations: bool,
    /// Resource limits
    pub limits: Limits,
    /// Base directory for relative schema-location hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validation: true,
            dynamic_validation: false,
            load_schema_locations: true,
            limits: Limits::default(),
            base_dir: None,
        }
    }
}

impl ValidatorConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the validation switch
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the dynamic validation switch
    pub fn with_dynamic_validation(mut self, dynamic: bool) -> Self {
        self.dynamic_validation = dynamic;
        self
    }

    /// Set whether schema-location hints are followed
    pub fn with_schema_locations(mut self, load: bool) -> Self {
        self.load_schema_locations = load;
        self
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the base directory for relative hints
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Set a flag by feature URI
    pub fn set_feature(&mut self, name: &str, value: bool) -> Result<()> {
        match name {
            FEATURE_VALIDATION => self.validation = value,
            FEATURE_DYNAMIC_VALIDATION => self.dynamic_validation = value,
            _ => return Err(Error::Other(format!("unrecognized feature '{}'", name))),
        }
        Ok(())
    }

    /// Read a flag by feature URI
    pub fn get_feature(&self, name: &str) -> Result<bool> {
        match name {
            FEATURE_VALIDATION => Ok(self.validation),
            FEATURE_DYNAMIC_VALIDATION => Ok(self.dynamic_validation),
            _ => Err(Error::Other(format!("unrecognized feature '{}'", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert!(config.validation);
        assert!(!config.dynamic_validation);
        assert!(config.load_schema_locations);
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn test_features() {
        let mut config = ValidatorConfig::new();
        config.set_feature(FEATURE_VALIDATION, false).unwrap();
        config.set_feature(FEATURE_DYNAMIC_VALIDATION, true).unwrap();
        assert!(!config.get_feature(FEATURE_VALIDATION).unwrap());
        assert!(config.dynamic_validation);
        assert!(config.set_feature("http://example.com/nope", true).is_err());
        assert!(config.get_feature("nope").is_err());
    }

    #[test]
    fn test_serde() {
        let config: ValidatorConfig =
            serde_json::from_str(r#"{"validation": false, "base_dir": "/tmp"}"#).unwrap();
        assert!(!config.validation);
        assert!(config.load_schema_locations);
        assert_eq!(config.base_dir, Some(PathBuf::from("/tmp")));
    }
}
