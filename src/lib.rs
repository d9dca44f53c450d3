//! # xmlschema-stream
//!
//! Streaming XML Schema (XSD 1.0) instance validation.
//!
//! A [`SchemaValidator`] sits between an XML event producer and a downstream
//! [`DocumentHandler`]. It checks each element against the grammars held by a
//! [`GrammarResolver`], inserts default attributes and element values,
//! evaluates `xs:unique`, `xs:key` and `xs:keyref` constraints, and reports
//! findings to an [`ErrorReporter`] without stopping the stream.
//!
//! ## Features
//!
//! - Content models compiled to position automata
//! - Attribute validation with defaults and wildcards
//! - `xsi:type`, `xsi:nil` and schema-location hints
//! - Identity constraints with scoped keyref resolution
//! - ID/IDREF checking
//! - Protection against oversized and deeply nested input
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlschema_stream::{reader, Grammar, GrammarResolver, SchemaValidator};
//!
//! let grammar = Grammar::from_json(&std::fs::read_to_string("order.json")?)?;
//! let mut resolver = GrammarResolver::new();
//! resolver.put_grammar(grammar);
//!
//! let mut validator = SchemaValidator::new(resolver);
//! reader::parse_file("order.xml", &mut validator)?;
//! for diagnostic in validator.reporter().diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading and event streams
pub mod loaders;
pub mod events;
pub mod reader;

// Identity constraint paths
pub mod xpath;

// Validators
pub mod validators;

// Re-exports for convenience
pub use error::{Error, Result};
pub use events::{Attribute, Attributes, DocumentHandler, NullHandler, RecordingHandler, XmlName};
pub use loaders::{GrammarLoader, JsonGrammarLoader, Loader};
pub use validators::{
    Diagnostic, DiagnosticCollector, ElementFrame, ErrorCode, ErrorReporter, Grammar,
    GrammarResolver, SchemaValidator, ValidatorConfig,
};

/// Version of the xmlschema-stream library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_1_0_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Validate `xml` against the grammars of `resolver` and collect the findings
///
/// Malformed XML and exceeded limits are returned as `Err`; validity
/// findings are returned as diagnostics.
pub fn validate_str(resolver: GrammarResolver, xml: &str) -> Result<Vec<Diagnostic>> {
    let mut validator = SchemaValidator::new(resolver);
    reader::parse_str(xml, &mut validator)?;
    let (_, mut collector) = validator.into_parts();
    Ok(collector.take())
}

/// Validate the file at `path` with a configured validator
pub fn validate_file(
    resolver: GrammarResolver,
    config: ValidatorConfig,
    path: impl AsRef<std::path::Path>,
) -> Result<Vec<Diagnostic>> {
    let limits = config.limits.clone();
    let mut validator =
        SchemaValidator::with_parts(resolver, config, NullHandler, DiagnosticCollector::new());
    reader::DocumentReader::new()
        .with_limits(limits)
        .parse_file(path, &mut validator)?;
    let (_, mut collector) = validator.into_parts();
    Ok(collector.take())
}
