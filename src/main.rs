//! Command-line interface for xmlschema-stream

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use xmlschema_stream::limits::Limits;
#[cfg(feature = "cli")]
use xmlschema_stream::validators::{TypeReference, XsdType};
#[cfg(feature = "cli")]
use xmlschema_stream::{Grammar, GrammarResolver, JsonGrammarLoader, ValidatorConfig};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlschema-stream")]
#[command(author, version, about = "Streaming XML Schema validation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect a compiled grammar and display its declarations
    Inspect {
        /// Path to the grammar file (JSON)
        #[arg(short, long, value_name = "GRAMMAR")]
        grammar: PathBuf,

        /// Show detailed information about a specific element
        #[arg(short, long)]
        element: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate XML documents
    Validate {
        /// Grammar files (JSON); may be repeated
        #[arg(short, long = "grammar", value_name = "GRAMMAR")]
        grammars: Vec<PathBuf>,

        /// Target namespace to register the grammars under
        #[arg(short, long)]
        namespace: Option<String>,

        /// XML files to validate
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Only validate when a grammar exists for the root element
        #[arg(long)]
        dynamic: bool,

        /// Ignore xsi:schemaLocation hints
        #[arg(long)]
        no_schema_locations: bool,

        /// Use strict resource limits
        #[arg(long)]
        strict_limits: bool,

        /// Output diagnostics as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect {
            grammar,
            element,
            json,
        } => cmd_inspect(grammar, element, json),
        Commands::Validate {
            grammars,
            namespace,
            files,
            dynamic,
            no_schema_locations,
            strict_limits,
            json,
        } => {
            let options = ValidateOptions {
                namespace,
                dynamic,
                no_schema_locations,
                strict_limits,
                json,
            };
            cmd_validate(grammars, files, options)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn load_grammar(path: &Path) -> Result<Grammar, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read grammar '{}': {}", path.display(), e))?;
    Ok(Grammar::from_json(&text)?)
}

#[cfg(feature = "cli")]
fn type_label(type_ref: Option<&TypeReference>) -> String {
    match type_ref {
        Some(TypeReference::Named(name)) => name.to_string(),
        Some(TypeReference::Simple(_)) => "anonymous simple type".to_string(),
        Some(TypeReference::Complex(_)) => "anonymous complex type".to_string(),
        None => "xs:anyType".to_string(),
    }
}

#[cfg(feature = "cli")]
fn cmd_inspect(path: PathBuf, element: Option<String>, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::json;

    let grammar = load_grammar(&path)?;

    if let Some(name) = element {
        let decl = grammar
            .get_global_element(&name)
            .ok_or_else(|| format!("Element '{}' not found in grammar", name))?;
        if json_output {
            println!("{}", serde_json::to_string_pretty(decl.as_ref())?);
        } else {
            println!("Element: {}", decl.name);
            println!("  Type: {}", type_label(decl.type_ref.as_ref()));
            println!("  Nillable: {}", decl.nillable);
            println!("  Abstract: {}", decl.abstract_element);
            if let Some(constraint) = &decl.value_constraint {
                let kind = if constraint.is_fixed() { "Fixed" } else { "Default" };
                println!("  {}: {}", kind, constraint.value());
            }
            for identity in &decl.identities {
                println!("  Identity: {} ({})", identity.name, identity.kind);
            }
        }
        return Ok(());
    }

    if json_output {
        let elements: Vec<_> = grammar
            .elements
            .values()
            .map(|e| json!({"name": e.name.to_string(), "type": type_label(e.type_ref.as_ref())}))
            .collect();
        let types: Vec<_> = grammar
            .types
            .iter()
            .map(|(name, t)| json!({"name": name, "kind": if t.is_simple() { "simple" } else { "complex" }}))
            .collect();
        let output = json!({
            "targetNamespace": grammar.target_namespace,
            "elements": elements,
            "types": types,
            "attributes": grammar.attributes.keys().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("xmlschema-stream v{}", xmlschema_stream::VERSION);
    println!();
    match &grammar.target_namespace {
        Some(ns) => println!("Target Namespace: {}", ns),
        None => println!("Target Namespace: (none)"),
    }
    println!("\n=== Global Elements ===");
    for decl in grammar.elements.values() {
        println!("  {} : {}", decl.name, type_label(decl.type_ref.as_ref()));
    }
    println!("\n=== Global Types ===");
    for (name, global_type) in &grammar.types {
        let kind = match global_type {
            XsdType::Simple(_) => "simple",
            XsdType::Complex(_) => "complex",
        };
        println!("  {} ({})", name, kind);
    }
    println!("\n=== Global Attributes ===");
    for name in grammar.attributes.keys() {
        println!("  {}", name);
    }
    Ok(())
}

#[cfg(feature = "cli")]
struct ValidateOptions {
    namespace: Option<String>,
    dynamic: bool,
    no_schema_locations: bool,
    strict_limits: bool,
    json: bool,
}

#[cfg(feature = "cli")]
fn cmd_validate(
    grammar_paths: Vec<PathBuf>,
    files: Vec<PathBuf>,
    options: ValidateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut resolver = GrammarResolver::new().with_loader(Arc::new(JsonGrammarLoader::new()));
    for path in &grammar_paths {
        let mut grammar = load_grammar(path)?;
        if let Some(namespace) = &options.namespace {
            grammar.target_namespace = Some(namespace.clone());
        }
        resolver.put_grammar(grammar);
    }

    let mut config = ValidatorConfig::new()
        .with_dynamic_validation(options.dynamic)
        .with_schema_locations(!options.no_schema_locations);
    if options.strict_limits {
        config = config.with_limits(Limits::strict());
    }

    let mut invalid = 0;
    for file in &files {
        let mut file_config = config.clone();
        if let Some(dir) = file.parent() {
            file_config = file_config.with_base_dir(dir);
        }
        let diagnostics = xmlschema_stream::validate_file(resolver.clone(), file_config, file)?;
        if !diagnostics.is_empty() {
            invalid += 1;
        }

        if options.json {
            let report = serde_json::json!({
                "file": file.display().to_string(),
                "valid": diagnostics.is_empty(),
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if diagnostics.is_empty() {
            println!("✓ {} is valid", file.display());
        } else {
            println!("✗ {} is invalid", file.display());
            for diagnostic in &diagnostics {
                println!("  - {}", diagnostic);
            }
        }
    }
    if invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
