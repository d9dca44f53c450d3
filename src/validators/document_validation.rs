//! Document Validation
//!
//! [`SchemaValidator`] is a [`DocumentHandler`] filter: it validates the
//! event stream it receives against the grammars of a [`GrammarResolver`],
//! augments start tags with defaulted attributes, emits element default
//! values, and forwards every event to a downstream handler. Findings go to
//! an [`ErrorReporter`]; only resource failures, exceeded limits and
//! downstream failures are returned as `Err`.
//!
//! Each open element owns an [`ElementFrame`] on a stack. A child's start
//! advances the parent's content-model state before the child's frame is
//! pushed, so popping the child leaves the parent exactly as the child
//! found it. Subtrees that cannot be validated (skip wildcards, undeclared
//! elements, children rejected by the content model) are passed through
//! without any frame, attribute or identity-constraint processing.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::events::{Attributes, DocumentHandler, NullHandler, XmlName};
use crate::namespaces::{NamespaceContext, QName, XSI_NAMESPACE};
use crate::names::is_valid_qname;

use super::attributes::AttributeValidator;
use super::base::ValidatorConfig;
use super::builtins::{BuiltinType, XsdValue};
use super::complex_types::{ContentTypeLabel, XsdType};
use super::elements::{ValueConstraint, XsdElement};
use super::exceptions::{DiagnosticCollector, ErrorCode, ErrorReporter};
use super::globals::GrammarResolver;
use super::identity_engine::{ElementEvent, IdentityEngine};
use super::models::{ContentModel, MatchedParticle, ModelState, StateId};
use super::simple_types::{IdKind, XsdSimpleType};
use super::validation::ValidationState;
use super::wildcards::ProcessContents;

/// State of one open element
#[derive(Debug, Clone)]
pub struct ElementFrame {
    /// Element name
    pub name: XmlName,
    /// Raw name, used in diagnostics
    pub raw: String,
    /// Governing declaration
    pub decl: Option<Arc<XsdElement>>,
    /// Effective type, after any xsi:type override
    pub element_type: Option<XsdType>,
    /// Compiled content model of the effective type
    pub content_model: Option<Arc<ContentModel>>,
    /// Content model state
    pub state: ModelState,
    /// xsi:nil="true" applied
    pub nil: bool,
    /// xsi:nil on a non-nillable declaration; content is not checked
    pub nil_rejected: bool,
    /// Element children seen so far
    pub child_count: usize,
    /// Non-whitespace text seen so far
    pub saw_text: bool,
    /// Accumulated character data
    pub text: String,
}

impl ElementFrame {
    fn new(name: &XmlName, raw: String) -> Self {
        Self {
            name: name.clone(),
            raw,
            decl: None,
            element_type: None,
            content_model: None,
            state: ModelState::Valid(Vec::new()),
            nil: false,
            nil_rejected: false,
            child_count: 0,
            saw_text: false,
            text: String::new(),
        }
    }

    /// Name of the effective type, for display
    pub fn type_name(&self) -> Option<String> {
        self.element_type.as_ref().map(XsdType::display_name)
    }
}

/// Forwards findings only while enabled
struct Gate<'a> {
    inner: &'a mut dyn ErrorReporter,
    enabled: bool,
}

impl ErrorReporter for Gate<'_> {
    fn report(&mut self, code: ErrorCode, element: &str, args: &[String]) {
        if self.enabled {
            self.inner.report(code, element, args);
        }
    }
}

#[derive(Debug, Default)]
struct Content {
    value: Option<XsdValue>,
    id_kind: Option<IdKind>,
    default_text: Option<String>,
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn expected_particles(model: &ContentModel, state: &[StateId]) -> String {
    format!("{{{}}}", model.expected(state).join(", "))
}

fn register_ids(
    ids: &mut ValidationState,
    value: &XsdValue,
    kind: IdKind,
    element: &str,
    reporter: &mut dyn ErrorReporter,
) {
    match kind {
        IdKind::Id => {
            for id in value.items_as_strings() {
                if !ids.add_id(&id) {
                    reporter.report(ErrorCode::DuplicateId, element, &[id]);
                }
            }
        }
        IdKind::IdRef => {
            for idref in value.items_as_strings() {
                ids.add_idref(&idref);
            }
        }
        IdKind::None => {}
    }
}

/// Everything a run owns besides the downstream handler and the reporter
#[derive(Debug)]
struct ValidationContext {
    resolver: GrammarResolver,
    config: ValidatorConfig,
    namespaces: NamespaceContext,
    pending_bindings: Vec<(String, String)>,
    frames: Vec<ElementFrame>,
    depth: usize,
    skip_depth: Option<usize>,
    validating: bool,
    ids: ValidationState,
    identities: IdentityEngine,
    attempted_locations: HashSet<Option<String>>,
}

impl ValidationContext {
    fn new(resolver: GrammarResolver, config: ValidatorConfig) -> Self {
        let validating = config.validation;
        Self {
            resolver,
            config,
            namespaces: NamespaceContext::new(),
            pending_bindings: Vec::new(),
            frames: Vec::new(),
            depth: 0,
            skip_depth: None,
            validating,
            ids: ValidationState::new(),
            identities: IdentityEngine::new(),
            attempted_locations: HashSet::new(),
        }
    }

    fn reset(&mut self) {
        self.namespaces = NamespaceContext::new();
        self.pending_bindings.clear();
        self.frames.clear();
        self.depth = 0;
        self.skip_depth = None;
        self.validating = self.config.validation;
        self.ids.reset();
        self.identities.reset();
        self.attempted_locations.clear();
    }

    /// Release the per-document ID and identity-constraint state
    fn finish(&mut self) {
        self.ids.reset();
        self.identities.reset();
        self.attempted_locations.clear();
    }

    fn start_element(
        &mut self,
        name: &XmlName,
        attributes: &Attributes,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<Attributes> {
        self.depth += 1;
        self.config.limits.check_xml_depth(self.depth)?;
        self.config.limits.check_attributes(attributes.len())?;
        self.namespaces.push_context();
        for (prefix, uri) in std::mem::take(&mut self.pending_bindings) {
            let namespace = if uri.is_empty() { None } else { Some(uri.as_str()) };
            self.namespaces.declare_prefix(prefix, namespace);
        }

        if self.skip_depth.is_some() {
            return Ok(attributes.clone());
        }

        let raw = name.raw();
        let is_root = self.frames.is_empty();
        if is_root {
            self.validating = self.config.validation;
        }
        let mut gate = Gate {
            inner: reporter,
            enabled: self.validating,
        };
        if self.config.load_schema_locations {
            self.load_schema_locations(attributes, &raw, &mut gate);
        }
        if is_root
            && self.validating
            && self.config.dynamic_validation
            && !self.resolver.has_grammar(name.namespace())
        {
            log::debug!("no grammar for {:?}, document not validated", name.namespace());
            self.validating = false;
            gate.enabled = false;
        }

        let qname = name.qname();
        let mut matched = None;
        let mut lookup_global = is_root;
        let mut skip = false;
        if let Some(parent) = self.frames.last_mut() {
            parent.child_count += 1;
            match (&parent.content_model, parent.nil) {
                (Some(model), false) => {
                    match std::mem::replace(&mut parent.state, ModelState::SubsequentError) {
                        ModelState::Valid(state) => {
                            match model.transition(&state, &qname, &self.resolver) {
                                Some((next, particle)) => {
                                    parent.state = ModelState::Valid(next);
                                    matched = Some(particle);
                                }
                                None => {
                                    gate.report(
                                        ErrorCode::InvalidChild,
                                        &raw,
                                        &[raw.clone(), expected_particles(model, &state)],
                                    );
                                    parent.state = ModelState::FirstError;
                                    skip = true;
                                }
                            }
                        }
                        ModelState::FirstError | ModelState::SubsequentError => lookup_global = true,
                    }
                }
                _ => lookup_global = true,
            }
        }

        let mut strict_wildcard = false;
        let decl = match matched {
            Some(MatchedParticle::Element(decl)) => Some(decl),
            Some(MatchedParticle::Wildcard(wildcard)) => match wildcard.process_contents {
                ProcessContents::Skip => {
                    skip = true;
                    None
                }
                ProcessContents::Lax => self.resolver.get_global_element(&qname),
                ProcessContents::Strict => {
                    strict_wildcard = true;
                    self.resolver.get_global_element(&qname)
                }
            },
            None if lookup_global && !skip => self.resolver.get_global_element(&qname),
            None => None,
        };
        if skip {
            return Ok(self.enter_skip(name, raw, attributes));
        }

        if let Some(decl) = decl.as_deref() {
            if decl.abstract_element {
                gate.report(ErrorCode::AbstractElement, &raw, &[raw.clone()]);
            }
        }
        let mut element_type = decl.as_deref().map(|d| self.resolver.element_type(d));
        if let Some(value) = attributes.value(Some(XSI_NAMESPACE), "type") {
            element_type = self.resolve_xsi_type(value, decl.as_deref(), element_type, &raw, &mut gate);
        }
        let Some(element_type) = element_type else {
            if is_root {
                gate.report(ErrorCode::ElementNotDeclared, &raw, &[raw.clone()]);
            } else if strict_wildcard {
                gate.report(ErrorCode::StrictWildcardUndeclared, &raw, &[raw.clone()]);
            }
            return Ok(self.enter_skip(name, raw, attributes));
        };
        if element_type.is_abstract() {
            gate.report(ErrorCode::AbstractType, &raw, &[raw.clone()]);
        }

        let content_model = match &element_type {
            XsdType::Complex(complex) => complex.content_model(),
            XsdType::Simple(_) => None,
        };
        let state = ModelState::Valid(content_model.as_ref().map(|m| m.start()).unwrap_or_default());

        let mut nil = false;
        let mut nil_rejected = false;
        if let Some(value) = attributes.value(Some(XSI_NAMESPACE), "nil") {
            match decl.as_deref() {
                Some(d) if d.nillable => match BuiltinType::Boolean.parse(value.trim(), &self.namespaces) {
                    Ok(XsdValue::Boolean(true)) => {
                        nil = true;
                        if d.fixed_value().is_some() {
                            gate.report(ErrorCode::NilWithFixed, &raw, &[raw.clone()]);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => gate.report(
                        ErrorCode::AttributeValue,
                        &raw,
                        &[raw.clone(), "xsi:nil".to_string(), value.to_string(), e.to_string()],
                    ),
                },
                _ => {
                    gate.report(ErrorCode::NotNillable, &raw, &[raw.clone()]);
                    nil_rejected = true;
                }
            }
        }

        let mut augmented = attributes.clone();
        let group = match &element_type {
            XsdType::Complex(complex) => Some(&complex.attributes),
            XsdType::Simple(_) => None,
        };
        let typed = AttributeValidator::new(&self.resolver, &self.namespaces, self.validating)
            .validate(&raw, &mut augmented, group, &mut gate);
        for attribute in typed.iter().flatten() {
            register_ids(&mut self.ids, &attribute.value, attribute.id_kind, &raw, &mut gate);
        }

        log::trace!("start <{}> as {} at depth {}", raw, element_type, self.depth);
        let mut frame = ElementFrame::new(name, raw);
        frame.decl = decl;
        frame.element_type = Some(element_type);
        frame.content_model = content_model;
        frame.state = state;
        frame.nil = nil;
        frame.nil_rejected = nil_rejected;
        self.frames.push(frame);

        if self.validating {
            if let Some(frame) = self.frames.last() {
                let event = ElementEvent {
                    name,
                    raw: &frame.raw,
                    attributes: &augmented,
                    typed: &typed,
                    decl: frame.decl.as_deref(),
                };
                self.identities.start_element(event, &mut gate);
            }
        }
        Ok(augmented)
    }

    fn enter_skip(&mut self, name: &XmlName, raw: String, attributes: &Attributes) -> Attributes {
        log::debug!("skipping subtree of <{}> at depth {}", raw, self.depth);
        self.frames.push(ElementFrame::new(name, raw));
        self.skip_depth = Some(self.depth);
        attributes.clone()
    }

    fn load_schema_locations(
        &mut self,
        attributes: &Attributes,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) {
        if let Some(value) = attributes.value(Some(XSI_NAMESPACE), "schemaLocation") {
            let tokens: Vec<&str> = value.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                log::warn!("odd number of tokens in xsi:schemaLocation of <{}>", element);
            }
            for pair in tokens.chunks_exact(2) {
                self.load_grammar(Some(pair[0]), pair[1], element, reporter);
            }
        }
        if let Some(hint) = attributes.value(Some(XSI_NAMESPACE), "noNamespaceSchemaLocation") {
            self.load_grammar(None, hint.trim(), element, reporter);
        }
    }

    fn load_grammar(
        &mut self,
        namespace: Option<&str>,
        hint: &str,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) {
        if self.resolver.has_grammar(namespace)
            || !self.attempted_locations.insert(namespace.map(str::to_string))
        {
            return;
        }
        let base_dir: Option<&Path> = self.config.base_dir.as_deref();
        if let Err(e) = self.resolver.load_grammar(namespace, hint, base_dir) {
            log::debug!("cannot load grammar for {:?} from {}: {}", namespace, hint, e);
            reporter.report(ErrorCode::SchemaLoad, element, &[hint.to_string(), e.to_string()]);
        }
    }

    fn resolve_xsi_type(
        &self,
        value: &str,
        decl: Option<&XsdElement>,
        declared: Option<XsdType>,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) -> Option<XsdType> {
        let value = value.trim();
        let args = [element.to_string(), value.to_string()];
        let qname: QName = match self.namespaces.resolve(value) {
            Ok(qname) if is_valid_qname(value) => qname,
            _ => {
                reporter.report(ErrorCode::InvalidXsiType, element, &args);
                return declared;
            }
        };
        let Some(xsi_type) = self.resolver.get_global_type(&qname) else {
            reporter.report(ErrorCode::XsiTypeNotFound, element, &args);
            return declared;
        };
        match declared {
            Some(declared) => {
                let block = decl
                    .map(|d| d.block)
                    .unwrap_or_default()
                    .union(declared.block());
                if self.resolver.is_derived_from(&xsi_type, &declared, block) {
                    Some(xsi_type)
                } else {
                    reporter.report(ErrorCode::XsiTypeNotDerived, element, &args);
                    Some(declared)
                }
            }
            None => Some(xsi_type),
        }
    }

    fn characters(&mut self, text: &str) {
        if self.skip_depth.is_some() {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.text.push_str(text);
            if !frame.saw_text && text.chars().any(|c| !is_xml_whitespace(c)) {
                frame.saw_text = true;
            }
        }
    }

    /// Returns the default text to emit before the end tag, if any
    fn end_element(&mut self, reporter: &mut dyn ErrorReporter) -> Option<String> {
        let mut gate = Gate {
            inner: reporter,
            enabled: self.validating,
        };
        let default_text = self.finish_element(&mut gate);
        self.namespaces.pop_context();
        self.depth = self.depth.saturating_sub(1);
        default_text
    }

    fn finish_element(&mut self, reporter: &mut dyn ErrorReporter) -> Option<String> {
        if let Some(skip_depth) = self.skip_depth {
            if skip_depth == self.depth {
                self.skip_depth = None;
                self.frames.pop();
                log::debug!("leaving skipped subtree at depth {}", self.depth);
            }
            return None;
        }
        let frame = self.frames.last()?;
        let content = self.validate_content(frame, reporter);
        let raw = frame.raw.clone();

        let value = if frame.nil {
            None
        } else {
            let text = content.default_text.as_deref().unwrap_or(&frame.text);
            Some(content.value.clone().unwrap_or_else(|| XsdValue::String(collapse(text))))
        };
        if let (Some(value), Some(kind)) = (&content.value, content.id_kind) {
            register_ids(&mut self.ids, value, kind, &raw, reporter);
        }
        if self.validating {
            self.identities.end_element(value.as_ref(), &raw, reporter);
        }

        self.frames.pop();
        log::trace!("end <{}> at depth {}", raw, self.depth);
        if self.frames.is_empty() {
            for idref in self.ids.unresolved_idrefs() {
                reporter.report(ErrorCode::UnresolvedIdref, &raw, &[idref]);
            }
        }
        content.default_text
    }

    fn validate_content(&self, frame: &ElementFrame, reporter: &mut dyn ErrorReporter) -> Content {
        let Some(element_type) = &frame.element_type else {
            return Content::default();
        };
        if frame.nil_rejected {
            return Content::default();
        }
        let raw = &frame.raw;
        if frame.nil {
            if frame.child_count > 0 || !frame.text.is_empty() {
                reporter.report(ErrorCode::NilWithContent, raw, &[raw.clone()]);
            }
            return Content::default();
        }

        let decl = frame.decl.as_deref();
        let constraint = decl.and_then(|d| d.value_constraint.as_ref());
        if let (Some(decl), Some(constraint)) = (decl, constraint) {
            if frame.child_count == 0 && frame.text.is_empty() {
                let lexical = constraint.value();
                let declared = self.resolver.element_type(decl);
                if !declared.same_as(element_type) && !self.default_valid_for(element_type, lexical) {
                    reporter.report(
                        ErrorCode::InvalidDefaultForType,
                        raw,
                        &[raw.clone(), element_type.display_name(), lexical.to_string()],
                    );
                }
                let default_text = match self.value_type(element_type) {
                    Some(simple) => simple.normalize(lexical),
                    None => lexical.to_string(),
                };
                let (value, id_kind) = self.check_content(frame, element_type, &default_text, reporter);
                return Content {
                    value,
                    id_kind,
                    default_text: Some(default_text),
                };
            }
        }

        let (value, id_kind) = self.check_content(frame, element_type, &frame.text, reporter);
        if let Some(ValueConstraint::Fixed(fixed)) = constraint {
            self.check_fixed(frame, element_type, value.as_ref(), fixed, reporter);
        }
        Content {
            value,
            id_kind,
            default_text: None,
        }
    }

    /// Simple type of the element's value, for simple types and simple content
    fn value_type(&self, element_type: &XsdType) -> Option<Arc<XsdSimpleType>> {
        match element_type {
            XsdType::Simple(simple) => Some(Arc::clone(simple)),
            XsdType::Complex(complex) if complex.has_simple_content() => {
                Some(self.resolver.simple_type_of(complex.simple_type.as_ref()))
            }
            XsdType::Complex(_) => None,
        }
    }

    fn default_valid_for(&self, element_type: &XsdType, lexical: &str) -> bool {
        if let Some(simple) = self.value_type(element_type) {
            return simple.validate(lexical, &self.namespaces).is_ok();
        }
        match element_type {
            XsdType::Complex(complex) if complex.has_mixed_content() => complex
                .particle
                .as_ref()
                .map_or(true, |group| group.is_emptiable()),
            _ => false,
        }
    }

    fn check_content(
        &self,
        frame: &ElementFrame,
        element_type: &XsdType,
        text: &str,
        reporter: &mut dyn ErrorReporter,
    ) -> (Option<XsdValue>, Option<IdKind>) {
        let raw = &frame.raw;
        let complex = match element_type {
            XsdType::Simple(simple) => {
                if frame.child_count > 0 {
                    reporter.report(ErrorCode::SimpleTypeChildren, raw, &[raw.clone()]);
                    return (None, None);
                }
                return self.check_simple(simple, text, raw, reporter);
            }
            XsdType::Complex(complex) => complex,
        };
        match complex.content_type {
            ContentTypeLabel::Empty => {
                if frame.child_count > 0 || frame.saw_text {
                    reporter.report(ErrorCode::EmptyContent, raw, &[raw.clone()]);
                }
                (None, None)
            }
            ContentTypeLabel::Simple => {
                if frame.child_count > 0 {
                    reporter.report(ErrorCode::SimpleContentChildren, raw, &[raw.clone()]);
                    return (None, None);
                }
                let simple = self.resolver.simple_type_of(complex.simple_type.as_ref());
                self.check_simple(&simple, text, raw, reporter)
            }
            ContentTypeLabel::ElementOnly | ContentTypeLabel::Mixed => {
                if complex.is_element_only() && frame.saw_text {
                    reporter.report(ErrorCode::ElementOnlyText, raw, &[raw.clone()]);
                }
                if let (Some(model), ModelState::Valid(state)) = (&frame.content_model, &frame.state) {
                    if !model.is_accepting(state) {
                        reporter.report(
                            ErrorCode::IncompleteContent,
                            raw,
                            &[raw.clone(), expected_particles(model, state)],
                        );
                    }
                }
                (None, None)
            }
        }
    }

    fn check_simple(
        &self,
        simple: &XsdSimpleType,
        text: &str,
        element: &str,
        reporter: &mut dyn ErrorReporter,
    ) -> (Option<XsdValue>, Option<IdKind>) {
        match simple.validate(text, &self.namespaces) {
            Ok(value) => (Some(value), Some(simple.id_kind())),
            Err(e) => {
                reporter.report(
                    ErrorCode::SimpleTypeValue,
                    element,
                    &[element.to_string(), text.to_string(), e.to_string()],
                );
                (None, None)
            }
        }
    }

    fn check_fixed(
        &self,
        frame: &ElementFrame,
        element_type: &XsdType,
        value: Option<&XsdValue>,
        fixed: &str,
        reporter: &mut dyn ErrorReporter,
    ) {
        let raw = &frame.raw;
        let args = || [raw.clone(), frame.text.clone(), fixed.to_string()];
        if let XsdType::Complex(complex) = element_type {
            if frame.child_count > 0 {
                reporter.report(ErrorCode::FixedWithChildren, raw, &[raw.clone()]);
                return;
            }
            if complex.has_mixed_content() {
                if frame.text != fixed {
                    reporter.report(ErrorCode::FixedMixedMismatch, raw, &args());
                }
                return;
            }
        }
        if let (Some(simple), Some(value)) = (self.value_type(element_type), value) {
            if !simple.equals_lexical(value, fixed, &self.namespaces) {
                reporter.report(ErrorCode::FixedValueMismatch, raw, &args());
            }
        }
    }
}

/// Validating filter over a document event stream
///
/// ```rust,ignore
/// let mut validator = SchemaValidator::new(resolver);
/// reader::parse_str(xml, &mut validator)?;
/// for diagnostic in validator.reporter().diagnostics() {
///     println!("{}", diagnostic);
/// }
/// ```
pub struct SchemaValidator<H = NullHandler, R = DiagnosticCollector> {
    context: ValidationContext,
    handler: H,
    reporter: R,
}

impl SchemaValidator {
    /// Create a validator that collects diagnostics and drops the events
    pub fn new(resolver: GrammarResolver) -> Self {
        Self::with_parts(resolver, ValidatorConfig::default(), NullHandler, DiagnosticCollector::new())
    }
}

impl<H: DocumentHandler, R: ErrorReporter> SchemaValidator<H, R> {
    /// Create a validator from all of its parts
    pub fn with_parts(resolver: GrammarResolver, config: ValidatorConfig, handler: H, reporter: R) -> Self {
        Self {
            context: ValidationContext::new(resolver, config),
            handler,
            reporter,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.context.config = config;
        self.context.reset();
        self
    }

    /// The configuration
    pub fn config(&self) -> &ValidatorConfig {
        &self.context.config
    }

    /// Set a flag by feature URI; takes effect at the next root element
    pub fn set_feature(&mut self, name: &str, value: bool) -> Result<()> {
        self.context.config.set_feature(name, value)
    }

    /// The grammar resolver, including grammars loaded during the run
    pub fn resolver(&self) -> &GrammarResolver {
        &self.context.resolver
    }

    /// Mutable access to the grammar resolver
    pub fn resolver_mut(&mut self) -> &mut GrammarResolver {
        &mut self.context.resolver
    }

    /// The downstream handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the downstream handler
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// The diagnostics sink
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Mutable access to the diagnostics sink
    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Give back the handler and the reporter
    pub fn into_parts(self) -> (H, R) {
        (self.handler, self.reporter)
    }

    /// Frames of the open elements, outermost first
    pub fn frames(&self) -> &[ElementFrame] {
        &self.context.frames
    }

    /// Frame of the innermost open element
    pub fn current_frame(&self) -> Option<&ElementFrame> {
        self.context.frames.last()
    }

    /// Number of open elements, skipped ones included
    pub fn depth(&self) -> usize {
        self.context.depth
    }

    /// Check whether the current subtree is passed through unvalidated
    pub fn is_skipping(&self) -> bool {
        self.context.skip_depth.is_some()
    }

    /// Check whether findings are reported for the current document
    pub fn is_validating(&self) -> bool {
        self.context.validating
    }

    /// Drop all per-document state
    pub fn reset(&mut self) {
        self.context.reset();
    }
}

impl<H: DocumentHandler, R: ErrorReporter> DocumentHandler for SchemaValidator<H, R> {
    fn start_document(&mut self) -> Result<()> {
        self.context.reset();
        self.handler.start_document()
    }

    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<&str>) -> Result<()> {
        self.handler.xml_decl(version, encoding, standalone)
    }

    fn doctype(&mut self, text: &str) -> Result<()> {
        self.handler.doctype(text)
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.context
            .pending_bindings
            .push((prefix.to_string(), uri.to_string()));
        self.handler.start_prefix_mapping(prefix, uri)
    }

    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
        self.handler.end_prefix_mapping(prefix)
    }

    fn start_element(&mut self, name: &XmlName, attributes: &Attributes) -> Result<()> {
        let attributes = self.context.start_element(name, attributes, &mut self.reporter)?;
        self.handler.start_element(name, &attributes)
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.context.characters(text);
        self.handler.characters(text)
    }

    fn end_element(&mut self, name: &XmlName) -> Result<()> {
        if let Some(text) = self.context.end_element(&mut self.reporter) {
            self.handler.characters(&text)?;
        }
        self.handler.end_element(name)
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.handler.comment(text)
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        self.handler.processing_instruction(target, data)
    }

    fn start_cdata(&mut self) -> Result<()> {
        self.handler.start_cdata()
    }

    fn end_cdata(&mut self) -> Result<()> {
        self.handler.end_cdata()
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        self.handler.start_entity(name)
    }

    fn end_entity(&mut self, name: &str) -> Result<()> {
        self.handler.end_entity(name)
    }

    fn end_document(&mut self) -> Result<()> {
        self.context.finish();
        self.handler.end_document()
    }
}
