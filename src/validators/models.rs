//! XSD Content Model automata
//!
//! A complex type's model group is compiled once into a [`ContentModel`]:
//! an NFA whose state is the epsilon-closed set of reachable positions, kept
//! as a sorted vector of integers. Occurrence bounds are unrolled; copies of a
//! body that can match nothing are rebuilt to consume at least one child, so
//! the live set stays small for bounds such as `(b?){0,5000}`. A top-level
//! `xs:all` group is compiled into a counting automaton instead, whose state
//! vector holds one occurrence count per particle. An `xs:all` nested in
//! another group is compiled as a repeated choice of its members: order is
//! free, but neither required members nor the one-occurrence bound are
//! enforced.
//!
//! Element particles that reference global declarations also match members
//! of the head's substitution group; membership is resolved through the
//! [`GrammarResolver`] at match time.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cvc-model-group

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::namespaces::QName;

use super::elements::XsdElement;
use super::globals::GrammarResolver;
use super::groups::{ElementTerm, GroupParticle, ModelType, XsdGroup};
use super::particles::Occurs;
use super::wildcards::XsdWildcard;

/// Automaton state identifier
pub type StateId = u32;

/// What a child element matched in the content model
#[derive(Debug, Clone)]
pub enum MatchedParticle {
    /// An element declaration (possibly a substitution group member)
    Element(Arc<XsdElement>),
    /// An element wildcard
    Wildcard(Arc<XsdWildcard>),
}

/// Per-element content model state, as kept in an element frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// Positions reached so far
    Valid(Vec<StateId>),
    /// The first invalid child was just reported
    FirstError,
    /// Children after the first invalid one
    SubsequentError,
}

impl ModelState {
    /// Check whether no content error occurred yet
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

#[derive(Debug, Clone)]
enum Term {
    Element(ElementTerm),
    Wildcard(Arc<XsdWildcard>),
}

impl Term {
    fn match_name(&self, name: &QName, resolver: &GrammarResolver) -> Option<MatchedParticle> {
        match self {
            Term::Element(ElementTerm::Local(decl)) => {
                (decl.name == *name).then(|| MatchedParticle::Element(Arc::clone(decl)))
            }
            Term::Element(ElementTerm::Global(head)) if head == name => {
                let decl = resolver.get_global_element(head).unwrap_or_else(|| {
                    log::warn!("element reference {} has no global declaration", head);
                    Arc::new(XsdElement::new(head.clone()))
                });
                Some(MatchedParticle::Element(decl))
            }
            Term::Element(ElementTerm::Global(head)) => resolver
                .substitution_member(name, head)
                .map(MatchedParticle::Element),
            Term::Wildcard(wildcard) => wildcard
                .allows(name.namespace())
                .then(|| MatchedParticle::Wildcard(Arc::clone(wildcard))),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, Term::Wildcard(_))
    }

    fn label(&self) -> String {
        match self {
            Term::Element(term) => term.name().to_string(),
            Term::Wildcard(wildcard) => wildcard.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct NfaNode {
    edges: Vec<(usize, StateId)>,
    epsilon: Vec<StateId>,
}

#[derive(Debug)]
enum Automaton {
    Nfa {
        nodes: Vec<NfaNode>,
        initial: Vec<StateId>,
        accepting: StateId,
    },
    All {
        particles: Vec<(usize, Occurs)>,
        emptiable: bool,
    },
}

/// Compiled content model of one complex type
#[derive(Debug)]
pub struct ContentModel {
    terms: Vec<Term>,
    automaton: Automaton,
    description: String,
}

impl ContentModel {
    /// Compile a model group
    pub fn compile(group: &XsdGroup) -> Self {
        let description = group.to_string();
        if group.model == ModelType::All && !group.particles.is_empty() {
            if let Some(model) = Self::compile_all(group, &description) {
                return model;
            }
            log::warn!(
                "all group {} holds non-element particles; compiled as a repeated choice",
                description
            );
        }

        let mut builder = NfaBuilder::default();
        let start = builder.add_state();
        let accepting = builder.group(group, start);
        let mut initial = BTreeSet::new();
        close_into(&builder.nodes, start, &mut initial);
        log::trace!("compiled {} into {} states", description, builder.nodes.len());
        Self {
            terms: builder.terms,
            automaton: Automaton::Nfa {
                nodes: builder.nodes,
                initial: initial.into_iter().collect(),
                accepting,
            },
            description,
        }
    }

    fn compile_all(group: &XsdGroup, description: &str) -> Option<Self> {
        let mut terms = Vec::with_capacity(group.particles.len());
        let mut particles = Vec::with_capacity(group.particles.len());
        for particle in &group.particles {
            match particle {
                GroupParticle::Element { term, occurs } => {
                    particles.push((terms.len(), *occurs));
                    terms.push(Term::Element(term.clone()));
                }
                _ => return None,
            }
        }
        Some(Self {
            terms,
            automaton: Automaton::All {
                particles,
                emptiable: group.occurs.is_emptiable(),
            },
            description: description.to_string(),
        })
    }

    /// Textual form of the model, used in diagnostics
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Initial state
    pub fn start(&self) -> Vec<StateId> {
        match &self.automaton {
            Automaton::Nfa { initial, .. } => initial.clone(),
            Automaton::All { particles, .. } => vec![0; particles.len()],
        }
    }

    /// Advance over a child element
    ///
    /// Returns the next state and what the child matched, or `None` when the
    /// child is not allowed here. Element particles win over wildcards.
    pub fn transition(
        &self,
        state: &[StateId],
        name: &QName,
        resolver: &GrammarResolver,
    ) -> Option<(Vec<StateId>, MatchedParticle)> {
        match &self.automaton {
            Automaton::Nfa { nodes, .. } => {
                let mut element_match: Option<(MatchedParticle, BTreeSet<StateId>)> = None;
                let mut wildcard_match: Option<(MatchedParticle, BTreeSet<StateId>)> = None;
                for node in state.iter().filter_map(|&s| nodes.get(s as usize)) {
                    for &(term_index, target) in &node.edges {
                        let term = &self.terms[term_index];
                        let slot = if term.is_wildcard() {
                            &mut wildcard_match
                        } else {
                            &mut element_match
                        };
                        if let Some((_, targets)) = slot.as_mut() {
                            if term.match_name(name, resolver).is_some() {
                                close_into(nodes, target, targets);
                            }
                        } else if let Some(matched) = term.match_name(name, resolver) {
                            let mut targets = BTreeSet::new();
                            close_into(nodes, target, &mut targets);
                            *slot = Some((matched, targets));
                        }
                    }
                }
                element_match
                    .or(wildcard_match)
                    .map(|(matched, targets)| (targets.into_iter().collect(), matched))
            }
            Automaton::All { particles, .. } => {
                if state.len() != particles.len() {
                    return None;
                }
                particles.iter().enumerate().find_map(|(i, &(term_index, occurs))| {
                    if occurs.is_over(state[i]) {
                        return None;
                    }
                    self.terms[term_index].match_name(name, resolver).map(|matched| {
                        let mut next = state.to_vec();
                        next[i] += 1;
                        (next, matched)
                    })
                })
            }
        }
    }

    /// Check whether the content may end in `state`
    pub fn is_accepting(&self, state: &[StateId]) -> bool {
        match &self.automaton {
            Automaton::Nfa { accepting, .. } => state.contains(accepting),
            Automaton::All { particles, emptiable } => {
                if state.len() != particles.len() {
                    return false;
                }
                (*emptiable && state.iter().all(|&c| c == 0))
                    || particles
                        .iter()
                        .zip(state)
                        .all(|((_, occurs), &count)| !occurs.is_missing(count))
            }
        }
    }

    /// Particles that may follow in `state`
    pub fn expected(&self, state: &[StateId]) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        let mut push = |label: String| {
            if !labels.contains(&label) {
                labels.push(label);
            }
        };
        match &self.automaton {
            Automaton::Nfa { nodes, .. } => {
                for node in state.iter().filter_map(|&s| nodes.get(s as usize)) {
                    for &(term_index, _) in &node.edges {
                        push(self.terms[term_index].label());
                    }
                }
            }
            Automaton::All { particles, .. } => {
                for (i, &(term_index, occurs)) in particles.iter().enumerate() {
                    if state.get(i).is_some_and(|&count| !occurs.is_over(count)) {
                        push(self.terms[term_index].label());
                    }
                }
            }
        }
        labels
    }
}

#[derive(Debug, Default)]
struct NfaBuilder {
    nodes: Vec<NfaNode>,
    terms: Vec<Term>,
}

impl NfaBuilder {
    fn add_state(&mut self) -> StateId {
        self.nodes.push(NfaNode::default());
        (self.nodes.len() - 1) as StateId
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        if from != to {
            self.nodes[from as usize].epsilon.push(to);
        }
    }

    fn edge(&mut self, from: StateId, term: Term) -> StateId {
        let term_index = self.terms.len();
        self.terms.push(term);
        let to = self.add_state();
        self.nodes[from as usize].edges.push((term_index, to));
        to
    }

    /// Build `body` from a fresh state; its nodes are the tail of `nodes`
    fn fragment<F>(&mut self, body: &mut F) -> (StateId, StateId)
    where
        F: FnMut(&mut Self, StateId) -> StateId,
    {
        let entry = self.add_state();
        let exit = body(self, entry);
        (entry, exit)
    }

    /// Turn the most recent fragment into one that consumes at least one child
    ///
    /// The fragment is duplicated: the original copy tracks "nothing consumed
    /// yet" and every edge leaving it lands in the duplicate.
    fn non_empty(&mut self, (entry, exit): (StateId, StateId)) -> (StateId, StateId) {
        let first = entry as usize;
        let last = self.nodes.len();
        let offset = (last - first) as StateId;
        for i in first..last {
            let mut node = self.nodes[i].clone();
            node.edges.iter_mut().for_each(|(_, to)| *to += offset);
            node.epsilon.iter_mut().for_each(|to| *to += offset);
            self.nodes.push(node);
        }
        for node in &mut self.nodes[first..last] {
            node.edges.iter_mut().for_each(|(_, to)| *to += offset);
        }
        (entry, exit + offset)
    }

    fn is_emptiable(&self, (entry, exit): (StateId, StateId)) -> bool {
        let mut reached = BTreeSet::new();
        close_into(&self.nodes, entry, &mut reached);
        reached.contains(&exit)
    }

    fn repeat<F>(&mut self, start: StateId, occurs: Occurs, mut body: F) -> StateId
    where
        F: FnMut(&mut Self, StateId) -> StateId,
    {
        let first = self.fragment(&mut body);
        if self.is_emptiable(first) {
            // body{min,max} == (body minus the empty sequence){0,max}
            let mut spare = Some(self.non_empty(first));
            let mut next = |b: &mut Self| match spare.take() {
                Some(fragment) => fragment,
                None => {
                    let fragment = b.fragment(&mut body);
                    b.non_empty(fragment)
                }
            };
            return match occurs.max {
                None => {
                    let head = self.add_state();
                    self.epsilon(start, head);
                    let (entry, exit) = next(self);
                    self.epsilon(head, entry);
                    self.epsilon(exit, head);
                    head
                }
                Some(0) => start,
                Some(max) => {
                    let end = self.add_state();
                    self.epsilon(start, end);
                    let mut current = start;
                    for _ in 0..max {
                        let (entry, exit) = next(self);
                        self.epsilon(current, entry);
                        self.epsilon(exit, end);
                        current = exit;
                    }
                    end
                }
            };
        }

        let mut spare = Some(first);
        let mut next = |b: &mut Self| match spare.take() {
            Some(fragment) => fragment,
            None => b.fragment(&mut body),
        };
        let mut current = start;
        for _ in 0..occurs.min {
            let (entry, exit) = next(self);
            self.epsilon(current, entry);
            current = exit;
        }
        match occurs.max {
            None => {
                let head = self.add_state();
                self.epsilon(current, head);
                let (entry, exit) = next(self);
                self.epsilon(head, entry);
                self.epsilon(exit, head);
                head
            }
            Some(max) if max <= occurs.min => current,
            Some(max) => {
                let end = self.add_state();
                self.epsilon(current, end);
                for _ in occurs.min..max {
                    let (entry, exit) = next(self);
                    self.epsilon(current, entry);
                    current = exit;
                    self.epsilon(current, end);
                }
                end
            }
        }
    }

    fn particle(&mut self, particle: &GroupParticle, start: StateId) -> StateId {
        self.repeat(start, particle.occurs(), |b, s| b.single(particle, s))
    }

    fn single(&mut self, particle: &GroupParticle, start: StateId) -> StateId {
        match particle {
            GroupParticle::Element { term, .. } => self.edge(start, Term::Element(term.clone())),
            GroupParticle::Any(wildcard) => self.edge(start, Term::Wildcard(Arc::new(wildcard.clone()))),
            GroupParticle::Group(group) => self.group_body(group, start),
        }
    }

    fn group(&mut self, group: &XsdGroup, start: StateId) -> StateId {
        self.repeat(start, group.occurs, |b, s| b.group_body(group, s))
    }

    fn group_body(&mut self, group: &XsdGroup, start: StateId) -> StateId {
        match group.model {
            ModelType::Sequence => group
                .particles
                .iter()
                .fold(start, |current, p| self.particle(p, current)),
            ModelType::Choice if group.particles.is_empty() => start,
            ModelType::Choice => {
                let end = self.add_state();
                for p in &group.particles {
                    let branch = self.particle(p, start);
                    self.epsilon(branch, end);
                }
                end
            }
            ModelType::All => {
                let head = self.add_state();
                self.epsilon(start, head);
                for p in &group.particles {
                    let end = self.particle(p, head);
                    self.epsilon(end, head);
                }
                head
            }
        }
    }
}

/// Add `state` and everything reachable from it over epsilon moves
fn close_into(nodes: &[NfaNode], state: StateId, into: &mut BTreeSet<StateId>) {
    let mut pending = vec![state];
    while let Some(s) = pending.pop() {
        if into.insert(s) {
            if let Some(node) = nodes.get(s as usize) {
                pending.extend(&node.epsilon);
            }
        }
    }
}
