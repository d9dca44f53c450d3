//! XSD Model Group declarations
//!
//! This module implements model groups for XSD content models:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content (elements only)
//!
//! Groups are pure data; [`super::models`] compiles them into automata.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Model_Groups

use crate::namespaces::QName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::elements::XsdElement;
use super::particles::Occurs;
use super::wildcards::XsdWildcard;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of element particles
    All,
}

impl ModelType {
    /// Parse from element tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" | "{http://www.w3.org/2001/XMLSchema}sequence" => Some(Self::Sequence),
            "choice" | "{http://www.w3.org/2001/XMLSchema}choice" => Some(Self::Choice),
            "all" | "{http://www.w3.org/2001/XMLSchema}all" => Some(Self::All),
            _ => None,
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            Self::Sequence => ", ",
            Self::Choice => " | ",
            Self::All => " & ",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// The declaration an element particle stands for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementTerm {
    /// A local declaration owned by the content model
    Local(Arc<XsdElement>),
    /// A reference to a global declaration (substitutable)
    Global(QName),
}

impl ElementTerm {
    /// Name the particle matches
    pub fn name(&self) -> &QName {
        match self {
            Self::Local(decl) => &decl.name,
            Self::Global(name) => name,
        }
    }
}

/// A particle in a model group (element, wildcard, or nested group)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupParticle {
    /// Element particle
    Element {
        /// Local declaration or global reference
        term: ElementTerm,
        /// Occurrence bounds
        #[serde(default)]
        occurs: Occurs,
    },
    /// Wildcard (xs:any), carrying its own occurrence bounds
    Any(XsdWildcard),
    /// Nested model group
    Group(XsdGroup),
}

impl GroupParticle {
    /// A local element declaration occurring once
    pub fn element(decl: Arc<XsdElement>) -> Self {
        Self::Element {
            term: ElementTerm::Local(decl),
            occurs: Occurs::once(),
        }
    }

    /// A reference to a global element occurring once
    pub fn element_ref(name: QName) -> Self {
        Self::Element {
            term: ElementTerm::Global(name),
            occurs: Occurs::once(),
        }
    }

    /// Replace the occurrence bounds
    pub fn with_occurs(self, occurs: Occurs) -> Self {
        match self {
            Self::Element { term, .. } => Self::Element { term, occurs },
            Self::Any(wildcard) => Self::Any(wildcard.with_occurs(occurs)),
            Self::Group(group) => Self::Group(group.with_occurs(occurs)),
        }
    }

    /// Get the occurrence constraints
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element { occurs, .. } => *occurs,
            Self::Any(a) => a.occurs,
            Self::Group(g) => g.occurs,
        }
    }

    /// Check if this particle is emptiable
    pub fn is_emptiable(&self) -> bool {
        match self {
            Self::Group(g) => g.is_emptiable(),
            other => other.occurs().is_emptiable(),
        }
    }
}

impl fmt::Display for GroupParticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element { term, occurs } => write!(f, "{}{}", term.name(), occurs.suffix()),
            Self::Any(wildcard) => write!(f, "{}{}", wildcard, wildcard.occurs.suffix()),
            Self::Group(group) => write!(f, "{}", group),
        }
    }
}

/// XSD Model Group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XsdGroup {
    /// Compositor
    pub model: ModelType,
    /// Particles in declaration order
    #[serde(default)]
    pub particles: Vec<GroupParticle>,
    /// Occurrence bounds of the group itself
    #[serde(default)]
    pub occurs: Occurs,
}

impl XsdGroup {
    /// Create a group
    pub fn new(model: ModelType, particles: Vec<GroupParticle>) -> Self {
        Self {
            model,
            particles,
            occurs: Occurs::once(),
        }
    }

    /// An `xs:sequence`
    pub fn sequence(particles: Vec<GroupParticle>) -> Self {
        Self::new(ModelType::Sequence, particles)
    }

    /// An `xs:choice`
    pub fn choice(particles: Vec<GroupParticle>) -> Self {
        Self::new(ModelType::Choice, particles)
    }

    /// An `xs:all`
    pub fn all(particles: Vec<GroupParticle>) -> Self {
        Self::new(ModelType::All, particles)
    }

    /// Set the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Check if the group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Check if the group can match no content
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.is_emptiable() || self.particles.is_empty() {
            return true;
        }
        match self.model {
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().all(|p| p.is_emptiable())
            }
            ModelType::Choice => self.particles.iter().any(|p| p.is_emptiable()),
        }
    }
}

impl fmt::Display for XsdGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.particles.iter().map(|p| p.to_string()).collect();
        write!(
            f,
            "({}){}",
            items.join(self.model.separator()),
            self.occurs.suffix()
        )
    }
}
