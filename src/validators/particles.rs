//! XSD Particle occurrence bounds
//!
//! Particles carry minOccurs/maxOccurs for elements, wildcards and model
//! groups. The content model compiler unrolls these bounds into automaton
//! states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max_occurs means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Occurrence suffix used when printing particles (`?`, `*`, `+`, `{2,5}`)
    pub fn suffix(&self) -> String {
        match (self.min, self.max) {
            (1, Some(1)) => String::new(),
            (0, Some(1)) => "?".to_string(),
            (0, None) => "*".to_string(),
            (1, None) => "+".to_string(),
            (min, None) => format!("{{{},}}", min),
            (min, Some(max)) if min == max => format!("{{{}}}", min),
            (min, Some(max)) => format!("{{{},{}}}", min, max),
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, unbounded]", self.min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_presets() {
        assert_eq!(Occurs::once(), Occurs::new(1, Some(1)));
        assert_eq!(Occurs::optional(), Occurs::new(0, Some(1)));
        assert_eq!(Occurs::zero_or_more(), Occurs::new(0, None));
        assert_eq!(Occurs::one_or_more(), Occurs::new(1, None));
        assert_eq!(Occurs::default(), Occurs::once());
    }

    #[test]
    fn test_occurs_counting() {
        let occurs = Occurs::new(2, Some(5));
        assert!(occurs.is_missing(1));
        assert!(!occurs.is_missing(2));
        assert!(!occurs.is_over(4));
        assert!(occurs.is_over(5));
        assert!(!Occurs::zero_or_more().is_over(1000));
        assert!(Occurs::new(0, Some(0)).is_empty());
    }

    #[test]
    fn test_occurs_suffix() {
        assert_eq!(Occurs::once().suffix(), "");
        assert_eq!(Occurs::optional().suffix(), "?");
        assert_eq!(Occurs::zero_or_more().suffix(), "*");
        assert_eq!(Occurs::one_or_more().suffix(), "+");
        assert_eq!(Occurs::new(2, Some(5)).suffix(), "{2,5}");
        assert_eq!(Occurs::new(3, Some(3)).suffix(), "{3}");
        assert_eq!(Occurs::new(2, None).to_string(), "[2, unbounded]");
    }
}
