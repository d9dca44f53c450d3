//! XSD constraining facets
//!
//! Facets are checked after the lexical value has been whitespace-normalized
//! and parsed by the base datatype. Length and pattern facets look at the
//! lexical or item form, enumeration and range facets compare in the value
//! space of the base type.

use super::builtins::{ValueError, XsdValue};
use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => {
                let mut result = String::with_capacity(s.len());
                let mut prev_space = true; // trims leading spaces

                for c in s.chars() {
                    if matches!(c, ' ' | '\t' | '\n' | '\r') {
                        if !prev_space {
                            result.push(' ');
                            prev_space = true;
                        }
                    } else {
                        result.push(c);
                        prev_space = false;
                    }
                }

                if result.ends_with(' ') {
                    result.pop();
                }
                result
            }
        }
    }
}

/// The constraining facets of a simple type
///
/// Range bounds and enumeration members are kept in lexical form and parsed
/// with the owning type's datatype when checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetSet {
    /// whiteSpace facet, overriding the datatype's own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_space: Option<WhiteSpace>,
    /// length facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// minLength facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// maxLength facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// pattern facets (all must match)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    /// enumeration facet members
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
    /// minInclusive facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<String>,
    /// maxInclusive facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<String>,
    /// minExclusive facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_exclusive: Option<String>,
    /// maxExclusive facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_exclusive: Option<String>,
    /// totalDigits facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_digits: Option<u32>,
    /// fractionDigits facet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<u32>,
    #[serde(skip)]
    compiled: OnceCell<Vec<Regex>>,
}

impl FacetSet {
    /// Create an empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern facet (XSD regular expression syntax)
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self.compiled = OnceCell::new();
        self
    }

    /// Add enumeration members
    pub fn with_enumeration<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration.extend(values.into_iter().map(Into::into));
        self
    }

    /// Set the whiteSpace facet
    pub fn with_white_space(mut self, ws: WhiteSpace) -> Self {
        self.white_space = Some(ws);
        self
    }

    /// Set inclusive bounds
    pub fn with_range(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_inclusive = min.map(str::to_string);
        self.max_inclusive = max.map(str::to_string);
        self
    }

    /// Set the length facets
    pub fn with_length_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Check if no facet is set
    pub fn is_empty(&self) -> bool {
        self.white_space.is_none()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.patterns.is_empty()
            && self.enumeration.is_empty()
            && self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.min_exclusive.is_none()
            && self.max_exclusive.is_none()
            && self.total_digits.is_none()
            && self.fraction_digits.is_none()
    }

    fn regexes(&self) -> &[Regex] {
        self.compiled.get_or_init(|| {
            self.patterns
                .iter()
                .filter_map(|p| match Regex::new(&translate_pattern(p)) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("ignoring pattern facet '{}': {}", p, e);
                        None
                    }
                })
                .collect()
        })
    }

    /// Check a parsed value against the facets
    ///
    /// `lexical` is the normalized lexical form, `parse` parses facet values
    /// with the owning type's datatype.
    pub fn validate<F>(&self, lexical: &str, value: &XsdValue, parse: F) -> Result<(), ValueError>
    where
        F: Fn(&str) -> Result<XsdValue, ValueError>,
    {
        let fail = |facet: &'static str, reason: String| ValueError::Facet {
            value: lexical.to_string(),
            facet,
            reason,
        };

        if let Some(len) = value.facet_length() {
            if let Some(expected) = self.length {
                if len != expected {
                    return Err(fail("length", format!("length must be {}, got {}", expected, len)));
                }
            }
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(fail("minLength", format!("length must be at least {}", min)));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(fail("maxLength", format!("length must be at most {}", max)));
                }
            }
        }

        for re in self.regexes() {
            if !re.is_match(lexical) {
                return Err(fail("pattern", format!("does not match '{}'", re.as_str())));
            }
        }

        if !self.enumeration.is_empty() {
            let found = self
                .enumeration
                .iter()
                .any(|member| parse(member).map_or(false, |m| &m == value));
            if !found {
                return Err(fail(
                    "enumeration",
                    format!("must be one of {:?}", self.enumeration),
                ));
            }
        }

        let bounds: [(&'static str, &Option<String>, &[Ordering]); 4] = [
            ("minInclusive", &self.min_inclusive, &[Ordering::Greater, Ordering::Equal]),
            ("maxInclusive", &self.max_inclusive, &[Ordering::Less, Ordering::Equal]),
            ("minExclusive", &self.min_exclusive, &[Ordering::Greater]),
            ("maxExclusive", &self.max_exclusive, &[Ordering::Less]),
        ];
        for (facet, bound, allowed) in bounds {
            if let Some(bound) = bound {
                let bound_value = parse(bound)?;
                match value.compare(&bound_value) {
                    Some(ord) if allowed.contains(&ord) => {}
                    _ => return Err(fail(facet, format!("bound is {}", bound))),
                }
            }
        }

        if let XsdValue::Decimal(d) = value {
            if let Some(total) = self.total_digits {
                if total_digits(d) > total {
                    return Err(fail("totalDigits", format!("at most {} digits", total)));
                }
            }
            if let Some(fraction) = self.fraction_digits {
                if d.normalize().scale() > fraction {
                    return Err(fail(
                        "fractionDigits",
                        format!("at most {} fraction digits", fraction),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn total_digits(d: &Decimal) -> u32 {
    let normalized = d.normalize();
    let digits = normalized.mantissa().unsigned_abs().to_string();
    let significant = digits.trim_start_matches('0').len() as u32;
    significant.max(normalized.scale()).max(1)
}

/// Translate an XSD regular expression into an anchored `regex` pattern
///
/// XSD patterns match the whole value and support the `\i`/`\c` name
/// character classes, which have no `regex` equivalent.
pub fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('i') => out.push_str("[_:A-Za-z]"),
                Some('I') => out.push_str("[^_:A-Za-z]"),
                Some('c') => out.push_str(r"[\-._:A-Za-z0-9]"),
                Some('C') => out.push_str(r"[^\-._:A-Za-z0-9]"),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push_str(r"\\"),
            }
        } else {
            out.push(c);
        }
    }
    format!("^(?:{})$", out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;
    use crate::validators::builtins::BuiltinType;

    fn check(facets: &FacetSet, t: BuiltinType, lexical: &str) -> Result<(), ValueError> {
        let ns = NamespaceContext::new();
        let value = t.parse(lexical, &ns)?;
        facets.validate(lexical, &value, |s| t.parse(s, &ns))
    }

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Preserve.normalize(" a\tb "), " a\tb ");
        assert_eq!(WhiteSpace::Replace.normalize(" a\tb\n"), " a b ");
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t\n b  "), "a b");
        assert_eq!(WhiteSpace::Collapse.normalize("   "), "");
        assert_eq!(WhiteSpace::from_str("collapse"), Some(WhiteSpace::Collapse));
    }

    #[test]
    fn test_length_facets() {
        let facets = FacetSet::new().with_length_bounds(Some(2), Some(4));
        assert!(check(&facets, BuiltinType::String, "abc").is_ok());
        assert!(check(&facets, BuiltinType::String, "a").is_err());
        assert!(check(&facets, BuiltinType::String, "abcde").is_err());
    }

    #[test]
    fn test_pattern_facet() {
        let facets = FacetSet::new().with_pattern(r"\d{3}-\d{4}");
        assert!(check(&facets, BuiltinType::String, "123-4567").is_ok());
        // patterns are anchored
        assert!(check(&facets, BuiltinType::String, "x123-4567").is_err());
    }

    #[test]
    fn test_name_class_escapes() {
        let facets = FacetSet::new().with_pattern(r"\i\c*");
        assert!(check(&facets, BuiltinType::String, "a-b.c").is_ok());
        assert!(check(&facets, BuiltinType::String, "1ab").is_err());
    }

    #[test]
    fn test_enumeration_compares_values() {
        let facets = FacetSet::new().with_enumeration(["1", "2"]);
        assert!(check(&facets, BuiltinType::Integer, "01").is_ok());
        assert!(check(&facets, BuiltinType::Integer, "3").is_err());
    }

    #[test]
    fn test_range_facets() {
        let facets = FacetSet::new().with_range(Some("10"), Some("100"));
        assert!(check(&facets, BuiltinType::Integer, "10").is_ok());
        assert!(check(&facets, BuiltinType::Integer, "100").is_ok());
        assert!(check(&facets, BuiltinType::Integer, "9").is_err());

        let mut exclusive = FacetSet::new();
        exclusive.max_exclusive = Some("2024-01-01".into());
        assert!(check(&exclusive, BuiltinType::Date, "2023-12-31").is_ok());
        assert!(check(&exclusive, BuiltinType::Date, "2024-01-01").is_err());
    }

    #[test]
    fn test_digit_facets() {
        let mut facets = FacetSet::new();
        facets.total_digits = Some(5);
        facets.fraction_digits = Some(2);
        assert!(check(&facets, BuiltinType::Decimal, "123.45").is_ok());
        assert!(check(&facets, BuiltinType::Decimal, "1.50").is_ok());
        assert!(check(&facets, BuiltinType::Decimal, "1234.56").is_err());
        assert!(check(&facets, BuiltinType::Decimal, "1.234").is_err());
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("[a-z]+"), "^(?:[a-z]+)$");
        assert!(FacetSet::new().is_empty());
        assert!(!FacetSet::new().with_pattern("x").is_empty());
    }
}
