//! XSD built-in types
//!
//! The built-in primitive and derived datatypes, their lexical parsers and
//! the typed values they produce. Typed values carry value-space equality
//! (`"01"` and `"1"` are the same integer) which identity constraints and
//! enumeration facets rely on.

use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};
use crate::namespaces::{NamespaceContext, QName};
use base64::Engine;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use crate::namespaces::XSD_NAMESPACE;

// =============================================================================
// Value errors
// =============================================================================

/// A lexical or value-space failure raised by a datatype or facet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The lexical form is not valid for the datatype
    #[error("'{value}' is not a valid value for '{type_name}'")]
    Lexical {
        /// Offending lexical value
        value: String,
        /// Datatype name
        type_name: String,
    },
    /// The value is outside the datatype's range
    #[error("'{value}' is out of range for '{type_name}'")]
    OutOfRange {
        /// Offending value
        value: String,
        /// Datatype name
        type_name: String,
    },
    /// A constraining facet rejected the value
    #[error("'{value}' violates facet '{facet}': {reason}")]
    Facet {
        /// Offending value
        value: String,
        /// Facet name
        facet: &'static str,
        /// Human readable detail
        reason: String,
    },
    /// A QName value uses an unbound prefix
    #[error("prefix '{0}' is not bound to a namespace")]
    UnboundPrefix(String),
    /// No member of a union accepted the value
    #[error("'{0}' does not match any member of the union")]
    NoUnionMember(String),
}

impl ValueError {
    fn lexical(value: &str, type_name: &str) -> Self {
        ValueError::Lexical {
            value: value.to_string(),
            type_name: type_name.to_string(),
        }
    }

    fn out_of_range(value: &str, type_name: &str) -> Self {
        ValueError::OutOfRange {
            value: value.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

// =============================================================================
// XSD Value Representation
// =============================================================================

/// Date/time flavour of an [`XsdDateTime`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    /// xs:dateTime
    DateTime,
    /// xs:date
    Date,
    /// xs:time
    Time,
}

/// A dateTime/date/time value with optional timezone offset (minutes)
#[derive(Debug, Clone, Copy)]
pub struct XsdDateTime {
    /// Which primitive this value belongs to
    pub kind: DateTimeKind,
    /// Local (not timezone-adjusted) timestamp
    pub local: NaiveDateTime,
    /// Timezone offset in minutes, if one was given
    pub offset_minutes: Option<i32>,
}

impl XsdDateTime {
    /// The timestamp normalized to UTC, or the local one without timezone
    fn normalized(&self) -> NaiveDateTime {
        match self.offset_minutes {
            Some(offset) => self.local - Duration::minutes(offset as i64),
            None => self.local,
        }
    }

    /// Partial order: values with and without timezone are incomparable
    pub fn compare(&self, other: &XsdDateTime) -> Option<Ordering> {
        if self.kind != other.kind
            || self.offset_minutes.is_some() != other.offset_minutes.is_some()
        {
            return None;
        }
        Some(self.normalized().cmp(&other.normalized()))
    }
}

/// Represents any XSD atomic or list value
#[derive(Debug, Clone)]
pub enum XsdValue {
    /// String value (string-derived types, anySimpleType)
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Decimal value (decimal and the integer family)
    Decimal(Decimal),
    /// Float value
    Float(f64),
    /// Double value
    Double(f64),
    /// dateTime, date or time value
    DateTime(XsdDateTime),
    /// Duration value (ISO 8601 lexical form)
    Duration(String),
    /// gYear, gMonth, ... values, kept lexically with their type name
    Gregorian(&'static str, String),
    /// hexBinary value
    HexBinary(Vec<u8>),
    /// base64Binary value
    Base64Binary(Vec<u8>),
    /// URI value
    Uri(String),
    /// Resolved QName value
    QName(QName),
    /// List value
    List(Vec<XsdValue>),
}

impl XsdValue {
    /// Order two values of the same primitive, if comparable
    pub fn compare(&self, other: &XsdValue) -> Option<Ordering> {
        match (self, other) {
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => Some(a.cmp(b)),
            (XsdValue::Float(a), XsdValue::Float(b)) | (XsdValue::Double(a), XsdValue::Double(b)) => {
                a.partial_cmp(b)
            }
            (XsdValue::DateTime(a), XsdValue::DateTime(b)) => a.compare(b),
            (XsdValue::String(a), XsdValue::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Length in the sense of the length facets
    pub fn facet_length(&self) -> Option<usize> {
        match self {
            XsdValue::String(s) | XsdValue::Uri(s) => Some(s.chars().count()),
            XsdValue::HexBinary(b) | XsdValue::Base64Binary(b) => Some(b.len()),
            XsdValue::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// String forms of the items (one for atomic values)
    pub fn items_as_strings(&self) -> Vec<String> {
        match self {
            XsdValue::List(items) => items.iter().map(|v| v.to_string()).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl PartialEq for XsdValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XsdValue::String(a), XsdValue::String(b)) => a == b,
            (XsdValue::Boolean(a), XsdValue::Boolean(b)) => a == b,
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => a == b,
            (XsdValue::Float(a), XsdValue::Float(b)) | (XsdValue::Double(a), XsdValue::Double(b)) => {
                a == b || (a.is_nan() && b.is_nan())
            }
            (XsdValue::DateTime(a), XsdValue::DateTime(b)) => a.compare(b) == Some(Ordering::Equal),
            (XsdValue::Duration(a), XsdValue::Duration(b)) => a == b,
            (XsdValue::Gregorian(ta, a), XsdValue::Gregorian(tb, b)) => ta == tb && a == b,
            (XsdValue::HexBinary(a), XsdValue::HexBinary(b)) => a == b,
            (XsdValue::Base64Binary(a), XsdValue::Base64Binary(b)) => a == b,
            (XsdValue::Uri(a), XsdValue::Uri(b)) => a == b,
            (XsdValue::QName(a), XsdValue::QName(b)) => a == b,
            (XsdValue::List(a), XsdValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for XsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsdValue::String(s) | XsdValue::Uri(s) | XsdValue::Duration(s) => write!(f, "{}", s),
            XsdValue::Gregorian(_, s) => write!(f, "{}", s),
            XsdValue::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            XsdValue::Decimal(d) => write!(f, "{}", d.normalize()),
            XsdValue::Float(v) | XsdValue::Double(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else if *v == f64::INFINITY {
                    write!(f, "INF")
                } else if *v == f64::NEG_INFINITY {
                    write!(f, "-INF")
                } else {
                    write!(f, "{}", v)
                }
            }
            XsdValue::DateTime(dt) => {
                match dt.kind {
                    DateTimeKind::DateTime => write!(f, "{}", dt.local.format("%Y-%m-%dT%H:%M:%S%.f"))?,
                    DateTimeKind::Date => write!(f, "{}", dt.local.format("%Y-%m-%d"))?,
                    DateTimeKind::Time => write!(f, "{}", dt.local.format("%H:%M:%S%.f"))?,
                }
                match dt.offset_minutes {
                    Some(0) => write!(f, "Z"),
                    Some(m) => {
                        let sign = if m < 0 { '-' } else { '+' };
                        write!(f, "{}{:02}:{:02}", sign, m.abs() / 60, m.abs() % 60)
                    }
                    None => Ok(()),
                }
            }
            XsdValue::HexBinary(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            XsdValue::Base64Binary(b) => {
                write!(f, "{}", base64::engine::general_purpose::STANDARD.encode(b))
            }
            XsdValue::QName(q) => write!(f, "{}", q),
            XsdValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Built-in Type Definition
// =============================================================================

/// The built-in simple types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinType {
    /// xs:anySimpleType
    AnySimpleType,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    #[serde(rename = "Name")]
    Name,
    /// xs:NCName
    #[serde(rename = "NCName")]
    NCName,
    /// xs:ID
    #[serde(rename = "ID")]
    Id,
    /// xs:IDREF
    #[serde(rename = "IDREF")]
    IdRef,
    /// xs:ENTITY
    #[serde(rename = "ENTITY")]
    Entity,
    /// xs:NMTOKEN
    #[serde(rename = "NMTOKEN")]
    NmToken,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer
    Integer,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    #[serde(rename = "anyURI")]
    AnyUri,
    /// xs:QName
    #[serde(rename = "QName")]
    QName,
}

/// Whitespace handling of a datatype
pub use super::facets::WhiteSpace;

/// All atomic built-in types, in registration order
pub const ATOMIC_BUILTINS: &[BuiltinType] = &[
    BuiltinType::AnySimpleType,
    BuiltinType::String,
    BuiltinType::NormalizedString,
    BuiltinType::Token,
    BuiltinType::Language,
    BuiltinType::Name,
    BuiltinType::NCName,
    BuiltinType::Id,
    BuiltinType::IdRef,
    BuiltinType::Entity,
    BuiltinType::NmToken,
    BuiltinType::Boolean,
    BuiltinType::Decimal,
    BuiltinType::Integer,
    BuiltinType::NonPositiveInteger,
    BuiltinType::NegativeInteger,
    BuiltinType::Long,
    BuiltinType::Int,
    BuiltinType::Short,
    BuiltinType::Byte,
    BuiltinType::NonNegativeInteger,
    BuiltinType::UnsignedLong,
    BuiltinType::UnsignedInt,
    BuiltinType::UnsignedShort,
    BuiltinType::UnsignedByte,
    BuiltinType::PositiveInteger,
    BuiltinType::Float,
    BuiltinType::Double,
    BuiltinType::Duration,
    BuiltinType::DateTime,
    BuiltinType::Time,
    BuiltinType::Date,
    BuiltinType::GYearMonth,
    BuiltinType::GYear,
    BuiltinType::GMonthDay,
    BuiltinType::GDay,
    BuiltinType::GMonth,
    BuiltinType::HexBinary,
    BuiltinType::Base64Binary,
    BuiltinType::AnyUri,
    BuiltinType::QName,
];

/// Built-in list types and their item types
pub const LIST_BUILTINS: &[(&str, BuiltinType)] = &[
    ("NMTOKENS", BuiltinType::NmToken),
    ("IDREFS", BuiltinType::IdRef),
    ("ENTITIES", BuiltinType::Entity),
];

impl BuiltinType {
    /// Local name in the XSD namespace
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NCName => "NCName",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::Entity => "ENTITY",
            Self::NmToken => "NMTOKEN",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::PositiveInteger => "positiveInteger",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Date => "date",
            Self::GYearMonth => "gYearMonth",
            Self::GYear => "gYear",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::GMonth => "gMonth",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
        }
    }

    /// Look up a built-in atomic type by local name
    pub fn from_name(name: &str) -> Option<Self> {
        ATOMIC_BUILTINS.iter().copied().find(|b| b.name() == name)
    }

    /// Qualified name in the XSD namespace
    pub fn qname(&self) -> QName {
        QName::xsd(self.name())
    }

    /// Immediate base type in the built-in hierarchy
    pub fn base(&self) -> Option<BuiltinType> {
        use BuiltinType::*;
        match self {
            AnySimpleType => None,
            NormalizedString => Some(String),
            Token => Some(NormalizedString),
            Language | Name | NmToken => Some(Token),
            NCName => Some(Name),
            Id | IdRef | Entity => Some(NCName),
            Integer => Some(Decimal),
            NonPositiveInteger | Long | NonNegativeInteger => Some(Integer),
            NegativeInteger => Some(NonPositiveInteger),
            Int => Some(Long),
            Short => Some(Int),
            Byte => Some(Short),
            UnsignedLong | PositiveInteger => Some(NonNegativeInteger),
            UnsignedInt => Some(UnsignedLong),
            UnsignedShort => Some(UnsignedInt),
            UnsignedByte => Some(UnsignedShort),
            _ => Some(AnySimpleType),
        }
    }

    /// Check whether this type is `other` or derived from it
    pub fn is_derived_from(&self, other: BuiltinType) -> bool {
        let mut current = Some(*self);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = t.base();
        }
        false
    }

    /// White space handling
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            Self::String | Self::AnySimpleType => WhiteSpace::Preserve,
            Self::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// Check if this type is a numeric type
    pub fn is_numeric(&self) -> bool {
        self.is_derived_from(Self::Decimal) || matches!(self, Self::Float | Self::Double)
    }

    /// Parse an already whitespace-normalized lexical value
    pub fn parse(&self, value: &str, namespaces: &NamespaceContext) -> Result<XsdValue, ValueError> {
        use BuiltinType::*;
        let name = self.name();
        match self {
            AnySimpleType | String => Ok(XsdValue::String(value.to_string())),
            NormalizedString => {
                if value.contains(['\r', '\n', '\t']) {
                    return Err(ValueError::lexical(value, name));
                }
                Ok(XsdValue::String(value.to_string()))
            }
            Token => {
                if value.starts_with(' ') || value.ends_with(' ') || value.contains("  ")
                    || value.contains(['\r', '\n', '\t'])
                {
                    return Err(ValueError::lexical(value, name));
                }
                Ok(XsdValue::String(value.to_string()))
            }
            Language => check(LANGUAGE.is_match(value), value, name, XsdValue::String),
            Name => check(is_valid_name(value), value, name, XsdValue::String),
            NCName | Id | IdRef | Entity => check(is_valid_ncname(value), value, name, XsdValue::String),
            NmToken => check(is_valid_nmtoken(value), value, name, XsdValue::String),
            Boolean => match value {
                "true" | "1" => Ok(XsdValue::Boolean(true)),
                "false" | "0" => Ok(XsdValue::Boolean(false)),
                _ => Err(ValueError::lexical(value, name)),
            },
            Decimal => parse_decimal(value, name).map(XsdValue::Decimal),
            Integer | NonPositiveInteger | NegativeInteger | Long | Int | Short | Byte
            | NonNegativeInteger | UnsignedLong | UnsignedInt | UnsignedShort | UnsignedByte
            | PositiveInteger => {
                if !INTEGER.is_match(value) {
                    return Err(ValueError::lexical(value, name));
                }
                let d = parse_decimal(value, name)?;
                if let Some((min, max)) = self.integer_bounds() {
                    if min.map_or(false, |m| d < m) || max.map_or(false, |m| d > m) {
                        return Err(ValueError::out_of_range(value, name));
                    }
                }
                Ok(XsdValue::Decimal(d))
            }
            Float => parse_float(value, name).map(|f| XsdValue::Float(f as f32 as f64)),
            Double => parse_float(value, name).map(XsdValue::Double),
            Duration => {
                if !DURATION.is_match(value) || value.ends_with('P') || value.ends_with('T') {
                    return Err(ValueError::lexical(value, name));
                }
                Ok(XsdValue::Duration(value.to_string()))
            }
            DateTime => parse_date_time(value, DateTimeKind::DateTime).map(XsdValue::DateTime),
            Date => parse_date_time(value, DateTimeKind::Date).map(XsdValue::DateTime),
            Time => parse_date_time(value, DateTimeKind::Time).map(XsdValue::DateTime),
            GYearMonth | GYear | GMonthDay | GDay | GMonth => {
                let re = match self {
                    GYearMonth => &*G_YEAR_MONTH,
                    GYear => &*G_YEAR,
                    GMonthDay => &*G_MONTH_DAY,
                    GDay => &*G_DAY,
                    _ => &*G_MONTH,
                };
                if !re.is_match(value) {
                    return Err(ValueError::lexical(value, name));
                }
                Ok(XsdValue::Gregorian(name, value.to_string()))
            }
            HexBinary => parse_hex(value)
                .map(XsdValue::HexBinary)
                .ok_or_else(|| ValueError::lexical(value, name)),
            Base64Binary => {
                let compact: std::string::String =
                    value.chars().filter(|c| !c.is_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map(XsdValue::Base64Binary)
                    .map_err(|_| ValueError::lexical(value, name))
            }
            AnyUri => {
                if value.contains(['\n', '\r', '\t']) {
                    return Err(ValueError::lexical(value, name));
                }
                url::Url::options()
                    .base_url(Some(&URI_BASE))
                    .parse(value)
                    .map(|_| XsdValue::Uri(value.to_string()))
                    .map_err(|_| ValueError::lexical(value, name))
            }
            QName => {
                if !is_valid_qname(value) {
                    return Err(ValueError::lexical(value, name));
                }
                match value.split_once(':') {
                    Some((prefix, local)) => {
                        let ns = namespaces
                            .get_namespace(prefix)
                            .ok_or_else(|| ValueError::UnboundPrefix(prefix.to_string()))?;
                        Ok(XsdValue::QName(crate::namespaces::QName::namespaced(ns, local)))
                    }
                    None => Ok(XsdValue::QName(crate::namespaces::QName::new(
                        namespaces.get_default_namespace(),
                        value,
                    ))),
                }
            }
        }
    }

    fn integer_bounds(&self) -> Option<(Option<Decimal>, Option<Decimal>)> {
        let range = |min: i64, max: i64| (Some(Decimal::from(min)), Some(Decimal::from(max)));
        Some(match self {
            Self::Integer => (None, None),
            Self::NonPositiveInteger => (None, Some(Decimal::ZERO)),
            Self::NegativeInteger => (None, Some(Decimal::NEGATIVE_ONE)),
            Self::Long => range(i64::MIN, i64::MAX),
            Self::Int => range(i32::MIN as i64, i32::MAX as i64),
            Self::Short => range(i16::MIN as i64, i16::MAX as i64),
            Self::Byte => range(i8::MIN as i64, i8::MAX as i64),
            Self::NonNegativeInteger => (Some(Decimal::ZERO), None),
            Self::UnsignedLong => (Some(Decimal::ZERO), Some(Decimal::from(u64::MAX))),
            Self::UnsignedInt => range(0, u32::MAX as i64),
            Self::UnsignedShort => range(0, u16::MAX as i64),
            Self::UnsignedByte => range(0, u8::MAX as i64),
            Self::PositiveInteger => (Some(Decimal::ONE), None),
            _ => return None,
        })
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

// =============================================================================
// Lexical helpers
// =============================================================================

static LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("valid regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("valid regex"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").expect("valid regex")
});
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid regex")
});
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("valid regex")
});
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").expect("valid regex")
});
const TZ: &str = r"(Z|[+-]\d{2}:\d{2})?$";
static G_YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}-(0[1-9]|1[0-2]){}", TZ)).expect("valid regex"));
static G_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}{}", TZ)).expect("valid regex"));
static G_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01]){}", TZ)).expect("valid regex")
});
static G_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---(0[1-9]|[12]\d|3[01]){}", TZ)).expect("valid regex"));
static G_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--(0[1-9]|1[0-2]){}", TZ)).expect("valid regex"));
static URI_BASE: Lazy<url::Url> =
    Lazy::new(|| url::Url::parse("http://base.invalid/").expect("valid base URL"));

fn check(
    ok: bool,
    value: &str,
    name: &str,
    wrap: fn(String) -> XsdValue,
) -> Result<XsdValue, ValueError> {
    if ok {
        Ok(wrap(value.to_string()))
    } else {
        Err(ValueError::lexical(value, name))
    }
}

fn parse_decimal(value: &str, name: &str) -> Result<Decimal, ValueError> {
    if !DECIMAL.is_match(value) {
        return Err(ValueError::lexical(value, name));
    }
    let mut text = value.trim_start_matches('+').to_string();
    if text.ends_with('.') {
        text.push('0');
    }
    if let Some(rest) = text.strip_prefix("-.") {
        text = format!("-0.{}", rest);
    } else if text.starts_with('.') {
        text.insert(0, '0');
    }
    Decimal::from_str(&text).map_err(|_| ValueError::out_of_range(value, name))
}

fn parse_float(value: &str, name: &str) -> Result<f64, ValueError> {
    match value {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ if FLOAT.is_match(value) => value
            .parse::<f64>()
            .map_err(|_| ValueError::lexical(value, name)),
        _ => Err(ValueError::lexical(value, name)),
    }
}

fn parse_hex(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    (0..value.len())
        .step_by(2)
        .map(|i| value.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

fn parse_offset(tz: Option<regex::Match<'_>>) -> Option<Option<i32>> {
    match tz.map(|m| m.as_str()) {
        None => Some(None),
        Some("Z") => Some(Some(0)),
        Some(tz) => {
            let sign = if tz.starts_with('-') { -1 } else { 1 };
            let hours: i32 = tz.get(1..3)?.parse().ok()?;
            let minutes: i32 = tz.get(4..6)?.parse().ok()?;
            if hours > 14 || minutes > 59 || (hours == 14 && minutes != 0) {
                return None;
            }
            Some(Some(sign * (hours * 60 + minutes)))
        }
    }
}

fn build_time(h: u32, m: u32, s: u32, fraction: Option<&str>) -> Option<(NaiveTime, bool)> {
    let nanos = match fraction {
        Some(frac) => {
            let digits: String = frac.trim_start_matches('.').chars().take(9).collect();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().ok()? * scale
        }
        None => 0,
    };
    if h == 24 && m == 0 && s == 0 && nanos == 0 {
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, true));
    }
    Some((NaiveTime::from_hms_nano_opt(h, m, s, nanos)?, false))
}

fn parse_date_time(value: &str, kind: DateTimeKind) -> Result<XsdDateTime, ValueError> {
    let type_name = match kind {
        DateTimeKind::DateTime => "dateTime",
        DateTimeKind::Date => "date",
        DateTimeKind::Time => "time",
    };
    let err = || ValueError::lexical(value, type_name);
    let num = |m: Option<regex::Match<'_>>| -> Option<i64> { m?.as_str().parse().ok() };

    let (local, offset) = match kind {
        DateTimeKind::DateTime => {
            let caps = DATE_TIME.captures(value).ok_or_else(err)?;
            let date = NaiveDate::from_ymd_opt(
                num(caps.get(1)).ok_or_else(err)? as i32,
                num(caps.get(2)).ok_or_else(err)? as u32,
                num(caps.get(3)).ok_or_else(err)? as u32,
            )
            .ok_or_else(err)?;
            let (time, next_day) = build_time(
                num(caps.get(4)).ok_or_else(err)? as u32,
                num(caps.get(5)).ok_or_else(err)? as u32,
                num(caps.get(6)).ok_or_else(err)? as u32,
                caps.get(7).map(|m| m.as_str()),
            )
            .ok_or_else(err)?;
            let mut local = date.and_time(time);
            if next_day {
                local += Duration::days(1);
            }
            (local, parse_offset(caps.get(8)).ok_or_else(err)?)
        }
        DateTimeKind::Date => {
            let caps = DATE.captures(value).ok_or_else(err)?;
            let date = NaiveDate::from_ymd_opt(
                num(caps.get(1)).ok_or_else(err)? as i32,
                num(caps.get(2)).ok_or_else(err)? as u32,
                num(caps.get(3)).ok_or_else(err)? as u32,
            )
            .ok_or_else(err)?;
            let midnight = NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(err)?;
            (date.and_time(midnight), parse_offset(caps.get(4)).ok_or_else(err)?)
        }
        DateTimeKind::Time => {
            let caps = TIME.captures(value).ok_or_else(err)?;
            let (time, _) = build_time(
                num(caps.get(1)).ok_or_else(err)? as u32,
                num(caps.get(2)).ok_or_else(err)? as u32,
                num(caps.get(3)).ok_or_else(err)? as u32,
                caps.get(4).map(|m| m.as_str()),
            )
            .ok_or_else(err)?;
            let reference = NaiveDate::from_ymd_opt(1972, 12, 31).ok_or_else(err)?;
            (reference.and_time(time), parse_offset(caps.get(5)).ok_or_else(err)?)
        }
    };

    Ok(XsdDateTime {
        kind,
        local,
        offset_minutes: offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(t: BuiltinType, v: &str) -> Result<XsdValue, ValueError> {
        t.parse(v, &NamespaceContext::new())
    }

    #[test]
    fn test_string_types() {
        assert!(parse(BuiltinType::String, " any\ttext ").is_ok());
        assert!(parse(BuiltinType::NormalizedString, "a\tb").is_err());
        assert!(parse(BuiltinType::Token, "a  b").is_err());
        assert!(parse(BuiltinType::Token, "a b").is_ok());
        assert!(parse(BuiltinType::NCName, "a:b").is_err());
        assert!(parse(BuiltinType::Id, "id-1").is_ok());
        assert!(parse(BuiltinType::Language, "en-US").is_ok());
        assert!(parse(BuiltinType::Language, "toolongprimarytag").is_err());
    }

    #[test]
    fn test_boolean_type() {
        assert_eq!(parse(BuiltinType::Boolean, "1").unwrap(), XsdValue::Boolean(true));
        assert_eq!(parse(BuiltinType::Boolean, "false").unwrap(), XsdValue::Boolean(false));
        assert!(parse(BuiltinType::Boolean, "yes").is_err());
    }

    #[test]
    fn test_integer_value_equality() {
        let a = parse(BuiltinType::Integer, "1").unwrap();
        let b = parse(BuiltinType::Integer, "01").unwrap();
        let c = parse(BuiltinType::Decimal, "1.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, XsdValue::String("1".into()));
    }

    #[test]
    fn test_integer_ranges() {
        assert!(parse(BuiltinType::Byte, "127").is_ok());
        assert!(matches!(
            parse(BuiltinType::Byte, "128"),
            Err(ValueError::OutOfRange { .. })
        ));
        assert!(parse(BuiltinType::UnsignedLong, "18446744073709551615").is_ok());
        assert!(parse(BuiltinType::PositiveInteger, "0").is_err());
        assert!(parse(BuiltinType::Integer, "1.5").is_err());
    }

    #[test]
    fn test_decimal_lexical_forms() {
        assert!(parse(BuiltinType::Decimal, "+.5").is_ok());
        assert!(parse(BuiltinType::Decimal, "-.5").is_ok());
        assert!(parse(BuiltinType::Decimal, "5.").is_ok());
        assert!(parse(BuiltinType::Decimal, "1e5").is_err());
    }

    #[test]
    fn test_float_types() {
        assert!(parse(BuiltinType::Double, "1.5E10").is_ok());
        assert_eq!(parse(BuiltinType::Float, "NaN").unwrap(), parse(BuiltinType::Float, "NaN").unwrap());
        assert_eq!(parse(BuiltinType::Double, "INF").unwrap(), XsdValue::Double(f64::INFINITY));
        assert!(parse(BuiltinType::Double, "abc").is_err());
        assert_ne!(parse(BuiltinType::Float, "1").unwrap(), parse(BuiltinType::Double, "1").unwrap());
    }

    #[test]
    fn test_datetime_types() {
        let a = parse(BuiltinType::DateTime, "2024-01-01T12:00:00Z").unwrap();
        let b = parse(BuiltinType::DateTime, "2024-01-01T13:00:00+01:00").unwrap();
        assert_eq!(a, b);
        let naive = parse(BuiltinType::DateTime, "2024-01-01T12:00:00").unwrap();
        assert_ne!(a, naive);
        assert!(parse(BuiltinType::Date, "2024-02-30").is_err());
        assert!(parse(BuiltinType::Time, "24:00:00").is_ok());
        assert!(parse(BuiltinType::DateTime, "2024-01-01T24:00:00").is_ok());
        assert!(parse(BuiltinType::GYearMonth, "2024-13").is_err());
        assert!(parse(BuiltinType::GMonthDay, "--12-25").is_ok());
        assert!(parse(BuiltinType::Duration, "P1Y2M").is_ok());
        assert!(parse(BuiltinType::Duration, "P").is_err());
        assert!(parse(BuiltinType::Duration, "P1DT").is_err());
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(
            parse(BuiltinType::HexBinary, "0FB7").unwrap(),
            XsdValue::HexBinary(vec![0x0F, 0xB7])
        );
        assert!(parse(BuiltinType::HexBinary, "0FB").is_err());
        assert_eq!(
            parse(BuiltinType::Base64Binary, "AQID").unwrap(),
            XsdValue::Base64Binary(vec![1, 2, 3])
        );
        assert!(parse(BuiltinType::Base64Binary, "***").is_err());
    }

    #[test]
    fn test_qname_type() {
        let mut ns = NamespaceContext::new();
        ns.add_prefix("p", "urn:p");
        let v = BuiltinType::QName.parse("p:item", &ns).unwrap();
        assert_eq!(v, XsdValue::QName(QName::namespaced("urn:p", "item")));
        assert!(matches!(
            BuiltinType::QName.parse("q:item", &ns),
            Err(ValueError::UnboundPrefix(_))
        ));
    }

    #[test]
    fn test_uri_type() {
        assert!(parse(BuiltinType::AnyUri, "http://example.com/a?b=c").is_ok());
        assert!(parse(BuiltinType::AnyUri, "relative/path.xml").is_ok());
    }

    #[test]
    fn test_hierarchy() {
        assert!(BuiltinType::UnsignedByte.is_derived_from(BuiltinType::Decimal));
        assert!(BuiltinType::Id.is_derived_from(BuiltinType::String));
        assert!(!BuiltinType::Boolean.is_derived_from(BuiltinType::String));
        assert_eq!(BuiltinType::from_name("NMTOKEN"), Some(BuiltinType::NmToken));
        assert_eq!(BuiltinType::Token.white_space(), WhiteSpace::Collapse);
    }

    #[test]
    fn test_xsd_value_display() {
        assert_eq!(parse(BuiltinType::Integer, "007").unwrap().to_string(), "7");
        assert_eq!(XsdValue::HexBinary(vec![0xAB]).to_string(), "AB");
        let list = XsdValue::List(vec![XsdValue::String("a".into()), XsdValue::String("b".into())]);
        assert_eq!(list.to_string(), "a b");
    }
}
