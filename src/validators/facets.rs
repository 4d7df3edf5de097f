//! XSD constraining facets and the facet engine
//!
//! The facet taxonomy, lexical comparison per primitive (including the
//! partial orders: float/double NaN, duration, and the W3C 14-hour timezone
//! shift for date/time values), the applicability table, range-consistency
//! checking, deferred-facet conversion, and the facet-inheritance
//! (bound-tightening) validator.
//!
//! Reference: https://www.w3.org/TR/xmlschema-2/#rf-facets

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Diagnostic, Error, Result};

use super::builtins::{self, BuiltinType, Primitive};
use super::schemas::XsdSchema;
use super::simple_types::{SimpleTypeVariety, XsdSimpleType};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::Value(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }

    /// Strictness rank: preserve < replace < collapse
    pub fn strictness(&self) -> u8 {
        match self {
            WhiteSpace::Preserve => 0,
            WhiteSpace::Replace => 1,
            WhiteSpace::Collapse => 2,
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => {
                let replaced = s.replace(['\t', '\n', '\r'], " ");
                let mut result = String::new();
                let mut prev_space = true; // Start with true to trim leading spaces

                for c in replaced.chars() {
                    if c == ' ' {
                        if !prev_space {
                            result.push(' ');
                            prev_space = true;
                        }
                    } else {
                        result.push(c);
                        prev_space = false;
                    }
                }

                result.trim_end().to_string()
            }
        }
    }
}

impl std::fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Replace => write!(f, "replace"),
            Self::Collapse => write!(f, "collapse"),
        }
    }
}

/// A constraining facet as declared on a simple type.
///
/// Range facets carry their lexical form; the facet engine interprets them
/// against the base primitive. A `Deferred` facet is a placeholder the
/// parser emits when the base type was unresolved at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    /// Exact length
    Length(u32),
    /// Minimum length
    MinLength(u32),
    /// Maximum length
    MaxLength(u32),
    /// Pattern alternatives; entries from different derivation steps AND
    Pattern(Vec<String>),
    /// Enumerated value set
    Enumeration(Vec<String>),
    /// White space discipline, with the explicit-declaration flag
    WhiteSpace {
        /// The declared mode
        mode: WhiteSpace,
        /// Whether the schema author wrote it (as opposed to inheritance)
        explicit: bool,
    },
    /// Maximum total digits
    TotalDigits(u32),
    /// Maximum fraction digits
    FractionDigits(u32),
    /// Inclusive lower bound (lexical)
    MinInclusive(String),
    /// Inclusive upper bound (lexical)
    MaxInclusive(String),
    /// Exclusive lower bound (lexical)
    MinExclusive(String),
    /// Exclusive upper bound (lexical)
    MaxExclusive(String),
    /// Placeholder awaiting base-type resolution
    Deferred {
        /// The facet name
        name: String,
        /// The lexical value
        value: String,
    },
}

impl Facet {
    /// The XSD facet name
    pub fn name(&self) -> &str {
        match self {
            Self::Length(_) => "length",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Pattern(_) => "pattern",
            Self::Enumeration(_) => "enumeration",
            Self::WhiteSpace { .. } => "whiteSpace",
            Self::TotalDigits(_) => "totalDigits",
            Self::FractionDigits(_) => "fractionDigits",
            Self::MinInclusive(_) => "minInclusive",
            Self::MaxInclusive(_) => "maxInclusive",
            Self::MinExclusive(_) => "minExclusive",
            Self::MaxExclusive(_) => "maxExclusive",
            Self::Deferred { name, .. } => name,
        }
    }
}

/// The XSD 1.0 facet names
pub const FACET_NAMES: &[&str] = &[
    "length",
    "minLength",
    "maxLength",
    "pattern",
    "enumeration",
    "whiteSpace",
    "totalDigits",
    "fractionDigits",
    "minInclusive",
    "maxInclusive",
    "minExclusive",
    "maxExclusive",
];

/// Check whether a name is a known XSD 1.0 facet
pub fn is_valid_facet_name(name: &str) -> bool {
    FACET_NAMES.contains(&name)
}

/// Outcome of comparing two lexical values under a primitive's order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetComparison {
    /// First value is smaller
    Less,
    /// The values are equal
    Equal,
    /// First value is larger
    Greater,
    /// No order between the values (NaN, duration, indeterminate timezone,
    /// unparseable lexical forms, unordered primitives)
    Incomparable,
}

impl From<Ordering> for FacetComparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Less,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Greater,
        }
    }
}

// ---------------------------------------------------------------------------
// Lexical parsing and comparison per primitive
// ---------------------------------------------------------------------------

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

static GYEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})$").unwrap());
static GYEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-?\d{4,})$").unwrap());
static GMONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--(\d{2})-(\d{2})$").unwrap());
static GDAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^---(\d{2})$").unwrap());
static GMONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--(\d{2})(?:--)?$").unwrap());

/// ISO duration broken into its two independently-ordered components
#[derive(Debug, Clone, Copy, PartialEq)]
struct DurationValue {
    months: i64,
    seconds: f64,
}

fn parse_duration(s: &str) -> Option<DurationValue> {
    let caps = DURATION_RE.captures(s.trim())?;
    // A bare "P" with no components is not a valid duration
    if caps
        .iter()
        .skip(2)
        .all(|group| group.is_none())
    {
        return None;
    }
    let sign: i64 = if caps.get(1).is_some() { -1 } else { 1 };
    let years: i64 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let months: i64 = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let days: f64 = caps.get(4).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
    let hours: f64 = caps.get(5).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
    let minutes: f64 = caps.get(6).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
    let seconds: f64 = caps.get(7).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));

    Some(DurationValue {
        months: sign * (years * 12 + months),
        seconds: sign as f64 * (days * 86400.0 + hours * 3600.0 + minutes * 60.0 + seconds),
    })
}

fn compare_durations(a: DurationValue, b: DurationValue) -> FacetComparison {
    let months = a.months.cmp(&b.months);
    let seconds = a
        .seconds
        .partial_cmp(&b.seconds)
        .unwrap_or(Ordering::Equal);

    match (months, seconds) {
        (Ordering::Equal, s) => s.into(),
        (m, Ordering::Equal) => m.into(),
        (m, s) if m == s => m.into(),
        // Components pull in opposite directions: partially ordered
        _ => FacetComparison::Incomparable,
    }
}

fn parse_xsd_float(s: &str) -> Option<f64> {
    match s.trim() {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

/// A date/time-family value: the local timestamp plus the declared offset in
/// minutes (None = no timezone).
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimestampValue {
    local: NaiveDateTime,
    offset_minutes: Option<i32>,
}

fn split_timezone(s: &str) -> (&str, Option<i32>) {
    if let Some(rest) = s.strip_suffix('Z') {
        return (rest, Some(0));
    }
    // [+-]hh:mm suffix; the '-' of negative years can't be confused with it
    // because an offset is always exactly 6 characters from the end
    if s.len() > 6 {
        let (head, tail) = s.split_at(s.len() - 6);
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            if let (Ok(hours), Ok(minutes)) = (tail[1..3].parse::<i32>(), tail[4..6].parse::<i32>())
            {
                let sign = if bytes[0] == b'-' { -1 } else { 1 };
                return (head, Some(sign * (hours * 60 + minutes)));
            }
        }
    }
    (s, None)
}

// The gMonthDay/gDay/gMonth values are anchored onto a fixed leap year so
// every legal day (including --02-29) has a timestamp
const ANCHOR_YEAR: i32 = 2000;

fn parse_timestamp(s: &str, primitive: Primitive) -> Option<TimestampValue> {
    let (body, offset_minutes) = split_timezone(s.trim());

    let local = match primitive {
        Primitive::DateTime => {
            NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f").ok()?
        }
        Primitive::Date => NaiveDate::parse_from_str(body, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?,
        Primitive::Time => NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
            .ok()
            .and_then(|t| NaiveDate::from_ymd_opt(ANCHOR_YEAR, 1, 1).map(|d| d.and_time(t)))?,
        Primitive::GYear => {
            let caps = GYEAR_RE.captures(body)?;
            let year: i32 = caps[1].parse().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?
        }
        Primitive::GYearMonth => {
            let caps = GYEAR_MONTH_RE.captures(body)?;
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?
        }
        Primitive::GMonthDay => {
            let caps = GMONTH_DAY_RE.captures(body)?;
            let month: u32 = caps[1].parse().ok()?;
            let day: u32 = caps[2].parse().ok()?;
            NaiveDate::from_ymd_opt(ANCHOR_YEAR, month, day)?.and_hms_opt(0, 0, 0)?
        }
        Primitive::GDay => {
            let caps = GDAY_RE.captures(body)?;
            let day: u32 = caps[1].parse().ok()?;
            NaiveDate::from_ymd_opt(ANCHOR_YEAR, 1, day)?.and_hms_opt(0, 0, 0)?
        }
        Primitive::GMonth => {
            let caps = GMONTH_RE.captures(body)?;
            let month: u32 = caps[1].parse().ok()?;
            NaiveDate::from_ymd_opt(ANCHOR_YEAR, month, 1)?.and_hms_opt(0, 0, 0)?
        }
        _ => return None,
    };

    Some(TimestampValue {
        local,
        offset_minutes,
    })
}

fn compare_timestamps(a: TimestampValue, b: TimestampValue) -> FacetComparison {
    match (a.offset_minutes, b.offset_minutes) {
        (Some(offset_a), Some(offset_b)) => {
            let utc_a = a.local - ChronoDuration::minutes(offset_a as i64);
            let utc_b = b.local - ChronoDuration::minutes(offset_b as i64);
            utc_a.cmp(&utc_b).into()
        }
        (None, None) => a.local.cmp(&b.local).into(),
        // One timezoned, one not: comparable only when more than 14 hours
        // apart under the worst-case offset (W3C order relation)
        (Some(offset_a), None) => {
            let utc_a = a.local - ChronoDuration::minutes(offset_a as i64);
            let shift = ChronoDuration::hours(14);
            if utc_a < b.local - shift {
                FacetComparison::Less
            } else if utc_a > b.local + shift {
                FacetComparison::Greater
            } else {
                FacetComparison::Incomparable
            }
        }
        (None, Some(_)) => match compare_timestamps(b, a) {
            FacetComparison::Less => FacetComparison::Greater,
            FacetComparison::Greater => FacetComparison::Less,
            other => other,
        },
    }
}

/// Compare two lexical values under the order of a primitive.
///
/// Unparseable values and unordered primitives yield `Incomparable`, which
/// range checks treat as "no violation" - lexical validity is reported
/// separately by `validate_range_values`.
pub fn compare_values(a: &str, b: &str, primitive: Primitive) -> FacetComparison {
    match primitive {
        Primitive::Decimal => {
            match (
                Decimal::from_str(a.trim()),
                Decimal::from_str(b.trim()),
            ) {
                (Ok(left), Ok(right)) => left.cmp(&right).into(),
                _ => FacetComparison::Incomparable,
            }
        }
        Primitive::Float | Primitive::Double => {
            match (parse_xsd_float(a), parse_xsd_float(b)) {
                (Some(left), Some(right)) => {
                    if left.is_nan() && right.is_nan() {
                        // NaN is equal to itself, incomparable to the rest
                        FacetComparison::Equal
                    } else {
                        left.partial_cmp(&right)
                            .map(Into::into)
                            .unwrap_or(FacetComparison::Incomparable)
                    }
                }
                _ => FacetComparison::Incomparable,
            }
        }
        Primitive::Duration => match (parse_duration(a), parse_duration(b)) {
            (Some(left), Some(right)) => compare_durations(left, right),
            _ => FacetComparison::Incomparable,
        },
        Primitive::DateTime
        | Primitive::Date
        | Primitive::Time
        | Primitive::GYear
        | Primitive::GYearMonth
        | Primitive::GMonthDay
        | Primitive::GDay
        | Primitive::GMonth => {
            match (parse_timestamp(a, primitive), parse_timestamp(b, primitive)) {
                (Some(left), Some(right)) => compare_timestamps(left, right),
                _ => FacetComparison::Incomparable,
            }
        }
        // Unordered primitives support equality only
        _ => {
            if WhiteSpace::Collapse.normalize(a) == WhiteSpace::Collapse.normalize(b) {
                FacetComparison::Equal
            } else {
                FacetComparison::Incomparable
            }
        }
    }
}

/// Check whether a lexical value parses under a primitive.
pub fn is_valid_lexical(value: &str, primitive: Primitive) -> bool {
    match primitive {
        Primitive::Decimal => Decimal::from_str(value.trim()).is_ok(),
        Primitive::Float | Primitive::Double => parse_xsd_float(value).is_some(),
        Primitive::Duration => parse_duration(value).is_some(),
        Primitive::DateTime
        | Primitive::Date
        | Primitive::Time
        | Primitive::GYear
        | Primitive::GYearMonth
        | Primitive::GMonthDay
        | Primitive::GDay
        | Primitive::GMonth => parse_timestamp(value, primitive).is_some(),
        Primitive::Boolean => matches!(value.trim(), "true" | "false" | "0" | "1"),
        _ => true,
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
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
            Self::Notation => "NOTATION",
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// Applicability
// ---------------------------------------------------------------------------

fn base_description(primitive: Primitive, variety: SimpleTypeVariety) -> String {
    match variety {
        SimpleTypeVariety::List => "list type".to_string(),
        SimpleTypeVariety::Union => "union type".to_string(),
        SimpleTypeVariety::Atomic => match primitive {
            Primitive::Decimal | Primitive::Float | Primitive::Double => {
                "atomic numeric type".to_string()
            }
            other => format!("atomic {} type", other),
        },
    }
}

/// Check whether a facet may constrain a type of the given base primitive
/// and variety.
pub fn facet_applicable(facet: &Facet, primitive: Primitive, variety: SimpleTypeVariety) -> bool {
    match variety {
        SimpleTypeVariety::Union => matches!(
            facet,
            Facet::Pattern(_) | Facet::Enumeration(_) | Facet::Deferred { .. }
        ),
        SimpleTypeVariety::List => !matches!(
            facet,
            Facet::TotalDigits(_)
                | Facet::FractionDigits(_)
                | Facet::MinInclusive(_)
                | Facet::MaxInclusive(_)
                | Facet::MinExclusive(_)
                | Facet::MaxExclusive(_)
        ),
        SimpleTypeVariety::Atomic => match facet {
            Facet::Length(_) | Facet::MinLength(_) | Facet::MaxLength(_) => {
                primitive.has_length()
            }
            Facet::TotalDigits(_) | Facet::FractionDigits(_) => {
                primitive == Primitive::Decimal
            }
            Facet::MinInclusive(_)
            | Facet::MaxInclusive(_)
            | Facet::MinExclusive(_)
            | Facet::MaxExclusive(_) => primitive.is_ordered(),
            _ => true,
        },
    }
}

/// Report every facet on the list that is not applicable to the base.
pub fn validate_facet_applicability(
    facets: &[Facet],
    primitive: Primitive,
    variety: SimpleTypeVariety,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    for facet in facets {
        if !facet_applicable(facet, primitive, variety) {
            diags.push(Diagnostic::new(format!(
                "{}: facet {} is not applicable to {}",
                prefix,
                facet.name(),
                base_description(primitive, variety)
            )));
        }
        if let Facet::Pattern(alternatives) = facet {
            for pattern in alternatives {
                if Regex::new(pattern).is_err() {
                    diags.push(Diagnostic::new(format!(
                        "{}: facet pattern: invalid expression '{}'",
                        prefix, pattern
                    )));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Range consistency
// ---------------------------------------------------------------------------

fn find_facet<'a>(facets: &'a [Facet], name: &str) -> Option<&'a Facet> {
    facets.iter().find(|f| f.name() == name)
}

fn range_value<'a>(facets: &'a [Facet], name: &str) -> Option<&'a str> {
    match find_facet(facets, name)? {
        Facet::MinInclusive(v)
        | Facet::MaxInclusive(v)
        | Facet::MinExclusive(v)
        | Facet::MaxExclusive(v) => Some(v.as_str()),
        _ => None,
    }
}

/// Validate mutual consistency of the facets declared on one type.
///
/// Incomparable pairs pass silently; lexical validity is a separate check.
pub fn validate_range_consistency(
    facets: &[Facet],
    primitive: Primitive,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let min_inclusive = range_value(facets, "minInclusive");
    let max_inclusive = range_value(facets, "maxInclusive");
    let min_exclusive = range_value(facets, "minExclusive");
    let max_exclusive = range_value(facets, "maxExclusive");

    if min_inclusive.is_some() && min_exclusive.is_some() {
        diags.push(Diagnostic::new(format!(
            "{}: minInclusive and minExclusive cannot both be present",
            prefix
        )));
    }
    if max_inclusive.is_some() && max_exclusive.is_some() {
        diags.push(Diagnostic::new(format!(
            "{}: maxInclusive and maxExclusive cannot both be present",
            prefix
        )));
    }

    let mut check = |lo: Option<&str>, hi: Option<&str>, lo_name: &str, hi_name: &str,
                     allow_equal: bool| {
        if let (Some(lo), Some(hi)) = (lo, hi) {
            match compare_values(lo, hi, primitive) {
                FacetComparison::Greater => diags.push(Diagnostic::new(format!(
                    "{}: {} ({}) must be <= {} ({})",
                    prefix, lo_name, lo, hi_name, hi
                ))),
                FacetComparison::Equal if !allow_equal => diags.push(Diagnostic::new(format!(
                    "{}: {} ({}) must be < {} ({})",
                    prefix, lo_name, lo, hi_name, hi
                ))),
                _ => {}
            }
        }
    };

    check(min_inclusive, max_inclusive, "minInclusive", "maxInclusive", true);
    check(min_exclusive, max_exclusive, "minExclusive", "maxExclusive", true);
    check(min_inclusive, max_exclusive, "minInclusive", "maxExclusive", false);
    check(min_exclusive, max_inclusive, "minExclusive", "maxInclusive", false);

    let length = match find_facet(facets, "length") {
        Some(Facet::Length(v)) => Some(*v),
        _ => None,
    };
    let min_length = match find_facet(facets, "minLength") {
        Some(Facet::MinLength(v)) => Some(*v),
        _ => None,
    };
    let max_length = match find_facet(facets, "maxLength") {
        Some(Facet::MaxLength(v)) => Some(*v),
        _ => None,
    };

    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            diags.push(Diagnostic::new(format!(
                "{}: minLength ({}) must be <= maxLength ({})",
                prefix, min, max
            )));
        }
    }
    if let Some(length) = length {
        if min_length.is_some_and(|min| min > length) {
            diags.push(Diagnostic::new(format!(
                "{}: length ({}) conflicts with minLength",
                prefix, length
            )));
        }
        if max_length.is_some_and(|max| max < length) {
            diags.push(Diagnostic::new(format!(
                "{}: length ({}) conflicts with maxLength",
                prefix, length
            )));
        }
    }

    let total_digits = match find_facet(facets, "totalDigits") {
        Some(Facet::TotalDigits(v)) => Some(*v),
        _ => None,
    };
    let fraction_digits = match find_facet(facets, "fractionDigits") {
        Some(Facet::FractionDigits(v)) => Some(*v),
        _ => None,
    };
    if let (Some(fraction), Some(total)) = (fraction_digits, total_digits) {
        if fraction > total {
            diags.push(Diagnostic::new(format!(
                "{}: fractionDigits ({}) must be <= totalDigits ({})",
                prefix, fraction, total
            )));
        }
    }
}

/// Validate that every range and enumeration value is lexically valid for
/// the primitive.
pub fn validate_range_values(
    facets: &[Facet],
    primitive: Primitive,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    for facet in facets {
        match facet {
            Facet::MinInclusive(v)
            | Facet::MaxInclusive(v)
            | Facet::MinExclusive(v)
            | Facet::MaxExclusive(v) => {
                if !is_valid_lexical(v, primitive) {
                    diags.push(Diagnostic::new(format!(
                        "{}: facet {}: value '{}' is not a valid xs:{}",
                        prefix,
                        facet.name(),
                        v,
                        primitive
                    )));
                }
            }
            Facet::Enumeration(values) => {
                for value in values {
                    if !is_valid_lexical(value, primitive) {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet enumeration: value '{}' is not a valid xs:{}",
                            prefix, value, primitive
                        )));
                    }
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred facets
// ---------------------------------------------------------------------------

/// Convert a deferred facet placeholder into a typed facet, now that the
/// base type is known.
pub fn convert_deferred(name: &str, value: &str, base: &BuiltinType) -> Result<Facet> {
    let parse_count = |value: &str| -> Result<u32> {
        value.trim().parse::<u32>().map_err(|_| {
            Error::Facet(format!(
                "facet {}: value '{}' is not a valid non-negative integer",
                name, value
            ))
        })
    };

    match name {
        "length" => Ok(Facet::Length(parse_count(value)?)),
        "minLength" => Ok(Facet::MinLength(parse_count(value)?)),
        "maxLength" => Ok(Facet::MaxLength(parse_count(value)?)),
        "totalDigits" => Ok(Facet::TotalDigits(parse_count(value)?)),
        "fractionDigits" => Ok(Facet::FractionDigits(parse_count(value)?)),
        "pattern" => Ok(Facet::Pattern(vec![value.to_string()])),
        "enumeration" => Ok(Facet::Enumeration(vec![value.to_string()])),
        "whiteSpace" => Ok(Facet::WhiteSpace {
            mode: WhiteSpace::from_str(value)?,
            explicit: true,
        }),
        "minInclusive" | "maxInclusive" | "minExclusive" | "maxExclusive" => {
            if !is_valid_lexical(value, base.primitive) {
                return Err(Error::Facet(format!(
                    "facet {}: value '{}' is not a valid xs:{}",
                    name, value, base.primitive
                )));
            }
            Ok(match name {
                "minInclusive" => Facet::MinInclusive(value.to_string()),
                "maxInclusive" => Facet::MaxInclusive(value.to_string()),
                "minExclusive" => Facet::MinExclusive(value.to_string()),
                _ => Facet::MaxExclusive(value.to_string()),
            })
        }
        unknown => Err(Error::Facet(format!("unknown facet '{}'", unknown))),
    }
}

/// Re-run range checks for a type whose facets were deferred until the base
/// type resolved. Failures are reported like ordinary facet failures.
pub fn validate_deferred_facets(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if !simple_type
        .facets
        .iter()
        .any(|f| matches!(f, Facet::Deferred { .. }))
    {
        return;
    }

    let Some(base) = super::simple_types::resolve_base_builtin(schema, simple_type) else {
        // Base still unresolved: the resolver will surface it
        return;
    };

    let mut converted = Vec::with_capacity(simple_type.facets.len());
    for facet in &simple_type.facets {
        match facet {
            Facet::Deferred { name, value } => match convert_deferred(name, value, base) {
                Ok(facet) => converted.push(facet),
                Err(err) => diags.push(Diagnostic::new(format!("{}: {}", prefix, err))),
            },
            other => converted.push(other.clone()),
        }
    }

    validate_range_values(&converted, base.primitive, prefix, diags);
    validate_range_consistency(&converted, base.primitive, prefix, diags);
}

// ---------------------------------------------------------------------------
// Facet inheritance (bound tightening)
// ---------------------------------------------------------------------------

/// The effective facet set of a base chain: per facet name, the nearest
/// declaration wins; the terminating builtin contributes its implicit
/// bounds.
fn effective_base_facets(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
) -> Option<(HashMap<String, Facet>, &'static BuiltinType)> {
    let mut effective: HashMap<String, Facet> = HashMap::new();
    let mut tracker = super::visits::VisitTracker::new();
    let mut current = simple_type.base.clone()?;

    loop {
        if !tracker.enter(current.clone()) {
            // Cycle in the base chain; reported by the derivation checks
            return None;
        }

        if let Some(builtin) = builtins::get_builtin_by_qname(&current) {
            let (min, max) = builtins::implicit_bounds(builtin);
            if let Some(min) = min {
                effective
                    .entry("minInclusive".to_string())
                    .or_insert_with(|| Facet::MinInclusive(min.to_string()));
            }
            if let Some(max) = max {
                effective
                    .entry("maxInclusive".to_string())
                    .or_insert_with(|| Facet::MaxInclusive(max.to_string()));
            }
            effective
                .entry("whiteSpace".to_string())
                .or_insert(Facet::WhiteSpace {
                    mode: builtin.white_space,
                    explicit: false,
                });
            return Some((effective, builtin));
        }

        match schema.lookup_simple_type(&current) {
            Some(st) => {
                for facet in &st.facets {
                    if !matches!(facet, Facet::Deferred { .. }) {
                        effective
                            .entry(facet.name().to_string())
                            .or_insert_with(|| facet.clone());
                    }
                }
                match &st.base {
                    Some(base) => current = base.clone(),
                    None => return None,
                }
            }
            // Unresolved base: skip the whole check
            None => return None,
        }
    }
}

fn is_exclusive(facet: &Facet) -> bool {
    matches!(facet, Facet::MinExclusive(_) | Facet::MaxExclusive(_))
}

fn facet_lexical(facet: &Facet) -> Option<&str> {
    match facet {
        Facet::MinInclusive(v)
        | Facet::MaxInclusive(v)
        | Facet::MinExclusive(v)
        | Facet::MaxExclusive(v) => Some(v.as_str()),
        _ => None,
    }
}

/// Validate that a derived simple type's facets are at least as strict as
/// every corresponding facet inherited through its chain.
pub fn check_facet_inheritance(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let Some((base_facets, builtin)) = effective_base_facets(schema, simple_type) else {
        return;
    };
    let primitive = builtin.primitive;

    let base_min = base_facets
        .get("minInclusive")
        .or_else(|| base_facets.get("minExclusive"));
    let base_max = base_facets
        .get("maxInclusive")
        .or_else(|| base_facets.get("maxExclusive"));

    for facet in &simple_type.facets {
        match facet {
            Facet::MinInclusive(value) | Facet::MinExclusive(value) => {
                if let Some(base) = base_min {
                    let base_value = facet_lexical(base).unwrap();
                    match compare_values(value, base_value, primitive) {
                        FacetComparison::Less => diags.push(Diagnostic::new(format!(
                            "{}: facet {}: derived value ({}) must be >= base value ({})",
                            prefix,
                            facet.name(),
                            value,
                            base_value
                        ))),
                        FacetComparison::Equal
                            if is_exclusive(base) && !is_exclusive(facet) =>
                        {
                            diags.push(Diagnostic::new(format!(
                                "{}: facet {}: derived value ({}) must be > base value ({})",
                                prefix,
                                facet.name(),
                                value,
                                base_value
                            )))
                        }
                        _ => {}
                    }
                }
                // A lower bound above the base's upper bound empties the range
                if let Some(base) = base_max {
                    let base_value = facet_lexical(base).unwrap();
                    if compare_values(value, base_value, primitive) == FacetComparison::Greater {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet {}: derived value ({}) must be <= base {} ({})",
                            prefix,
                            facet.name(),
                            value,
                            base.name(),
                            base_value
                        )));
                    }
                }
            }
            Facet::MaxInclusive(value) | Facet::MaxExclusive(value) => {
                if let Some(base) = base_max {
                    let base_value = facet_lexical(base).unwrap();
                    match compare_values(value, base_value, primitive) {
                        FacetComparison::Greater => diags.push(Diagnostic::new(format!(
                            "{}: facet {}: derived value ({}) must be <= base value ({})",
                            prefix,
                            facet.name(),
                            value,
                            base_value
                        ))),
                        FacetComparison::Equal
                            if is_exclusive(base) && !is_exclusive(facet) =>
                        {
                            diags.push(Diagnostic::new(format!(
                                "{}: facet {}: derived value ({}) must be < base value ({})",
                                prefix,
                                facet.name(),
                                value,
                                base_value
                            )))
                        }
                        _ => {}
                    }
                }
                if let Some(base) = base_min {
                    let base_value = facet_lexical(base).unwrap();
                    if compare_values(value, base_value, primitive) == FacetComparison::Less {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet {}: derived value ({}) must be >= base {} ({})",
                            prefix,
                            facet.name(),
                            value,
                            base.name(),
                            base_value
                        )));
                    }
                }
            }
            Facet::Length(value) => {
                if let Some(Facet::Length(base_value)) = base_facets.get("length") {
                    if value != base_value {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet length: derived value ({}) must equal base value ({})",
                            prefix, value, base_value
                        )));
                    }
                }
            }
            Facet::MinLength(value) => {
                if let Some(Facet::MinLength(base_value)) = base_facets.get("minLength") {
                    if value < base_value {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet minLength: derived value ({}) must be >= base value ({})",
                            prefix, value, base_value
                        )));
                    }
                }
            }
            Facet::MaxLength(value) => {
                if let Some(Facet::MaxLength(base_value)) = base_facets.get("maxLength") {
                    if value > base_value {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet maxLength: derived value ({}) must be <= base value ({})",
                            prefix, value, base_value
                        )));
                    }
                }
            }
            Facet::TotalDigits(value) => {
                if let Some(Facet::TotalDigits(base_value)) = base_facets.get("totalDigits") {
                    if value > base_value {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet totalDigits: derived value ({}) must be <= base value ({})",
                            prefix, value, base_value
                        )));
                    }
                }
            }
            Facet::FractionDigits(value) => {
                if let Some(Facet::FractionDigits(base_value)) =
                    base_facets.get("fractionDigits")
                {
                    if value > base_value {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet fractionDigits: derived value ({}) must be <= base value ({})",
                            prefix, value, base_value
                        )));
                    }
                }
            }
            Facet::Enumeration(values) => {
                if let Some(Facet::Enumeration(base_values)) = base_facets.get("enumeration") {
                    let normalized: Vec<String> = base_values
                        .iter()
                        .map(|v| WhiteSpace::Collapse.normalize(v))
                        .collect();
                    for value in values {
                        if !normalized.contains(&WhiteSpace::Collapse.normalize(value)) {
                            diags.push(Diagnostic::new(format!(
                                "{}: facet enumeration: value '{}' is not in the base enumeration",
                                prefix, value
                            )));
                        }
                    }
                }
            }
            Facet::WhiteSpace { mode, .. } => {
                if let Some(Facet::WhiteSpace { mode: base_mode, .. }) =
                    base_facets.get("whiteSpace")
                {
                    if mode.strictness() < base_mode.strictness() {
                        diags.push(Diagnostic::new(format!(
                            "{}: facet whiteSpace: derived value ({}) is weaker than base value ({})",
                            prefix, mode, base_mode
                        )));
                    }
                }
            }
            Facet::Pattern(_) | Facet::Deferred { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whitespace_modes() {
        assert_eq!(WhiteSpace::from_str("preserve").unwrap(), WhiteSpace::Preserve);
        assert_eq!(WhiteSpace::from_str("collapse").unwrap(), WhiteSpace::Collapse);
        assert!(WhiteSpace::from_str("invalid").is_err());

        assert!(WhiteSpace::Preserve.strictness() < WhiteSpace::Replace.strictness());
        assert!(WhiteSpace::Replace.strictness() < WhiteSpace::Collapse.strictness());
    }

    #[test]
    fn test_whitespace_normalize() {
        let text = "  hello\t\nworld  ";
        assert_eq!(WhiteSpace::Preserve.normalize(text), text);
        assert_eq!(WhiteSpace::Replace.normalize(text), "  hello  world  ");
        assert_eq!(WhiteSpace::Collapse.normalize(text), "hello world");
    }

    #[test]
    fn test_compare_decimal() {
        assert_eq!(
            compare_values("10", "10.0", Primitive::Decimal),
            FacetComparison::Equal
        );
        assert_eq!(
            compare_values("-5", "3", Primitive::Decimal),
            FacetComparison::Less
        );
        assert_eq!(
            compare_values("200", "100", Primitive::Decimal),
            FacetComparison::Greater
        );
        assert_eq!(
            compare_values("abc", "100", Primitive::Decimal),
            FacetComparison::Incomparable
        );
    }

    #[test]
    fn test_compare_float_nan() {
        assert_eq!(
            compare_values("NaN", "NaN", Primitive::Double),
            FacetComparison::Equal
        );
        assert_eq!(
            compare_values("NaN", "1.0", Primitive::Double),
            FacetComparison::Incomparable
        );
        assert_eq!(
            compare_values("-INF", "INF", Primitive::Double),
            FacetComparison::Less
        );
    }

    #[test]
    fn test_compare_duration_partial_order() {
        assert_eq!(
            compare_values("P1Y", "P12M", Primitive::Duration),
            FacetComparison::Equal
        );
        assert_eq!(
            compare_values("P1D", "PT25H", Primitive::Duration),
            FacetComparison::Less
        );
        // One month vs thirty days: indeterminate
        assert_eq!(
            compare_values("P1M", "P30D", Primitive::Duration),
            FacetComparison::Incomparable
        );
    }

    #[test]
    fn test_compare_gyear() {
        assert_eq!(
            compare_values("2002", "1998", Primitive::GYear),
            FacetComparison::Greater
        );
        // Z and +00:00 denote the same instant
        assert_eq!(
            compare_values("2000Z", "2000+00:00", Primitive::GYear),
            FacetComparison::Equal
        );
    }

    #[test]
    fn test_compare_datetime_timezone_indeterminacy() {
        assert_eq!(
            compare_values(
                "2000-01-01T12:00:00Z",
                "2000-01-01T12:00:00",
                Primitive::DateTime
            ),
            FacetComparison::Incomparable
        );
        // More than 14 hours apart: comparable again
        assert_eq!(
            compare_values(
                "2000-01-01T12:00:00Z",
                "2000-01-03T12:00:00",
                Primitive::DateTime
            ),
            FacetComparison::Less
        );
    }

    #[test]
    fn test_compare_unordered_primitives() {
        assert_eq!(
            compare_values("a b", " a  b ", Primitive::String),
            FacetComparison::Equal
        );
        assert_eq!(
            compare_values("a", "b", Primitive::String),
            FacetComparison::Incomparable
        );
    }

    #[test]
    fn test_facet_applicability() {
        assert!(!facet_applicable(
            &Facet::Length(5),
            Primitive::Decimal,
            SimpleTypeVariety::Atomic
        ));
        assert!(facet_applicable(
            &Facet::Length(5),
            Primitive::String,
            SimpleTypeVariety::Atomic
        ));
        // length applies to list types regardless of item primitive
        assert!(facet_applicable(
            &Facet::Length(5),
            Primitive::Decimal,
            SimpleTypeVariety::List
        ));
        assert!(!facet_applicable(
            &Facet::MinInclusive("1".into()),
            Primitive::String,
            SimpleTypeVariety::Atomic
        ));
        assert!(!facet_applicable(
            &Facet::MinInclusive("1".into()),
            Primitive::Decimal,
            SimpleTypeVariety::Union
        ));
        assert!(facet_applicable(
            &Facet::Enumeration(vec!["a".into()]),
            Primitive::Decimal,
            SimpleTypeVariety::Union
        ));
    }

    #[test]
    fn test_applicability_message() {
        let mut diags = Vec::new();
        validate_facet_applicability(
            &[Facet::Length(5)],
            Primitive::Decimal,
            SimpleTypeVariety::Atomic,
            "type T",
            &mut diags,
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .contains("facet length is not applicable to atomic numeric type"));
    }

    #[test]
    fn test_range_consistency_gyear() {
        let facets = vec![
            Facet::MinInclusive("2002".into()),
            Facet::MaxInclusive("1998".into()),
        ];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::GYear, "type T", &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("minInclusive (2002) must be <= maxInclusive (1998)"));

        // Equal instants expressed with different timezone spellings: fine
        let facets = vec![
            Facet::MinInclusive("2000Z".into()),
            Facet::MaxInclusive("2000+00:00".into()),
        ];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::GYear, "type T", &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_range_consistency_indeterminate_pair_passes() {
        let facets = vec![
            Facet::MinInclusive("2000-01-01T12:00:00Z".into()),
            Facet::MaxInclusive("2000-01-01T12:00:00".into()),
        ];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::DateTime, "type T", &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_range_consistency_exclusive_overlap() {
        let facets = vec![
            Facet::MinInclusive("5".into()),
            Facet::MaxExclusive("5".into()),
        ];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::Decimal, "type T", &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("must be <"));
    }

    #[test]
    fn test_range_consistency_double_bounds() {
        let facets = vec![
            Facet::MinInclusive("1".into()),
            Facet::MinExclusive("0".into()),
        ];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::Decimal, "type T", &mut diags);
        assert!(diags[0]
            .message
            .contains("minInclusive and minExclusive cannot both be present"));
    }

    #[test]
    fn test_length_digit_consistency() {
        let facets = vec![Facet::Length(5), Facet::MaxLength(3)];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::String, "type T", &mut diags);
        assert!(diags.iter().any(|d| d.message.contains("conflicts with maxLength")));

        let facets = vec![Facet::FractionDigits(4), Facet::TotalDigits(2)];
        let mut diags = Vec::new();
        validate_range_consistency(&facets, Primitive::Decimal, "type T", &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("fractionDigits (4) must be <= totalDigits (2)")));
    }

    #[test]
    fn test_validate_range_values() {
        let facets = vec![Facet::MinInclusive("not-a-year".into())];
        let mut diags = Vec::new();
        validate_range_values(&facets, Primitive::GYear, "type T", &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("not a valid xs:gYear"));
    }

    #[test]
    fn test_convert_deferred() {
        let decimal = builtins::get_builtin("decimal").unwrap();
        assert_eq!(
            convert_deferred("maxInclusive", "100", decimal).unwrap(),
            Facet::MaxInclusive("100".to_string())
        );
        assert_eq!(
            convert_deferred("length", "5", decimal).unwrap(),
            Facet::Length(5)
        );
        assert!(convert_deferred("maxInclusive", "abc", decimal).is_err());
        assert!(convert_deferred("noSuchFacet", "1", decimal).is_err());
    }
}
