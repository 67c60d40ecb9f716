use bitflags::bitflags;
use chrono::NaiveDate;
use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::document::Element;

// ============================================================================
// Vocabularies
// ============================================================================

const GAAP_NAMESPACE_PREFIXES: &[&str] = &["http://fasb.org/us-gaap/", "http://xbrl.us/us-gaap/"];
const DEI_NAMESPACE_PREFIXES: &[&str] = &["http://xbrl.sec.gov/dei/", "http://xbrl.us/dei/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vocabulary {
    Gaap,
    Dei,
}

impl Vocabulary {
    pub fn name(self) -> &'static str {
        match self {
            Vocabulary::Gaap => "GAAP",
            Vocabulary::Dei => "DEI",
        }
    }

    fn namespace_prefixes(self) -> &'static [&'static str] {
        match self {
            Vocabulary::Gaap => GAAP_NAMESPACE_PREFIXES,
            Vocabulary::Dei => DEI_NAMESPACE_PREFIXES,
        }
    }

    fn conventional_prefix(self) -> &'static str {
        match self {
            Vocabulary::Gaap => "us-gaap",
            Vocabulary::Dei => "dei",
        }
    }

    /// Whether an element belongs to this vocabulary. The namespace URI
    /// decides; the conventional prefix is only consulted when the prefix was
    /// never bound to a namespace.
    pub fn matches(self, element: &Element) -> bool {
        match element.namespace() {
            Some(ns) => self.namespace_prefixes().iter().any(|p| ns.starts_with(p)),
            None => element.prefix() == Some(self.conventional_prefix()),
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Periods and contexts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Instant,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Period {
    Instant { date: NaiveDate },
    Duration { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn kind(&self) -> PeriodKind {
        match self {
            Period::Instant { .. } => PeriodKind::Instant,
            Period::Duration { .. } => PeriodKind::Duration,
        }
    }

    /// Instant date, or the last day of a duration.
    pub fn end(&self) -> NaiveDate {
        match *self {
            Period::Instant { date } => date,
            Period::Duration { end, .. } => end,
        }
    }

    pub fn days(&self) -> i64 {
        match *self {
            Period::Instant { .. } => 0,
            Period::Duration { start, end } => end.signed_duration_since(start).num_days(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Instant { date } => write!(f, "{}", date),
            Period::Duration { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContextFlags: u8 {
        const SEGMENT  = 0b0000_0001;
        const SCENARIO = 0b0000_0010;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub id: CompactString,
    pub period: Period,
    pub flags: ContextFlags,
}

impl Context {
    /// Qualified by a segment or scenario, i.e. not the default dimension.
    pub fn is_dimensional(&self) -> bool {
        !self.flags.is_empty()
    }
}

// ============================================================================
// Concept metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    Monetary,
    Shares,
    PerShare,
    Date,
    String,
    Boolean,
}

impl ValueKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Monetary | ValueKind::Shares | ValueKind::PerShare)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodConstraint {
    Instant,
    Duration,
    Either,
}

impl PeriodConstraint {
    pub fn admits(self, kind: PeriodKind) -> bool {
        match self {
            PeriodConstraint::Either => true,
            PeriodConstraint::Instant => kind == PeriodKind::Instant,
            PeriodConstraint::Duration => kind == PeriodKind::Duration,
        }
    }
}

// ============================================================================
// Fact attributes
// ============================================================================

/// The `decimals` attribute: `INF` or a (possibly negative) digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decimals {
    Infinite,
    Finite(i32),
}

impl Decimals {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("INF") {
            Some(Decimals::Infinite)
        } else {
            raw.parse().ok().map(Decimals::Finite)
        }
    }
}

impl PartialOrd for Decimals {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// More precise is greater.
impl Ord for Decimals {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Decimals::Infinite, Decimals::Infinite) => Ordering::Equal,
            (Decimals::Infinite, Decimals::Finite(_)) => Ordering::Greater,
            (Decimals::Finite(_), Decimals::Infinite) => Ordering::Less,
            (Decimals::Finite(a), Decimals::Finite(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Decimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decimals::Infinite => f.write_str("INF"),
            Decimals::Finite(n) => write!(f, "{}", n),
        }
    }
}

/// A magnitude attribute that was present but could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedAttribute<'a> {
    pub name: &'static str,
    pub value: &'a str,
}

/// Every attribute that can change how a fact's raw text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactAttributes<'a> {
    pub decimals: Option<Decimals>,
    pub scale: Option<i32>,
    pub negated: bool,
    pub nil: bool,
    /// An unreadable `decimals` or `scale`. Numbers carrying one are
    /// rejected rather than read unscaled.
    pub malformed: Option<MalformedAttribute<'a>>,
}

impl<'a> FactAttributes<'a> {
    pub fn from_element(element: &'a Element) -> Self {
        let scale = element.attr("scale").map(|v| (v, v.trim().parse::<i32>().ok()));
        let decimals = element.attr("decimals").map(|v| (v, Decimals::parse(v)));
        // `scale` is consulted first, so it is reported first.
        let malformed = match (scale, decimals) {
            (Some((value, None)), _) => Some(MalformedAttribute { name: "scale", value: value.trim() }),
            (_, Some((value, None))) => Some(MalformedAttribute { name: "decimals", value: value.trim() }),
            _ => None,
        };
        Self {
            decimals: decimals.and_then(|(_, d)| d),
            scale: scale.and_then(|(_, s)| s),
            malformed,
            negated: element
                .attr("sign")
                .map(|s| matches!(s.trim(), "-" | "negated" | "negative"))
                .unwrap_or(false),
            nil: element
                .attr("nil")
                .map(|v| matches!(v.trim(), "true" | "1"))
                .unwrap_or(false),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A coerced fact value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Decimal(Decimal),
    Date(NaiveDate),
    Boolean(bool),
    Text(String),
}

impl Value {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
        }
    }
}
