// Period selectors and the context scope they resolve to
use chrono::{Months, NaiveDate};
use compact_str::CompactString;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::context::{ContextLookup, ContextTable};
use crate::model::{Context, Period};
use crate::{Error, Result};

const CONTEXT_PREFIX: &str = "context:";

/// Which reporting period a GAAP extraction targets.
///
/// Parses from `current`, `prior-year`, `prior-quarter` or `context:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeriodSelector {
    Current,
    PriorYear,
    PriorQuarter,
    Context(CompactString),
}

impl FromStr for PeriodSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "current" => Ok(PeriodSelector::Current),
            "prior-year" => Ok(PeriodSelector::PriorYear),
            "prior-quarter" => Ok(PeriodSelector::PriorQuarter),
            other => match other.strip_prefix(CONTEXT_PREFIX).map(str::trim) {
                Some(id) if !id.is_empty() => Ok(PeriodSelector::Context(id.into())),
                _ => Err(Error::InvalidSelector(format!(
                    "'{}' (expected current, prior-year, prior-quarter or context:<id>)",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodSelector::Current => f.write_str("current"),
            PeriodSelector::PriorYear => f.write_str("prior-year"),
            PeriodSelector::PriorQuarter => f.write_str("prior-quarter"),
            PeriodSelector::Context(id) => write!(f, "{}{}", CONTEXT_PREFIX, id),
        }
    }
}

impl PeriodSelector {
    /// The date whose reporting period this selector asks for. `None` for an
    /// explicit context, whose date comes from the context itself.
    pub fn target_date(&self, doc_date: NaiveDate) -> Option<NaiveDate> {
        match self {
            PeriodSelector::Current => Some(doc_date),
            PeriodSelector::PriorYear => doc_date.checked_sub_months(Months::new(12)),
            PeriodSelector::PriorQuarter => doc_date.checked_sub_months(Months::new(3)),
            PeriodSelector::Context(_) => None,
        }
    }

    pub fn resolve(
        &self,
        contexts: &ContextTable,
        doc_date: NaiveDate,
        config: &ExtractionConfig,
    ) -> Result<Scope> {
        if let PeriodSelector::Context(id) = self {
            return match contexts.resolve(id) {
                ContextLookup::Resolved(ctx) => Ok(Scope::Context {
                    id: id.clone(),
                    target: ctx.period.end(),
                }),
                ContextLookup::Unresolvable(reason) => Err(Error::InvalidSelector(format!(
                    "context '{}' has an unreadable period: {}",
                    id, reason
                ))),
                ContextLookup::NotFound => Err(Error::InvalidSelector(format!(
                    "context '{}' does not exist in the document",
                    id
                ))),
            };
        }

        let target = self.target_date(doc_date).ok_or_else(|| {
            Error::InvalidSelector(format!("{} is out of range for {}", self, doc_date))
        })?;
        let anchor = anchor_date(contexts, target, config.fiscal_drift_days);
        let duration_start =
            anchor.and_then(|a| duration_start(contexts, a, config.preferred_duration_days));

        debug!(selector = %self, %target, ?anchor, ?duration_start, "period scope resolved");
        Ok(Scope::Period {
            target,
            anchor,
            duration_start,
        })
    }
}

/// The set of contexts a selector admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every resolvable context; used for period-independent metadata.
    Any,
    /// Instants on `anchor`, plus the one duration `duration_start..anchor`.
    /// `anchor` is `None` when no context ends near the target date.
    Period {
        target: NaiveDate,
        anchor: Option<NaiveDate>,
        duration_start: Option<NaiveDate>,
    },
    Context {
        id: CompactString,
        target: NaiveDate,
    },
}

impl Scope {
    pub fn admits(&self, ctx: &Context) -> bool {
        match self {
            Scope::Any => true,
            Scope::Period { anchor: None, .. } => false,
            Scope::Period {
                anchor: Some(anchor),
                duration_start,
                ..
            } => match ctx.period {
                Period::Instant { date } => date == *anchor,
                Period::Duration { start, end } => end == *anchor && Some(start) == *duration_start,
            },
            Scope::Context { id, .. } => ctx.id == *id,
        }
    }

    pub fn target(&self) -> Option<NaiveDate> {
        match self {
            Scope::Any => None,
            Scope::Period { target, .. } | Scope::Context { target, .. } => Some(*target),
        }
    }

    /// The period end date every admitted context shares.
    pub fn anchor(&self) -> Option<NaiveDate> {
        match self {
            Scope::Any => None,
            Scope::Period { anchor, .. } => *anchor,
            Scope::Context { target, .. } => Some(*target),
        }
    }

    /// The caller named a context, so dimensional contexts are fair game.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Scope::Context { .. })
    }

    pub fn matches_target(&self, ctx: &Context) -> bool {
        self.target() == Some(ctx.period.end())
    }
}

fn anchor_date(contexts: &ContextTable, target: NaiveDate, drift_days: i64) -> Option<NaiveDate> {
    contexts
        .resolved()
        .filter(|ctx| !ctx.is_dimensional())
        .map(|ctx| ctx.period.end())
        .map(|end| ((end - target).num_days().abs(), end))
        .filter(|(distance, _)| *distance <= drift_days)
        .min()
        .map(|(_, end)| end)
}

fn duration_start(
    contexts: &ContextTable,
    anchor: NaiveDate,
    preferred_days: Option<i64>,
) -> Option<NaiveDate> {
    let starts = contexts
        .resolved()
        .filter(|ctx| !ctx.is_dimensional())
        .filter_map(|ctx| match ctx.period {
            Period::Duration { start, end } if end == anchor => Some(start),
            _ => None,
        });

    match preferred_days {
        // Earliest start is the longest duration.
        None => starts.min(),
        Some(preferred) => starts
            .map(|start| ((anchor - start).num_days().abs_diff(preferred), start))
            .min()
            .map(|(_, start)| start),
    }
}
