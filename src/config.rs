use serde::{Deserialize, Serialize};

/// Knobs for one extraction call.
///
/// `ignore_errors` defaults to `false`: a value that cannot be coerced fails
/// the whole call and names the field. Set it to `true` to record such fields
/// as absent and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub ignore_errors: bool,
    /// Maximum distance in days between a context's end date and the
    /// selector's target date for the context to count as the same period.
    /// Covers 52/53-week fiscal calendars.
    pub fiscal_drift_days: i64,
    /// Prefer durations closest to this length (90 for a 10-Q, 365 for a
    /// 10-K). `None` prefers the longest duration.
    pub preferred_duration_days: Option<i64>,
    /// Fall back to a dimensional fact when no default-dimension fact exists.
    pub include_dimensional: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            fiscal_drift_days: 7,
            preferred_duration_days: None,
            include_dimensional: false,
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    pub fn with_fiscal_drift_days(mut self, days: i64) -> Self {
        self.fiscal_drift_days = days.max(0);
        self
    }

    pub fn with_preferred_duration_days(mut self, days: Option<i64>) -> Self {
        self.preferred_duration_days = days.map(|d| d.max(0));
        self
    }

    pub fn with_include_dimensional(mut self, include: bool) -> Self {
        self.include_dimensional = include;
        self
    }

    /// 10-Q documents: quarterly durations win over year-to-date ones.
    pub fn quarterly() -> Self {
        Self::default().with_preferred_duration_days(Some(90))
    }

    /// 10-K documents.
    pub fn annual() -> Self {
        Self::default().with_preferred_duration_days(Some(365))
    }
}
