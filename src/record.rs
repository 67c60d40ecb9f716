//! Result records: every canonical field of a vocabulary, present or absent,
//! with the provenance of each value and the diagnostics of the extraction.

use chrono::NaiveDate;
use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::ops::Deref;
use tracing::warn;

use crate::coerce::{coerce, normalize_cik, CoercionError};
use crate::concepts::ConceptDefinition;
use crate::config::ExtractionConfig;
use crate::extract::{CoercionFailure, Diagnostics, Extraction, SelectedFact};
use crate::model::{Decimals, Period, Value, Vocabulary};
use crate::{Error, Result};

/// Where a field's value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Qualified tag name as written in the document.
    pub tag: String,
    pub context_id: CompactString,
    pub period: Period,
    pub decimals: Option<Decimals>,
    pub unit: Option<String>,
    pub dimensional: bool,
}

impl From<&SelectedFact<'_>> for Provenance {
    fn from(selected: &SelectedFact<'_>) -> Self {
        let fact = &selected.fact;
        Self {
            tag: fact.element.qualified_name(),
            context_id: fact.context.id.clone(),
            period: fact.context.period,
            decimals: fact.attributes.decimals,
            unit: fact.unit_ref().map(str::to_string),
            dimensional: selected.dimensional,
        }
    }
}

/// Field name -> optional typed value for one vocabulary. Every canonical
/// field is always present; a value is either coerced or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    vocabulary: Vocabulary,
    concepts: &'static [ConceptDefinition],
    values: Vec<Option<Value>>,
    provenance: Vec<Option<Provenance>>,
    diagnostics: Diagnostics,
}

impl ResultRecord {
    /// A record with every field absent.
    pub fn empty(vocabulary: Vocabulary, concepts: &'static [ConceptDefinition]) -> Self {
        Self {
            vocabulary,
            concepts,
            values: vec![None; concepts.len()],
            provenance: vec![None; concepts.len()],
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Canonical field names, in output order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.concepts.iter().map(|c| c.field)
    }

    /// Every field in canonical order, absent ones as `None`.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> {
        self.field_names().zip(self.values.iter().map(Option::as_ref))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values[self.position(field)?].as_ref()
    }

    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        self.get(field)?.as_decimal()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field)?.as_date()
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }

    pub fn provenance(&self, field: &str) -> Option<&Provenance> {
        self.provenance[self.position(field)?].as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().flatten().count()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.concepts.iter().position(|c| c.field == field)
    }
}

impl AsRef<ResultRecord> for ResultRecord {
    fn as_ref(&self) -> &ResultRecord {
        self
    }
}

impl Serialize for ResultRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        crate::serialize::dump(self).serialize(serializer)
    }
}

/// Coerce every selected fact and fill in the record.
///
/// With `ignore_errors` a value that cannot be coerced leaves its field absent
/// and is listed in the diagnostics; otherwise the first such value fails the
/// call.
pub fn assemble(extraction: Extraction<'_>, config: &ExtractionConfig) -> Result<ResultRecord> {
    let Extraction {
        vocabulary,
        concepts,
        selected,
        diagnostics,
    } = extraction;

    let mut record = ResultRecord::empty(vocabulary, concepts);
    record.diagnostics = diagnostics;

    for (index, (concept, selection)) in concepts.iter().zip(&selected).enumerate() {
        let Some(selection) = selection else {
            continue;
        };
        let fact = &selection.fact;
        match coerce_field(concept, selection) {
            Ok(value) => {
                record.values[index] = Some(value);
                record.provenance[index] = Some(Provenance::from(selection));
            }
            Err(source) if config.ignore_errors => {
                warn!(
                    vocabulary = %vocabulary,
                    field = concept.field,
                    context = %fact.context.id,
                    error = %source,
                    "value dropped"
                );
                record.diagnostics.coercion_failures.push(CoercionFailure {
                    field: concept.field,
                    context_id: fact.context.id.to_string(),
                    raw: fact.raw_text().to_string(),
                    reason: source.to_string(),
                });
            }
            Err(source) => {
                return Err(Error::Coercion {
                    vocabulary,
                    field: concept.field,
                    context_id: fact.context.id.to_string(),
                    source,
                })
            }
        }
    }

    Ok(record)
}

fn coerce_field(
    concept: &ConceptDefinition,
    selection: &SelectedFact<'_>,
) -> std::result::Result<Value, CoercionError> {
    let fact = &selection.fact;
    let value = coerce(fact.raw_text(), &fact.attributes, concept.kind)?;
    match (concept.field, value) {
        ("entity_central_index_key", Value::Text(cik)) => Ok(Value::Text(normalize_cik(&cik)?)),
        (_, value) => Ok(value),
    }
}

// ============================================================================
// Vocabulary records
// ============================================================================

macro_rules! typed_record {
    ($(#[$meta:meta])* $name:ident, $vocabulary:ident { $($field:ident : $getter:ident -> $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(transparent)]
        pub struct $name(ResultRecord);

        impl $name {
            pub(crate) fn new(record: ResultRecord) -> Self {
                debug_assert_eq!(record.vocabulary(), Vocabulary::$vocabulary);
                $name(record)
            }

            pub fn into_inner(self) -> ResultRecord {
                self.0
            }

            $(
                pub fn $field(&self) -> Option<$ty> {
                    self.0.$getter(stringify!($field))
                }
            )*
        }

        impl TryFrom<ResultRecord> for $name {
            type Error = ResultRecord;

            fn try_from(record: ResultRecord) -> std::result::Result<Self, ResultRecord> {
                if record.vocabulary() == Vocabulary::$vocabulary {
                    Ok($name(record))
                } else {
                    Err(record)
                }
            }
        }

        impl Deref for $name {
            type Target = ResultRecord;

            fn deref(&self) -> &ResultRecord {
                &self.0
            }
        }

        impl AsRef<ResultRecord> for $name {
            fn as_ref(&self) -> &ResultRecord {
                &self.0
            }
        }
    };
}

typed_record!(
    /// Financial-statement values for one reporting period.
    GaapRecord, Gaap {
        assets: decimal -> Decimal,
        current_assets: decimal -> Decimal,
        non_current_assets: decimal -> Decimal,
        cash_and_cash_equivalents: decimal -> Decimal,
        inventory_net: decimal -> Decimal,
        liabilities_and_equity: decimal -> Decimal,
        liabilities: decimal -> Decimal,
        current_liabilities: decimal -> Decimal,
        noncurrent_liabilities: decimal -> Decimal,
        long_term_debt: decimal -> Decimal,
        commitments_and_contingencies: decimal -> Decimal,
        redeemable_noncontrolling_interest: decimal -> Decimal,
        temporary_equity: decimal -> Decimal,
        equity: decimal -> Decimal,
        equity_attributable_interest: decimal -> Decimal,
        stockholders_equity: decimal -> Decimal,
        common_shares_outstanding: decimal -> Decimal,
        common_shares_issued: decimal -> Decimal,
        common_shares_authorized: decimal -> Decimal,
        revenues: decimal -> Decimal,
        cost_of_revenue: decimal -> Decimal,
        gross_profit: decimal -> Decimal,
        research_and_development: decimal -> Decimal,
        selling_general_and_administrative: decimal -> Decimal,
        operating_expenses: decimal -> Decimal,
        costs_and_expenses: decimal -> Decimal,
        other_operating_income: decimal -> Decimal,
        operating_income_loss: decimal -> Decimal,
        nonoperating_income_loss: decimal -> Decimal,
        interest_and_debt_expense: decimal -> Decimal,
        income_before_equity_investments: decimal -> Decimal,
        income_from_equity_investments: decimal -> Decimal,
        income_tax: decimal -> Decimal,
        income_from_continuing_operations_after_tax: decimal -> Decimal,
        income_from_discontinued_operations: decimal -> Decimal,
        extraordinary_items_gain_loss: decimal -> Decimal,
        net_income_loss: decimal -> Decimal,
        net_income_available_to_common_stockholders_basic: decimal -> Decimal,
        preferred_stock_dividends: decimal -> Decimal,
        net_income_attributable_to_noncontrolling_interest: decimal -> Decimal,
        earnings_per_share_basic: decimal -> Decimal,
        earnings_per_share_diluted: decimal -> Decimal,
        weighted_average_shares_basic: decimal -> Decimal,
        weighted_average_shares_diluted: decimal -> Decimal,
        other_comprehensive_income: decimal -> Decimal,
        comprehensive_income: decimal -> Decimal,
        comprehensive_income_parent: decimal -> Decimal,
        comprehensive_income_interest: decimal -> Decimal,
        net_cash_flows_operating: decimal -> Decimal,
        net_cash_flows_investing: decimal -> Decimal,
        net_cash_flows_financing: decimal -> Decimal,
        net_cash_flows_operating_continuing: decimal -> Decimal,
        net_cash_flows_investing_continuing: decimal -> Decimal,
        net_cash_flows_financing_continuing: decimal -> Decimal,
        net_cash_flows_operating_discontinued: decimal -> Decimal,
        net_cash_flows_investing_discontinued: decimal -> Decimal,
        net_cash_flows_discontinued: decimal -> Decimal,
        payments_for_property_plant_and_equipment: decimal -> Decimal,
        dividends_paid: decimal -> Decimal,
        exchange_gains_losses: decimal -> Decimal,
        cash_period_increase_decrease: decimal -> Decimal,
    }
);

typed_record!(
    /// Document and entity information.
    DeiRecord, Dei {
        entity_registrant_name: text -> &str,
        entity_central_index_key: text -> &str,
        trading_symbol: text -> &str,
        document_type: text -> &str,
        document_period_end_date: date -> NaiveDate,
        document_fiscal_year_focus: text -> &str,
        document_fiscal_period_focus: text -> &str,
        current_fiscal_year_end_date: text -> &str,
        amendment_flag: boolean -> bool,
        entity_filer_category: text -> &str,
        entity_current_reporting_status: text -> &str,
        entity_well_known_seasoned_issuer: text -> &str,
        entity_voluntary_filers: text -> &str,
        entity_common_stock_shares_outstanding: decimal -> Decimal,
        entity_public_float: decimal -> Decimal,
    }
);

/// Movement of one numeric field between two periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub field: &'static str,
    pub current: Decimal,
    pub prior: Decimal,
    pub absolute: Decimal,
    /// `absolute / |prior|`; `None` when the prior value is zero.
    pub relative: Option<Decimal>,
}

impl GaapRecord {
    /// Changes for every numeric field present in both records, in
    /// canonical order.
    pub fn year_over_year(&self, prior: &GaapRecord) -> Vec<Change> {
        self.fields()
            .filter_map(|(field, value)| {
                let current = value?.as_decimal()?;
                let prior = prior.decimal(field)?;
                let absolute = current - prior;
                let relative = if prior.is_zero() {
                    None
                } else {
                    absolute.checked_div(prior.abs())
                };
                Some(Change {
                    field,
                    current,
                    prior,
                    absolute,
                    relative,
                })
            })
            .collect()
    }
}
