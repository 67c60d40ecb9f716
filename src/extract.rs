//! Fact extraction: walk the tagged elements, resolve their contexts, classify
//! them against the concept dictionary and keep the best fact per field.
//!
//! Selection order for duplicates reported in the same scope:
//! 1. period kind matching the concept's constraint
//! 2. period end equal to the selector's target date
//! 3. higher `decimals` precision (`INF` best, missing worst)
//! 4. first in document order
//!
//! A fact whose period kind contradicts its concept is still a candidate; it
//! only loses to one that does not.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::concepts::{ConceptDefinition, ConceptDictionary};
use crate::config::ExtractionConfig;
use crate::context::{ContextLookup, ContextTable};
use crate::document::{Element, ParsedDocument};
use crate::model::{Context, Decimals, FactAttributes, Vocabulary};
use crate::selector::Scope;
use crate::{Error, Result};

/// One tagged element that survived context and concept classification.
#[derive(Debug, Clone, Copy)]
pub struct RawFact<'a> {
    pub concept: &'static ConceptDefinition,
    pub element: &'a Element,
    pub context: &'a Context,
    pub attributes: FactAttributes<'a>,
    /// Position in document order.
    pub order: usize,
}

impl<'a> RawFact<'a> {
    pub fn raw_text(&self) -> &'a str {
        self.element.text()
    }

    pub fn unit_ref(&self) -> Option<&'a str> {
        self.element.attr("unitRef")
    }
}

/// The fact chosen to represent a field for one extraction call.
#[derive(Debug, Clone, Copy)]
pub struct SelectedFact<'a> {
    pub fact: RawFact<'a>,
    /// Chosen from a dimensional context because nothing else was reported.
    pub dimensional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionFailure {
    pub field: &'static str,
    pub context_id: String,
    pub raw: String,
    pub reason: String,
}

/// What an extraction skipped or could not decide, reported alongside the
/// record instead of guessed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub resolved_period_end: Option<NaiveDate>,
    /// Fields reported only under dimensional contexts in scope.
    pub dimensional_only: Vec<&'static str>,
    /// Context ids referenced by known concepts but never defined.
    pub dangling_contexts: Vec<String>,
    /// Context ids referenced by known concepts whose period was unreadable.
    pub unresolvable_contexts: Vec<String>,
    pub coercion_failures: Vec<CoercionFailure>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.dimensional_only.is_empty()
            && self.dangling_contexts.is_empty()
            && self.unresolvable_contexts.is_empty()
            && self.coercion_failures.is_empty()
    }
}

/// Field -> selected fact, in the vocabulary's canonical order.
#[derive(Debug, Clone)]
pub struct Extraction<'a> {
    pub vocabulary: Vocabulary,
    pub concepts: &'static [ConceptDefinition],
    pub selected: Vec<Option<SelectedFact<'a>>>,
    pub diagnostics: Diagnostics,
}

impl<'a> Extraction<'a> {
    pub fn get(&self, field: &str) -> Option<&SelectedFact<'a>> {
        let index = self.concepts.iter().position(|c| c.field == field)?;
        self.selected[index].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static ConceptDefinition, Option<&SelectedFact<'a>>)> {
        self.concepts.iter().zip(self.selected.iter().map(Option::as_ref))
    }
}

pub struct FactExtractor<'c> {
    dictionary: &'c ConceptDictionary,
    config: &'c ExtractionConfig,
}

impl<'c> FactExtractor<'c> {
    pub fn new(dictionary: &'c ConceptDictionary, config: &'c ExtractionConfig) -> Self {
        Self { dictionary, config }
    }

    pub fn extract<'a>(
        &self,
        document: &'a ParsedDocument,
        contexts: &'a ContextTable,
        vocabulary: Vocabulary,
        scope: &Scope,
    ) -> Result<Extraction<'a>> {
        let concepts = self.dictionary.concepts(vocabulary);
        let mut primary: Vec<Option<RawFact<'a>>> = vec![None; concepts.len()];
        let mut dimensional: Vec<Option<RawFact<'a>>> = vec![None; concepts.len()];
        let mut diagnostics = Diagnostics {
            resolved_period_end: scope.anchor(),
            ..Diagnostics::default()
        };
        let mut candidates = 0usize;

        for (order, element) in document.root().descendants().enumerate() {
            if !vocabulary.matches(element) {
                continue;
            }
            let Some(index) = self.dictionary.lookup_index(element.local_name(), vocabulary) else {
                continue;
            };
            let concept = &concepts[index];
            let Some(context_ref) = element.attr("contextRef").map(str::trim) else {
                debug!(tag = %element.qualified_name(), "fact without contextRef skipped");
                continue;
            };

            let context = match contexts.resolve(context_ref) {
                ContextLookup::Resolved(ctx) => ctx,
                ContextLookup::Unresolvable(reason) => {
                    debug!(field = concept.field, context = context_ref, reason, "unresolvable context");
                    push_unique(&mut diagnostics.unresolvable_contexts, context_ref);
                    continue;
                }
                ContextLookup::NotFound => {
                    if !self.config.ignore_errors {
                        return Err(Error::UnresolvableContext {
                            vocabulary,
                            field: concept.field,
                            context_id: context_ref.to_string(),
                        });
                    }
                    warn!(field = concept.field, context = context_ref, "fact references undefined context");
                    push_unique(&mut diagnostics.dangling_contexts, context_ref);
                    continue;
                }
            };

            if !scope.admits(context) {
                continue;
            }

            let attributes = FactAttributes::from_element(element);
            if attributes.nil {
                debug!(field = concept.field, context = context_ref, "nil fact skipped");
                continue;
            }

            candidates += 1;
            let fact = RawFact {
                concept,
                element,
                context,
                attributes,
                order,
            };
            let slot = if context.is_dimensional() && !scope.is_explicit() {
                &mut dimensional[index]
            } else {
                &mut primary[index]
            };
            keep_better(slot, fact, scope);
        }

        let mut selected = Vec::with_capacity(concepts.len());
        for (concept, (primary, dimensional)) in concepts.iter().zip(primary.into_iter().zip(dimensional)) {
            selected.push(match (primary, dimensional) {
                (Some(fact), _) => Some(SelectedFact {
                    fact,
                    dimensional: false,
                }),
                (None, Some(fact)) => {
                    diagnostics.dimensional_only.push(concept.field);
                    self.config.include_dimensional.then_some(SelectedFact {
                        fact,
                        dimensional: true,
                    })
                }
                (None, None) => None,
            });
        }

        debug!(
            vocabulary = %vocabulary,
            candidates,
            selected = selected.iter().flatten().count(),
            "facts extracted"
        );
        Ok(Extraction {
            vocabulary,
            concepts,
            selected,
            diagnostics,
        })
    }
}

fn keep_better<'a>(slot: &mut Option<RawFact<'a>>, candidate: RawFact<'a>, scope: &Scope) {
    let replace = match slot {
        None => true,
        Some(incumbent) => rank(&candidate, scope) > rank(incumbent, scope),
    };
    if replace {
        *slot = Some(candidate);
    }
}

// Greater wins; equal ranks keep the earlier fact.
fn rank(fact: &RawFact<'_>, scope: &Scope) -> (bool, bool, Option<Decimals>) {
    (
        fact.concept.period.admits(fact.context.period.kind()),
        scope.matches_target(fact.context),
        fact.attributes.decimals,
    )
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::selector::PeriodSelector;

    const DOC: &str = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
        xmlns:us-gaap="http://fasb.org/us-gaap/2012-01-31"
        xmlns:dei="http://xbrl.sec.gov/dei/2012-01-31"
        xmlns:aapl="http://www.apple.com/20121229"
        xmlns:xbrldi="http://xbrl.org/2006/xbrldi">
  <xbrli:context id="I2012Q1"><xbrli:period><xbrli:instant>2012-12-29</xbrli:instant></xbrli:period></xbrli:context>
  <xbrli:context id="I2011Q1"><xbrli:period><xbrli:instant>2011-12-31</xbrli:instant></xbrli:period></xbrli:context>
  <xbrli:context id="D2013Q1">
    <xbrli:period><xbrli:startDate>2012-09-30</xbrli:startDate><xbrli:endDate>2012-12-29</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <xbrli:context id="I2012Q1_Americas">
    <xbrli:entity><xbrli:segment><xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">aapl:AmericasMember</xbrldi:explicitMember></xbrli:segment></xbrli:entity>
    <xbrli:period><xbrli:instant>2012-12-29</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="Bad"><xbrli:period><xbrli:instant>not-a-date</xbrli:instant></xbrli:period></xbrli:context>

  <us-gaap:Assets contextRef="I2011Q1" decimals="-6" unitRef="usd">116371</us-gaap:Assets>
  <us-gaap:Assets contextRef="I2012Q1" decimals="-6" unitRef="usd">196088</us-gaap:Assets>
  <us-gaap:Assets contextRef="I2012Q1" decimals="0" unitRef="usd">196088000000</us-gaap:Assets>
  <us-gaap:NetIncomeLoss contextRef="D2013Q1" decimals="-6" unitRef="usd">13078</us-gaap:NetIncomeLoss>
  <us-gaap:NetIncomeLoss contextRef="I2012Q1" decimals="-6" unitRef="usd">1</us-gaap:NetIncomeLoss>
  <us-gaap:Liabilities contextRef="I2012Q1_Americas" decimals="-6" unitRef="usd">5</us-gaap:Liabilities>
  <us-gaap:Goodwill contextRef="Bad" decimals="-6" unitRef="usd">1</us-gaap:Goodwill>
  <us-gaap:LiabilitiesCurrent contextRef="Bad" decimals="-6" unitRef="usd">1</us-gaap:LiabilitiesCurrent>
  <aapl:Assets contextRef="I2012Q1" decimals="0">999</aapl:Assets>
  <dei:TradingSymbol contextRef="D2013Q1">aapl</dei:TradingSymbol>
</xbrli:xbrl>"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn current(config: &ExtractionConfig) -> (ParsedDocument, ContextTable, Scope) {
        let doc = parse_str(DOC).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let scope = PeriodSelector::Current
            .resolve(&table, date(2012, 12, 29), config)
            .unwrap();
        (doc, table, scope)
    }

    #[test]
    fn test_current_period_prefers_precision() {
        let config = ExtractionConfig::default();
        let (doc, table, scope) = current(&config);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();

        let assets = extraction.get("assets").unwrap();
        assert_eq!(assets.fact.context.id, "I2012Q1");
        assert_eq!(assets.fact.raw_text(), "196088000000");
        assert_eq!(assets.fact.unit_ref(), Some("usd"));
        assert!(!assets.dimensional);
    }

    #[test]
    fn test_period_constraint_prefers_matching_kind() {
        let config = ExtractionConfig::default();
        let (doc, table, scope) = current(&config);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();

        // Both are in scope; net income is a duration concept.
        let net_income = extraction.get("net_income_loss").unwrap();
        assert_eq!(net_income.fact.context.id, "D2013Q1");
        assert_eq!(net_income.fact.raw_text(), "13078");
    }

    #[test]
    fn test_mismatched_kind_used_when_alone() {
        let doc = parse_str(
            r#"<xbrl xmlns:us-gaap="http://fasb.org/us-gaap/2012-01-31">
                 <context id="c1"><period><instant>2012-12-29</instant></period></context>
                 <us-gaap:NetIncomeLoss contextRef="c1" decimals="0">41733000000</us-gaap:NetIncomeLoss>
               </xbrl>"#,
        )
        .unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let config = ExtractionConfig::default();
        let scope = PeriodSelector::Current
            .resolve(&table, date(2012, 12, 29), &config)
            .unwrap();
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();
        assert_eq!(extraction.get("net_income_loss").unwrap().fact.raw_text(), "41733000000");
    }

    #[test]
    fn test_dimensional_only_fields_are_flagged() {
        let config = ExtractionConfig::default();
        let (doc, table, scope) = current(&config);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();

        assert!(extraction.get("liabilities").is_none());
        assert_eq!(extraction.diagnostics.dimensional_only, vec!["liabilities"]);

        let permissive = ExtractionConfig::default().with_include_dimensional(true);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &permissive)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();
        let liabilities = extraction.get("liabilities").unwrap();
        assert!(liabilities.dimensional);
        assert_eq!(liabilities.fact.context.id, "I2012Q1_Americas");
    }

    #[test]
    fn test_unresolvable_contexts_are_recorded_not_fatal() {
        let config = ExtractionConfig::default();
        let (doc, table, scope) = current(&config);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();

        assert!(extraction.get("current_liabilities").is_none());
        // Goodwill is not a known concept, so only LiabilitiesCurrent is reported.
        assert_eq!(extraction.diagnostics.unresolvable_contexts, vec!["Bad"]);
    }

    #[test]
    fn test_foreign_namespace_is_ignored() {
        let config = ExtractionConfig::default();
        let doc = parse_str(DOC).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let scope = PeriodSelector::Context("I2012Q1".into())
            .resolve(&table, date(2012, 12, 29), &config)
            .unwrap();
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();
        // aapl:Assets shares the local name but not the namespace.
        assert_eq!(extraction.get("assets").unwrap().fact.raw_text(), "196088000000");
    }

    #[test]
    fn test_dei_scope_any() {
        let config = ExtractionConfig::default();
        let doc = parse_str(DOC).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
            .extract(&doc, &table, Vocabulary::Dei, &Scope::Any)
            .unwrap();
        assert_eq!(extraction.get("trading_symbol").unwrap().fact.raw_text(), "aapl");
        assert!(extraction.get("assets").is_none());
        assert_eq!(extraction.diagnostics.resolved_period_end, None);
    }

    #[test]
    fn test_dangling_context_policy() {
        let doc = parse_str(
            r#"<xbrl xmlns:us-gaap="http://fasb.org/us-gaap/2012-01-31">
                 <context id="c1"><period><instant>2012-12-29</instant></period></context>
                 <us-gaap:Assets contextRef="missing" decimals="0">1</us-gaap:Assets>
                 <us-gaap:Assets contextRef="c1" decimals="0">2</us-gaap:Assets>
               </xbrl>"#,
        )
        .unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let strict = ExtractionConfig::default();
        let scope = PeriodSelector::Current
            .resolve(&table, date(2012, 12, 29), &strict)
            .unwrap();

        let err = FactExtractor::new(ConceptDictionary::standard(), &strict)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvableContext { field: "assets", ref context_id, .. } if context_id == "missing"
        ));

        let lenient = ExtractionConfig::default().with_ignore_errors(true);
        let extraction = FactExtractor::new(ConceptDictionary::standard(), &lenient)
            .extract(&doc, &table, Vocabulary::Gaap, &scope)
            .unwrap();
        assert_eq!(extraction.get("assets").unwrap().fact.raw_text(), "2");
        assert_eq!(extraction.diagnostics.dangling_contexts, vec!["missing"]);
    }

    #[test]
    fn test_ties_keep_document_order() {
        let doc = parse_str(
            r#"<xbrl xmlns:us-gaap="http://fasb.org/us-gaap/2012-01-31">
                 <context id="a"><period><instant>2012-12-29</instant></period></context>
                 <context id="b"><period><instant>2012-12-29</instant></period></context>
                 <us-gaap:Assets contextRef="a" decimals="-6">1</us-gaap:Assets>
                 <us-gaap:Assets contextRef="b" decimals="-6">2</us-gaap:Assets>
                 <us-gaap:Assets contextRef="b" xsi:nil="true" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"/>
               </xbrl>"#,
        )
        .unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let config = ExtractionConfig::default();
        let scope = PeriodSelector::Current
            .resolve(&table, date(2012, 12, 29), &config)
            .unwrap();
        for _ in 0..5 {
            let extraction = FactExtractor::new(ConceptDictionary::standard(), &config)
                .extract(&doc, &table, Vocabulary::Gaap, &scope)
                .unwrap();
            let assets = extraction.get("assets").unwrap();
            assert_eq!(assets.fact.raw_text(), "1");
            assert_eq!(assets.fact.context.id, "a");
        }
    }
}
