//! Extract GAAP records from many documents at once.
//!
//! Documents share nothing mutable; the concept dictionary is read-only, so
//! each job runs independently and results come back in input order.

use chrono::NaiveDate;

use crate::document::ParsedDocument;
use crate::record::GaapRecord;
use crate::selector::PeriodSelector;
use crate::{ExtractionConfig, Result, XbrlParser};

pub struct BatchJob<'a> {
    pub document: &'a ParsedDocument,
    pub doc_date: NaiveDate,
}

impl<'a> BatchJob<'a> {
    pub fn new(document: &'a ParsedDocument, doc_date: NaiveDate) -> Self {
        Self { document, doc_date }
    }
}

/// One result per job; a failing document does not affect the others.
#[cfg(feature = "parallel")]
pub fn parse_gaap_many(
    jobs: &[BatchJob<'_>],
    selector: &PeriodSelector,
    config: &ExtractionConfig,
) -> Vec<Result<GaapRecord>> {
    use rayon::prelude::*;

    let parser = XbrlParser::with_config(config.clone());
    jobs.par_iter()
        .map(|job| parser.parse_gaap(job.document, job.doc_date, selector))
        .collect()
}

#[cfg(not(feature = "parallel"))]
pub fn parse_gaap_many(
    jobs: &[BatchJob<'_>],
    selector: &PeriodSelector,
    config: &ExtractionConfig,
) -> Vec<Result<GaapRecord>> {
    let parser = XbrlParser::with_config(config.clone());
    jobs.iter()
        .map(|job| parser.parse_gaap(job.document, job.doc_date, selector))
        .collect()
}
