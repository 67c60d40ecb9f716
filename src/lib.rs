//! factrl - XBRL fact extraction for US-GAAP and DEI filings
//!
//! Licensed under AGPL-3.0

pub mod batch;
pub mod coerce;
pub mod concepts;
pub mod config;
pub mod context;
pub mod document;
pub mod extract;
pub mod model;
pub mod record;
pub mod selector;
pub mod serialize;

use chrono::NaiveDate;
use std::io::BufRead;
use std::path::Path;
use tracing::info;

pub use coerce::CoercionError;
pub use concepts::{ConceptDefinition, ConceptDictionary};
pub use config::ExtractionConfig;
pub use context::ContextTable;
pub use document::ParsedDocument;
pub use extract::Diagnostics;
pub use model::{Period, Value, Vocabulary};
pub use record::{Change, DeiRecord, GaapRecord, Provenance, ResultRecord};
pub use selector::{PeriodSelector, Scope};
pub use serialize::{dump, dump_with_provenance};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Not an XBRL instance: root element is <{0}>")]
    UnrecognizedRoot(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid document date '{0}' (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("{vocabulary} field '{field}' references undefined context '{context_id}'")]
    UnresolvableContext {
        vocabulary: Vocabulary,
        field: &'static str,
        context_id: String,
    },

    #[error("{vocabulary} field '{field}' in context '{context_id}': {source}")]
    Coercion {
        vocabulary: Vocabulary,
        field: &'static str,
        context_id: String,
        #[source]
        source: CoercionError,
    },
}

/// Parse an XBRL instance from any buffered reader.
pub fn parse<R: BufRead>(source: R) -> Result<ParsedDocument> {
    document::parse(source)
}

/// Extract the GAAP record for the period `context` selects relative to
/// `doc_date`.
pub fn parse_gaap(
    document: &ParsedDocument,
    doc_date: NaiveDate,
    context: &PeriodSelector,
    ignore_errors: bool,
) -> Result<GaapRecord> {
    XbrlParser::new()
        .with_ignore_errors(ignore_errors)
        .parse_gaap(document, doc_date, context)
}

/// Extract the DEI record. Document metadata is period-independent, so every
/// context is in scope.
pub fn parse_dei(document: &ParsedDocument) -> Result<DeiRecord> {
    XbrlParser::new().parse_dei(document)
}

/// Accepts `YYYYMMDD` as well as `YYYY-MM-DD`.
pub fn parse_doc_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let format = if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        "%Y%m%d"
    } else {
        "%Y-%m-%d"
    };
    NaiveDate::parse_from_str(raw, format).map_err(|_| Error::InvalidDate(raw.to_string()))
}

/// Parser and extractor sharing one [`ExtractionConfig`].
pub struct XbrlParser {
    config: ExtractionConfig,
    dictionary: &'static ConceptDictionary,
}

impl XbrlParser {
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self {
            config,
            dictionary: ConceptDictionary::standard(),
        }
    }

    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.config.ignore_errors = ignore_errors;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn parse<R: BufRead>(&self, source: R) -> Result<ParsedDocument> {
        document::parse(source)
    }

    pub fn parse_str(&self, text: &str) -> Result<ParsedDocument> {
        document::parse_str(text)
    }

    pub fn parse_bytes(&self, data: &[u8]) -> Result<ParsedDocument> {
        document::parse_bytes(data)
    }

    #[cfg(not(feature = "mmap"))]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedDocument> {
        let content = std::fs::read(path)?;
        self.parse_bytes(&content)
    }

    #[cfg(feature = "mmap")]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedDocument> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this call returns.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        self.parse_bytes(&mmap)
    }

    pub fn parse_gaap(
        &self,
        document: &ParsedDocument,
        doc_date: NaiveDate,
        selector: &PeriodSelector,
    ) -> Result<GaapRecord> {
        let contexts = ContextTable::build(document)?;
        let scope = selector.resolve(&contexts, doc_date, &self.config)?;
        let record = self.extract(document, &contexts, Vocabulary::Gaap, &scope)?;
        info!(
            selector = %selector,
            %doc_date,
            period_end = ?scope.anchor(),
            fields = record.present_count(),
            "GAAP record assembled"
        );
        Ok(GaapRecord::new(record))
    }

    pub fn parse_dei(&self, document: &ParsedDocument) -> Result<DeiRecord> {
        let contexts = ContextTable::build(document)?;
        let record = self.extract(document, &contexts, Vocabulary::Dei, &Scope::Any)?;
        info!(fields = record.present_count(), "DEI record assembled");
        Ok(DeiRecord::new(record))
    }

    fn extract(
        &self,
        document: &ParsedDocument,
        contexts: &ContextTable,
        vocabulary: Vocabulary,
        scope: &Scope,
    ) -> Result<ResultRecord> {
        let extraction = extract::FactExtractor::new(self.dictionary, &self.config)
            .extract(document, contexts, vocabulary, scope)?;
        record::assemble(extraction, &self.config)
    }
}

impl Default for XbrlParser {
    fn default() -> Self {
        Self::new()
    }
}
