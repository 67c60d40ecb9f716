// Context table: context id -> resolved reporting period
use ahash::AHashMap;
use chrono::NaiveDate;
use compact_str::CompactString;
use tracing::{debug, warn};

use crate::document::{Element, ParsedDocument};
use crate::model::{Context, ContextFlags, Period};
use crate::{Error, Result};

const ROOT_ELEMENT: &str = "xbrl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEntry {
    Resolved(Context),
    /// The context exists but its period could not be read.
    Unresolvable { id: CompactString, reason: String },
}

impl ContextEntry {
    pub fn id(&self) -> &str {
        match self {
            ContextEntry::Resolved(ctx) => &ctx.id,
            ContextEntry::Unresolvable { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLookup<'a> {
    Resolved(&'a Context),
    Unresolvable(&'a str),
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct ContextTable {
    entries: AHashMap<CompactString, ContextEntry>,
    order: Vec<CompactString>,
}

impl ContextTable {
    /// Scan every `context` element once. A context whose period cannot be
    /// read is kept as [`ContextEntry::Unresolvable`] rather than failing the
    /// document; only a missing `xbrl` root is fatal.
    pub fn build(document: &ParsedDocument) -> Result<Self> {
        let root = document.root();
        if root.local_name() != ROOT_ELEMENT {
            return Err(Error::UnrecognizedRoot(root.qualified_name()));
        }

        let mut table = ContextTable::default();
        for element in root.descendants().filter(|e| e.local_name() == "context") {
            let Some(id) = element.attr("id").map(str::trim) else {
                warn!("context element without id attribute skipped");
                continue;
            };
            let entry = match read_period(element) {
                Ok(period) => ContextEntry::Resolved(Context {
                    id: id.into(),
                    period,
                    flags: read_flags(element),
                }),
                Err(reason) => {
                    debug!(context = id, %reason, "unresolvable context");
                    ContextEntry::Unresolvable {
                        id: id.into(),
                        reason,
                    }
                }
            };
            table.insert(entry);
        }

        debug!(contexts = table.len(), "context table built");
        Ok(table)
    }

    /// Later duplicates overwrite earlier entries but keep the first position.
    pub fn insert(&mut self, entry: ContextEntry) {
        let id = CompactString::from(entry.id());
        if self.entries.insert(id.clone(), entry).is_some() {
            warn!(context = %id, "duplicate context id, later definition wins");
        } else {
            self.order.push(id);
        }
    }

    pub fn resolve(&self, id: &str) -> ContextLookup<'_> {
        match self.entries.get(id.trim()) {
            Some(ContextEntry::Resolved(ctx)) => ContextLookup::Resolved(ctx),
            Some(ContextEntry::Unresolvable { reason, .. }) => ContextLookup::Unresolvable(reason),
            None => ContextLookup::NotFound,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Context> {
        match self.resolve(id) {
            ContextLookup::Resolved(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Entries in first-seen document order.
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn resolved(&self) -> impl Iterator<Item = &Context> {
        self.entries().filter_map(|entry| match entry {
            ContextEntry::Resolved(ctx) => Some(ctx),
            ContextEntry::Unresolvable { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_period(context: &Element) -> std::result::Result<Period, String> {
    let period = context
        .descendants()
        .find(|e| e.local_name() == "period")
        .ok_or_else(|| "missing period".to_string())?;

    if let Some(instant) = period.child("instant") {
        return Ok(Period::Instant {
            date: read_date(instant)?,
        });
    }

    match (period.child("startDate"), period.child("endDate")) {
        (Some(start), Some(end)) => {
            let start = read_date(start)?;
            let end = read_date(end)?;
            if end < start {
                return Err(format!("period ends {} before it starts {}", end, start));
            }
            Ok(Period::Duration { start, end })
        }
        _ if period.child("forever").is_some() => Err("forever period".to_string()),
        _ => Err("period has neither instant nor startDate/endDate".to_string()),
    }
}

// xbrli dates may carry a time part; only the calendar date matters here.
fn read_date(element: &Element) -> std::result::Result<NaiveDate, String> {
    let text = element.text();
    let date = text.split_once('T').map(|(d, _)| d).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("invalid {} '{}'", element.local_name(), text))
}

fn read_flags(context: &Element) -> ContextFlags {
    let mut flags = ContextFlags::empty();
    for element in context.descendants() {
        match element.local_name() {
            "segment" if element.has_element_content() => flags |= ContextFlags::SEGMENT,
            "scenario" if element.has_element_content() => flags |= ContextFlags::SCENARIO,
            _ => {}
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;

    const CONTEXTS: &str = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
        xmlns:xbrldi="http://xbrl.org/2006/xbrldi">
  <xbrli:context id="I2012Q1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>2012-12-29</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="D2012Q1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period>
      <xbrli:startDate>2012-09-30</xbrli:startDate>
      <xbrli:endDate>2012-12-29</xbrli:endDate>
    </xbrli:period>
  </xbrli:context>
  <xbrli:context id="I2012Q1_Segment">
    <xbrli:entity>
      <xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier>
      <xbrli:segment><xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">aapl:AmericasMember</xbrldi:explicitMember></xbrli:segment>
    </xbrli:entity>
    <xbrli:period><xbrli:instant>2012-12-29</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="Broken">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>29/12/2012</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="Backwards">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period>
      <xbrli:startDate>2012-12-29</xbrli:startDate>
      <xbrli:endDate>2012-09-30</xbrli:endDate>
    </xbrli:period>
  </xbrli:context>
</xbrli:xbrl>"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_build_resolves_periods() {
        let doc = parse_str(CONTEXTS).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        assert_eq!(table.len(), 5);

        let instant = table.get("I2012Q1").unwrap();
        assert_eq!(instant.period, Period::Instant { date: date(2012, 12, 29) });
        assert!(!instant.is_dimensional());

        let duration = table.get("D2012Q1").unwrap();
        assert_eq!(
            duration.period,
            Period::Duration {
                start: date(2012, 9, 30),
                end: date(2012, 12, 29)
            }
        );
    }

    #[test]
    fn test_segment_marks_dimensional() {
        let doc = parse_str(CONTEXTS).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        let ctx = table.get("I2012Q1_Segment").unwrap();
        assert!(ctx.is_dimensional());
        assert!(ctx.flags.contains(ContextFlags::SEGMENT));
    }

    #[test]
    fn test_malformed_periods_are_unresolvable() {
        let doc = parse_str(CONTEXTS).unwrap();
        let table = ContextTable::build(&doc).unwrap();
        assert!(matches!(table.resolve("Broken"), ContextLookup::Unresolvable(_)));
        assert!(matches!(table.resolve("Backwards"), ContextLookup::Unresolvable(_)));
        assert_eq!(table.resolve("Nope"), ContextLookup::NotFound);
        assert_eq!(table.resolved().count(), 3);
    }

    #[test]
    fn test_duplicate_ids_overwrite() {
        let doc = parse_str(
            r#"<xbrl>
              <context id="c"><period><instant>2011-09-24</instant></period></context>
              <context id="c"><period><instant>2012-12-29</instant></period></context>
            </xbrl>"#,
        )
        .unwrap();
        let table = ContextTable::build(&doc).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("c").unwrap().period.end(), date(2012, 12, 29));
        assert_eq!(table.entries().count(), 1);
    }

    #[test]
    fn test_datetime_period_accepted() {
        let doc = parse_str(
            r#"<xbrl><context id="c"><period><instant>2012-12-29T00:00:00</instant></period></context></xbrl>"#,
        )
        .unwrap();
        let table = ContextTable::build(&doc).unwrap();
        assert_eq!(table.get("c").unwrap().period.end(), date(2012, 12, 29));
    }

    #[test]
    fn test_unrecognized_root() {
        let doc = parse_str("<html><body/></html>").unwrap();
        assert!(matches!(
            ContextTable::build(&doc),
            Err(Error::UnrecognizedRoot(name)) if name == "html"
        ));
    }
}
