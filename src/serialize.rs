// Record -> JSON in canonical field order
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Number, Value as Json};

use crate::model::Value;
use crate::record::ResultRecord;

/// Render a record as a JSON object holding every canonical field in order.
/// Absent fields are explicit `null`s, never omitted.
pub fn dump(record: impl AsRef<ResultRecord>) -> Json {
    let record = record.as_ref();
    let mut map = Map::with_capacity(record.field_names().count());
    for (field, value) in record.fields() {
        map.insert(field.to_string(), value.map(to_json).unwrap_or(Json::Null));
    }
    Json::Object(map)
}

/// [`dump`] plus where each value came from and what the extraction skipped.
pub fn dump_with_provenance(record: impl AsRef<ResultRecord>) -> Json {
    let record = record.as_ref();
    let mut provenance = Map::new();
    for field in record.field_names() {
        let entry = match record.provenance(field) {
            Some(p) => json!({
                "tag": p.tag,
                "context": p.context_id.as_str(),
                "period": p.period.to_string(),
                "decimals": p.decimals.map(|d| d.to_string()),
                "unit": p.unit,
                "dimensional": p.dimensional,
            }),
            None => Json::Null,
        };
        provenance.insert(field.to_string(), entry);
    }

    json!({
        "vocabulary": record.vocabulary(),
        "fields": dump(record),
        "provenance": provenance,
        "diagnostics": record.diagnostics(),
    })
}

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Decimal(d) => decimal_to_json(*d),
        Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Text(s) => Json::String(s.clone()),
    }
}

// Whole numbers stay exact: beyond i64 they are written as strings rather
// than rounded through f64.
fn decimal_to_json(d: Decimal) -> Json {
    if d.fract().is_zero() {
        return match d.to_i64() {
            Some(n) => Json::Number(n.into()),
            None => Json::String(d.normalize().to_string()),
        };
    }
    d.to_f64()
        .and_then(Number::from_f64)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(d.normalize().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::ConceptDictionary;
    use crate::model::Vocabulary;
    use std::str::FromStr;

    #[test]
    fn test_empty_record_dumps_all_nulls() {
        let dict = ConceptDictionary::standard();
        let record = ResultRecord::empty(Vocabulary::Dei, dict.concepts(Vocabulary::Dei));
        let json = dump(&record);
        let object = json.as_object().unwrap();
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        let expected: Vec<_> = dict.concepts(Vocabulary::Dei).iter().map(|c| c.field).collect();
        assert_eq!(keys, expected);
        assert!(object.values().all(Json::is_null));
    }

    #[test]
    fn test_value_rendering() {
        let d = |s: &str| Value::Decimal(Decimal::from_str(s).unwrap());
        assert_eq!(to_json(&d("41733000000")), json!(41733000000i64));
        assert_eq!(to_json(&d("-500")), json!(-500));
        assert_eq!(to_json(&d("6.38")), json!(6.38));
        assert_eq!(
            to_json(&d("123456789012345678901234")),
            json!("123456789012345678901234")
        );
        assert_eq!(to_json(&d("-9223372036854775809")), json!("-9223372036854775809"));
        assert_eq!(to_json(&d("9223372036854775807")), json!(9223372036854775807i64));
        assert_eq!(
            to_json(&Value::Date(chrono::NaiveDate::from_ymd_opt(2012, 12, 29).unwrap())),
            json!("2012-12-29")
        );
        assert_eq!(to_json(&Value::Boolean(false)), json!(false));
        assert_eq!(to_json(&Value::Text("AAPL".into())), json!("AAPL"));
    }
}
