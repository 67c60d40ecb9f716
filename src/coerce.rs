// Raw fact text -> typed value
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::model::{Decimals, FactAttributes, Value, ValueKind};

// Decimal carries at most 28 fractional digits.
const MAX_SCALE: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("empty value")]
    EmptyValue,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("value '{raw}' overflows when scaled by 10^{exponent}")]
    Overflow { raw: String, exponent: i64 },

    #[error("invalid {name} attribute '{raw}'")]
    InvalidAttribute { name: &'static str, raw: String },

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid boolean '{0}'")]
    InvalidBoolean(String),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

impl CoercionError {
    /// The offending raw text, when there was any.
    pub fn raw(&self) -> &str {
        match self {
            CoercionError::EmptyValue => "",
            CoercionError::InvalidNumber(raw)
            | CoercionError::Overflow { raw, .. }
            | CoercionError::InvalidAttribute { raw, .. }
            | CoercionError::InvalidDate(raw)
            | CoercionError::InvalidBoolean(raw)
            | CoercionError::InvalidIdentifier(raw) => raw,
        }
    }
}

/// Convert a fact's raw text into a value of the expected kind.
///
/// Numeric kinds apply, in order: accounting parentheses, the magnitude
/// exponent (an explicit `scale`, otherwise the magnitude of a negative
/// `decimals`), then the `sign` attribute. Dates must be ISO 8601
/// `YYYY-MM-DD`. Strings and booleans are trimmed.
pub fn coerce(
    raw: &str,
    attributes: &FactAttributes,
    kind: ValueKind,
) -> Result<Value, CoercionError> {
    let text = raw.trim();
    match kind {
        ValueKind::Monetary | ValueKind::Shares | ValueKind::PerShare => {
            coerce_number(text, attributes).map(Value::Decimal)
        }
        ValueKind::Date => coerce_date(text).map(Value::Date),
        ValueKind::Boolean => coerce_bool(text).map(Value::Boolean),
        ValueKind::String => Ok(Value::Text(text.to_string())),
    }
}

/// Power of ten a fact's raw number is multiplied by.
///
/// Widened to `i64`: `decimals="-2147483648"` is a valid `xs:int`.
pub fn magnitude_exponent(attributes: &FactAttributes) -> i64 {
    match (attributes.scale, attributes.decimals) {
        (Some(scale), _) => i64::from(scale),
        (None, Some(Decimals::Finite(d))) if d < 0 => -i64::from(d),
        _ => 0,
    }
}

fn coerce_number(text: &str, attributes: &FactAttributes) -> Result<Decimal, CoercionError> {
    if text.is_empty() {
        return Err(CoercionError::EmptyValue);
    }
    if let Some(attribute) = attributes.malformed {
        return Err(CoercionError::InvalidAttribute {
            name: attribute.name,
            raw: attribute.value.to_string(),
        });
    }

    let (body, parenthesized) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (text, false),
    };
    let cleaned: String = body.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(CoercionError::InvalidNumber(text.to_string()));
    }

    let parsed = if cleaned.contains(['e', 'E']) {
        Decimal::from_scientific(&cleaned)
    } else {
        Decimal::from_str(&cleaned)
    }
    .map_err(|_| CoercionError::InvalidNumber(text.to_string()))?;

    let exponent = magnitude_exponent(attributes);
    let mut value = pow10(exponent)
        .and_then(|factor| parsed.checked_mul(factor))
        .ok_or_else(|| CoercionError::Overflow {
            raw: text.to_string(),
            exponent,
        })?;

    if parenthesized != attributes.negated {
        value = -value;
    }
    Ok(value.normalize())
}

fn pow10(exponent: i64) -> Option<Decimal> {
    let magnitude = u32::try_from(exponent.unsigned_abs()).ok()?;
    if exponent >= 0 {
        let factor = 10i128.checked_pow(magnitude)?;
        Decimal::try_from_i128_with_scale(factor, 0).ok()
    } else if magnitude <= MAX_SCALE {
        Some(Decimal::new(1, magnitude))
    } else {
        None
    }
}

fn coerce_date(text: &str) -> Result<NaiveDate, CoercionError> {
    // Exactly YYYY-MM-DD: chrono alone would accept unpadded fields.
    let well_formed = text.len() == 10
        && text.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(CoercionError::InvalidDate(text.to_string()));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| CoercionError::InvalidDate(text.to_string()))
}

fn coerce_bool(text: &str) -> Result<bool, CoercionError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(CoercionError::InvalidBoolean(text.to_string())),
    }
}

/// Central Index Keys are rendered as exactly ten digits.
pub fn normalize_cik(raw: &str) -> Result<String, CoercionError> {
    let digits = raw.trim();
    if digits.is_empty() || digits.len() > 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoercionError::InvalidIdentifier(raw.trim().to_string()));
    }
    Ok(format!("{:0>10}", digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MalformedAttribute;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn attrs(decimals: Option<&str>) -> FactAttributes {
        FactAttributes {
            decimals: decimals.and_then(Decimals::parse),
            ..FactAttributes::default()
        }
    }

    fn number(raw: &str, attributes: FactAttributes) -> Decimal {
        coerce(raw, &attributes, ValueKind::Monetary)
            .unwrap()
            .as_decimal()
            .unwrap()
    }

    #[test]
    fn test_negative_decimals_scale_value() {
        assert_eq!(number("1234", attrs(Some("-6"))), dec("1234000000"));
        assert_eq!(number("5", attrs(Some("-3"))), dec("5000"));
    }

    #[test]
    fn test_non_negative_decimals_do_not_scale() {
        assert_eq!(number("41733000000", attrs(Some("0"))), dec("41733000000"));
        assert_eq!(number("6.38", attrs(Some("2"))), dec("6.38"));
        assert_eq!(number("17", attrs(Some("INF"))), dec("17"));
        assert_eq!(number("17", attrs(None)), dec("17"));
    }

    #[test]
    fn test_sign_attribute_negates() {
        let negated = FactAttributes {
            negated: true,
            ..FactAttributes::default()
        };
        assert_eq!(number("500", negated), dec("-500"));
        assert_eq!(number("-500", negated), dec("500"));
    }

    #[test]
    fn test_parentheses_are_negative() {
        assert_eq!(number("(1,250)", attrs(None)), dec("-1250"));
        let negated = FactAttributes {
            negated: true,
            ..FactAttributes::default()
        };
        assert_eq!(number("(1,250)", negated), dec("1250"));
    }

    #[test]
    fn test_scale_takes_precedence_over_decimals() {
        let scaled = FactAttributes {
            decimals: Some(Decimals::Finite(-6)),
            scale: Some(3),
            ..FactAttributes::default()
        };
        assert_eq!(magnitude_exponent(&scaled), 3);
        assert_eq!(number("12", scaled), dec("12000"));

        let percent = FactAttributes {
            scale: Some(-2),
            ..FactAttributes::default()
        };
        assert_eq!(number("35", percent), dec("0.35"));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(number("1.5e3", attrs(None)), dec("1500"));
    }

    #[test]
    fn test_invalid_numbers() {
        let a = attrs(Some("0"));
        assert_eq!(
            coerce("12x4", &a, ValueKind::Monetary),
            Err(CoercionError::InvalidNumber("12x4".into()))
        );
        assert_eq!(coerce("  ", &a, ValueKind::Shares), Err(CoercionError::EmptyValue));
        assert_eq!(
            coerce("()", &a, ValueKind::PerShare),
            Err(CoercionError::InvalidNumber("()".into()))
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = FactAttributes {
            scale: Some(40),
            ..FactAttributes::default()
        };
        assert!(matches!(
            coerce("1", &huge, ValueKind::Monetary),
            Err(CoercionError::Overflow { exponent: 40, .. })
        ));
    }

    #[test]
    fn test_most_negative_decimals_overflows() {
        let extreme = attrs(Some("-2147483648"));
        assert_eq!(extreme.decimals, Some(Decimals::Finite(i32::MIN)));
        assert_eq!(magnitude_exponent(&extreme), 2147483648);
        assert_eq!(
            coerce("1234", &extreme, ValueKind::Monetary),
            Err(CoercionError::Overflow {
                raw: "1234".into(),
                exponent: 2147483648,
            })
        );

        let tiny = FactAttributes {
            scale: Some(i32::MIN),
            ..FactAttributes::default()
        };
        assert!(matches!(
            coerce("1", &tiny, ValueKind::Monetary),
            Err(CoercionError::Overflow { .. })
        ));
    }

    #[test]
    fn test_unreadable_magnitude_attribute_is_rejected() {
        let malformed = FactAttributes {
            malformed: Some(MalformedAttribute {
                name: "decimals",
                value: "-6x",
            }),
            ..FactAttributes::default()
        };
        let err = coerce("1234", &malformed, ValueKind::Monetary).unwrap_err();
        assert_eq!(
            err,
            CoercionError::InvalidAttribute {
                name: "decimals",
                raw: "-6x".into(),
            }
        );
        assert_eq!(err.to_string(), "invalid decimals attribute '-6x'");
        assert_eq!(err.raw(), "-6x");

        // Only numbers are scaled.
        assert_eq!(
            coerce("10-Q", &malformed, ValueKind::String),
            Ok(Value::Text("10-Q".into()))
        );
    }

    #[test]
    fn test_dates() {
        let a = FactAttributes::default();
        assert_eq!(
            coerce(" 2012-12-29 ", &a, ValueKind::Date),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2012, 12, 29).unwrap()))
        );
        for bad in ["12/29/2012", "2012-2-9", "20121229", "2012-13-01", "Dec 29, 2012"] {
            assert!(
                matches!(coerce(bad, &a, ValueKind::Date), Err(CoercionError::InvalidDate(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_booleans_and_strings() {
        let a = FactAttributes::default();
        assert_eq!(coerce("true", &a, ValueKind::Boolean), Ok(Value::Boolean(true)));
        assert_eq!(coerce(" FALSE ", &a, ValueKind::Boolean), Ok(Value::Boolean(false)));
        assert!(matches!(
            coerce("yes", &a, ValueKind::Boolean),
            Err(CoercionError::InvalidBoolean(_))
        ));
        assert_eq!(
            coerce("  Apple Inc.\n", &a, ValueKind::String),
            Ok(Value::Text("Apple Inc.".into()))
        );
    }

    #[test]
    fn test_normalize_cik() {
        assert_eq!(normalize_cik("320193").unwrap(), "0000320193");
        assert_eq!(normalize_cik(" 0000320193 ").unwrap(), "0000320193");
        assert!(normalize_cik("CIK320193").is_err());
        assert!(normalize_cik("12345678901").is_err());
        assert!(normalize_cik("").is_err());
    }
}
