//! Value normalization shared by both translation targets.
//!
//! Leaf values arrive typed (string/number/date/enum, per the schema) and each
//! output side needs a slightly different translation-safe form: the structured
//! query keeps dates native and stringifies enums, while the FIQL output needs
//! everything rendered back into grammar-compatible text.

use crate::ast::Literal;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

/// Accepted date literal shapes when no custom parse format is configured.
/// Most granular first, so sub-second timestamps never lose precision.
const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Millisecond precision for serialized dates. The backend does its own
/// coercion, we just have to hand it everything the parser saw.
const JSON_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// A normalized leaf value bound for the structured query output.
///
/// Enums have already been collapsed to their variant name here; dates pass
/// through natively and are only rendered at serialization time.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Date(NaiveDateTime),
}

impl QueryValue {
    /// Renders the value as a JSON scalar for the search backend.
    pub fn to_json(&self) -> JsonValue {
        match self {
            QueryValue::Str(s) => JsonValue::String(s.clone()),
            QueryValue::Int(n) => JsonValue::from(*n),
            QueryValue::Date(dt) => JsonValue::String(dt.format(JSON_DATE_FORMAT).to_string()),
        }
    }

    /// The string form of the value, used for wildcard detection.
    pub fn as_text(&self) -> String {
        match self {
            QueryValue::Str(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::Date(dt) => dt.format(JSON_DATE_FORMAT).to_string(),
        }
    }
}

/// Normalizes a literal for the structured query side.
///
/// Enum values become their variant name - the search backend no longer
/// stringifies enum handles on its own, so we must never leak an ordinal.
/// Everything else passes through unchanged.
pub fn enum_safe(value: &Literal) -> QueryValue {
    match value {
        Literal::String(s) => QueryValue::Str(s.clone()),
        Literal::Number(n) => QueryValue::Int(*n),
        Literal::Date(dt) => QueryValue::Date(*dt),
        Literal::Enum(name) => QueryValue::Str(name.clone()),
    }
}

/// Normalizes a literal for the FIQL string side.
///
/// Dates are rendered with the configured strftime pattern. The caller must
/// have validated the pattern via [`validate_date_format`]; a coarser pattern
/// than the parse side silently truncates precision, which is a documented
/// lossy default rather than an error.
pub fn fiql_string(value: &Literal, date_format: &str) -> String {
    match value {
        Literal::String(s) => s.clone(),
        Literal::Number(n) => n.to_string(),
        Literal::Date(dt) => dt.format(date_format).to_string(),
        Literal::Enum(name) => name.clone(),
    }
}

/// Checks that a strftime pattern is well formed and renderable against a
/// naive date/time. Timezone specifiers are rejected because the condition
/// tree carries no offset to render them from.
pub fn validate_date_format(pattern: &str) -> bool {
    if pattern.contains("%z") || pattern.contains("%:z") || pattern.contains("%Z") {
        return false;
    }
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Parses a raw date literal, trying the custom parse format first when one
/// is configured. Offset-bearing formats are accepted on input; the wall-clock
/// fields are kept so a rewrite round-trip reproduces what the filter said.
pub fn parse_date(raw: &str, custom_format: Option<&str>) -> Option<NaiveDateTime> {
    if let Some(fmt) = custom_format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
        return None;
    }

    for fmt in DATE_INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    fn date(s: &str) -> NaiveDateTime {
        parse_date(s, None).unwrap()
    }

    #[test]
    fn test_plain_date_parses_to_midnight() {
        let dt = date("2017-07-04");
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2017-07-04 00:00:00");
    }

    #[test]
    fn test_timestamp_keeps_seconds_and_millis() {
        let dt = date("2017-07-04T07:07:07.235");
        assert_eq!(dt.format("%H:%M:%S%.3f").to_string(), "07:07:07.235");
    }

    #[test]
    fn test_custom_format_with_offset_keeps_wall_clock() {
        let dt = parse_date("2017-07-04T07:07:07.235-0700", Some("%Y-%m-%dT%H:%M:%S%.3f%z")).unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(), "2017-07-04T07:07:07.235");
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        assert!(parse_date("1490334452", None).is_none());
        assert!(parse_date("not-a-date", None).is_none());
    }

    #[test]
    fn test_enum_safe_uses_variant_name() {
        let normalized = enum_safe(&Literal::Enum("AVAILABLE".to_string()));
        assert_eq!(normalized, QueryValue::Str("AVAILABLE".to_string()));
    }

    #[test]
    fn test_fiql_string_formats_dates() {
        let lit = Literal::Date(date("2017-07-04"));
        assert_eq!(fiql_string(&lit, "%Y-%m-%dT%H:%M:%S"), "2017-07-04T00:00:00");
        assert_eq!(fiql_string(&lit, "%m/%d/%Y"), "07/04/2017");
    }

    #[test]
    fn test_date_format_validation() {
        assert!(validate_date_format("%Y-%m-%dT%H:%M:%S"));
        assert!(validate_date_format("%m_%d_%Y"));
        assert!(!validate_date_format("%Q"));
        assert!(!validate_date_format("%Y-%m-%dT%H:%M:%S%z"));
    }

    #[test]
    fn test_query_value_json_shapes() {
        assert_eq!(QueryValue::Str("x".into()).to_json(), serde_json::json!("x"));
        assert_eq!(QueryValue::Int(42).to_json(), serde_json::json!(42));
        assert_eq!(
            QueryValue::Date(date("2010-03-11")).to_json(),
            serde_json::json!("2010-03-11T00:00:00.000")
        );
    }
}
