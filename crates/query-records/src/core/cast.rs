//! Value casting: explicit casters plus the heuristic sniffing pipeline.
//!
//! Heuristic classification of a textual value is tried in this order, and
//! the first match wins:
//!
//! 1. `YYYY-MM-DD[ HH:MM:SS]` → timestamp
//! 2. all digits → integer
//! 3. `digits.digits` (leading digits optional) → float
//! 4. `true` / `false`, any case → boolean
//! 5. wrapped in `{…}` → PG array, unless it looks like a JSON/hstore object,
//!    in which case JSON is attempted
//! 6. starts with `[` or `{` → JSON
//! 7. anything else → the text unchanged
//!
//! The pipeline is total: a value that matches a pattern but cannot actually
//! be parsed falls back to its text.
//!
//! The object markers in step 5 are `"=>`, `":` and `: `. The `":` marker lets
//! compact JSON such as `{"role":"admin"}` through, at the cost of quoted PG
//! arrays whose element starts with a colon: `{"a",":b"}` is tried as JSON,
//! fails, and stays text. Use an explicit array caster for such columns.

use std::{fmt, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::core::types::{CastValue, RawValue, TIMESTAMP_FORMAT};

static DATETIME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}( [0-9]{2}:[0-9]{2}:[0-9]{2})?$").ok());

static INTEGER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").ok());

static DECIMAL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]*\.[0-9]+$").ok());

static BOOLEAN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(true|false)$").ok());

// Markers of a JSON or hstore object inside braces.
const OBJECT_MARKERS: [&str; 3] = ["\"=>", "\":", ": "];

#[derive(Debug, Error)]
pub enum CastError {
    #[error("invalid boolean value: {0}")]
    InvalidBoolean(String),

    #[error("invalid JSON value: {value}: {source}")]
    InvalidJson {
        value: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid array value: {0}")]
    InvalidArray(String),
}

impl CastError {
    /// The offending raw value, rendered as text.
    pub fn value(&self) -> &str {
        match self {
            CastError::InvalidBoolean(v) | CastError::InvalidArray(v) => v,
            CastError::InvalidJson { value, .. } => value,
        }
    }
}

/// A caster object: one cast operation from a raw value to a typed value.
pub trait Caster: Send + Sync + fmt::Debug {
    fn cast(&self, raw: &RawValue) -> Result<CastValue, CastError>;
}

fn matches(pattern: &LazyLock<Option<Regex>>, s: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(s))
}

fn render(raw: &RawValue) -> String {
    match raw {
        RawValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Infers a typed value from a raw one. Never fails.
pub fn cast_heuristic(raw: &RawValue) -> CastValue {
    match raw {
        RawValue::String(s) => classify_text(s),
        other => CastValue::from(other.clone()),
    }
}

fn classify_text(s: &str) -> CastValue {
    if matches(&DATETIME_PATTERN, s) {
        return match parse_timestamp(s) {
            Some(ts) => CastValue::Timestamp(ts),
            None => {
                tracing::debug!(value = s, "date-shaped value is not a valid date; keeping text");
                CastValue::Text(s.to_string())
            }
        };
    }
    if matches(&INTEGER_PATTERN, s) {
        return s
            .parse::<i64>()
            .map(CastValue::Int)
            .unwrap_or_else(|_| CastValue::Text(s.to_string()));
    }
    if matches(&DECIMAL_PATTERN, s) {
        return s
            .parse::<f64>()
            .map(CastValue::Float)
            .unwrap_or_else(|_| CastValue::Text(s.to_string()));
    }
    if matches(&BOOLEAN_PATTERN, s) {
        return CastValue::Bool(s.eq_ignore_ascii_case("true"));
    }
    if s.len() >= 2 && s.starts_with('{') && s.ends_with('}') {
        if is_pg_array(s) {
            return CastValue::Array(parse_pg_array(s));
        }
        return json_or_text(s);
    }
    if s.starts_with('[') || s.starts_with('{') {
        return json_or_text(s);
    }
    CastValue::Text(s.to_string())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Whether a brace-wrapped value should be read as a PG array literal.
pub fn is_pg_array(s: &str) -> bool {
    s.starts_with('{') && s.ends_with('}') && !OBJECT_MARKERS.iter().any(|m| s.contains(m))
}

fn json_or_text(s: &str) -> CastValue {
    match serde_json::from_str::<RawValue>(s) {
        Ok(parsed) => CastValue::from(parsed),
        Err(e) => {
            tracing::debug!(error = %e, "JSON-shaped value failed to parse; keeping text");
            CastValue::Text(s.to_string())
        }
    }
}

/// Parses a PG array literal such as `{1,2,"a,b"}`.
///
/// A comma separates elements only when an even number of `"` follow it.
/// Trailing empty elements are dropped.
pub fn parse_pg_array(value: &str) -> Vec<CastValue> {
    let inner = value.strip_prefix('{').unwrap_or(value);
    let inner = inner.strip_suffix('}').unwrap_or(inner);
    if inner.is_empty() {
        return Vec::new();
    }

    let total_quotes = inner.matches('"').count();
    let mut seen_quotes = 0;
    let mut elements = Vec::new();
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '"' => seen_quotes += 1,
            ',' if (total_quotes - seen_quotes) % 2 == 0 => {
                elements.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    elements.push(&inner[start..]);

    while elements.last().is_some_and(|e| e.is_empty()) {
        elements.pop();
    }

    elements.into_iter().map(cast_array_element).collect()
}

fn cast_array_element(element: &str) -> CastValue {
    if matches(&INTEGER_PATTERN, element) {
        if let Ok(i) = element.parse::<i64>() {
            return CastValue::Int(i);
        }
    } else if matches(&DECIMAL_PATTERN, element) {
        if let Ok(f) = element.parse::<f64>() {
            return CastValue::Float(f);
        }
    } else if matches(&BOOLEAN_PATTERN, element) {
        return CastValue::Bool(element.eq_ignore_ascii_case("true"));
    } else if element.len() >= 2 && element.starts_with('"') && element.ends_with('"') {
        return CastValue::Text(element[1..element.len() - 1].to_string());
    }
    CastValue::Text(element.to_string())
}

/// Strict boolean caster. Accepts `true/TRUE/t/T/1` and `false/FALSE/f/F/0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCaster;

const TRUTHY: [&str; 5] = ["true", "TRUE", "t", "T", "1"];
const FALSEY: [&str; 5] = ["false", "FALSE", "f", "F", "0"];

impl Caster for BooleanCaster {
    fn cast(&self, raw: &RawValue) -> Result<CastValue, CastError> {
        match raw {
            RawValue::Null => Ok(CastValue::Null),
            RawValue::Bool(b) => Ok(CastValue::Bool(*b)),
            RawValue::Number(n) if n.as_i64() == Some(1) => Ok(CastValue::Bool(true)),
            RawValue::Number(n) if n.as_i64() == Some(0) => Ok(CastValue::Bool(false)),
            RawValue::String(s) if TRUTHY.contains(&s.as_str()) => Ok(CastValue::Bool(true)),
            RawValue::String(s) if FALSEY.contains(&s.as_str()) => Ok(CastValue::Bool(false)),
            other => Err(CastError::InvalidBoolean(render(other))),
        }
    }
}

/// PG array caster.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgArrayCaster;

impl Caster for PgArrayCaster {
    fn cast(&self, raw: &RawValue) -> Result<CastValue, CastError> {
        match raw {
            RawValue::Null => Ok(CastValue::Null),
            RawValue::Array(_) => Ok(CastValue::from(raw.clone())),
            RawValue::String(s) => Ok(CastValue::Array(parse_pg_array(s))),
            other => Err(CastError::InvalidArray(render(other))),
        }
    }
}

/// JSON / JSONB caster. Structured input is passed through; text must parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCaster;

impl Caster for JsonCaster {
    fn cast(&self, raw: &RawValue) -> Result<CastValue, CastError> {
        match raw {
            RawValue::Null => Ok(CastValue::Null),
            RawValue::Object(_) | RawValue::Array(_) => Ok(CastValue::from(raw.clone())),
            other => {
                let text = render(other);
                serde_json::from_str::<RawValue>(&text)
                    .map(CastValue::from)
                    .map_err(|source| CastError::InvalidJson {
                        value: text,
                        source,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> CastValue {
        CastValue::Text(s.to_string())
    }

    fn heuristic(s: &str) -> CastValue {
        cast_heuristic(&json!(s))
    }

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(cast_heuristic(&json!(true)), CastValue::Bool(true));
        assert_eq!(cast_heuristic(&json!(42)), CastValue::Int(42));
        assert_eq!(cast_heuristic(&json!(2.5)), CastValue::Float(2.5));
        assert_eq!(cast_heuristic(&RawValue::Null), CastValue::Null);
    }

    #[test]
    fn test_timestamp_detection() {
        let v = heuristic("2024-01-01 10:00:00");
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "2024-01-01 10:00:00");

        let d = heuristic("2024-03-05");
        assert_eq!(
            d.as_timestamp().unwrap().format(TIMESTAMP_FORMAT).to_string(),
            "2024-03-05 00:00:00"
        );
    }

    #[test]
    fn test_invalid_date_keeps_text() {
        assert_eq!(heuristic("2024-13-45"), text("2024-13-45"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(heuristic("42"), CastValue::Int(42));
        assert_eq!(heuristic("3.25"), CastValue::Float(3.25));
        assert_eq!(heuristic(".5"), CastValue::Float(0.5));
        assert_eq!(heuristic("-7"), text("-7"));
        assert_eq!(heuristic("1e5"), text("1e5"));
    }

    #[test]
    fn test_integer_overflow_keeps_text() {
        let big = "99999999999999999999999";
        assert_eq!(heuristic(big), text(big));
    }

    #[test]
    fn test_booleans_any_case() {
        assert_eq!(heuristic("true"), CastValue::Bool(true));
        assert_eq!(heuristic("FALSE"), CastValue::Bool(false));
        assert_eq!(heuristic("True"), CastValue::Bool(true));
        assert_eq!(heuristic("yes"), text("yes"));
    }

    #[test]
    fn test_pg_arrays() {
        assert_eq!(
            heuristic("{1,2,3}"),
            CastValue::Array(vec![1.into(), 2.into(), 3.into()])
        );
        assert_eq!(
            heuristic("{1.5,2.5}"),
            CastValue::Array(vec![1.5.into(), 2.5.into()])
        );
        assert_eq!(
            heuristic(r#"{foo,bar,"baz,qux"}"#),
            CastValue::Array(vec!["foo".into(), "bar".into(), "baz,qux".into()])
        );
        assert_eq!(heuristic("{}"), CastValue::Array(vec![]));
        assert_eq!(
            heuristic("{true,false,true}"),
            CastValue::Array(vec![true.into(), false.into(), true.into()])
        );
    }

    #[test]
    fn test_pg_array_keeps_duplicates_and_drops_trailing_empty() {
        assert_eq!(
            parse_pg_array("{a,a,}"),
            vec![CastValue::from("a"), CastValue::from("a")]
        );
        assert_eq!(parse_pg_array("{,}"), Vec::<CastValue>::new());
    }

    #[test]
    fn test_json_object_is_not_an_array() {
        let compact = heuristic(r#"{"role":"admin"}"#);
        assert_eq!(compact.get("role"), Some(&CastValue::from("admin")));

        let spaced = heuristic(r#"{"role": "admin", "preferences": {"theme": "dark"}}"#);
        assert_eq!(
            spaced.get("preferences").and_then(|p| p.get("theme")),
            Some(&CastValue::from("dark"))
        );
    }

    #[test]
    fn test_quoted_colon_element_is_not_an_array() {
        let raw = r#"{"a",":b"}"#;
        assert_eq!(heuristic(raw), text(raw));
        assert_eq!(
            PgArrayCaster.cast(&json!(raw)).unwrap(),
            CastValue::Array(vec!["a".into(), ":b".into()])
        );
    }

    #[test]
    fn test_json_array() {
        assert_eq!(
            heuristic(r#"["ruby", "rails"]"#),
            CastValue::Array(vec!["ruby".into(), "rails".into()])
        );
    }

    #[test]
    fn test_malformed_json_keeps_text() {
        assert_eq!(heuristic(r#"{"role": oops}"#), text(r#"{"role": oops}"#));
        assert_eq!(heuristic("[1, 2"), text("[1, 2"));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(heuristic("Test User"), text("Test User"));
        assert_eq!(heuristic(""), text(""));
    }

    #[test]
    fn test_boolean_caster_tokens() {
        let c = BooleanCaster;
        for t in ["true", "TRUE", "t", "T", "1"] {
            assert_eq!(c.cast(&json!(t)).unwrap(), CastValue::Bool(true));
        }
        for f in ["false", "FALSE", "f", "F", "0"] {
            assert_eq!(c.cast(&json!(f)).unwrap(), CastValue::Bool(false));
        }
        assert_eq!(c.cast(&json!(true)).unwrap(), CastValue::Bool(true));
        assert_eq!(c.cast(&json!(0)).unwrap(), CastValue::Bool(false));
        assert_eq!(c.cast(&RawValue::Null).unwrap(), CastValue::Null);
    }

    #[test]
    fn test_boolean_caster_rejects_unknown_token() {
        let err = BooleanCaster.cast(&json!("yes")).unwrap_err();
        assert!(matches!(err, CastError::InvalidBoolean(_)));
        assert_eq!(err.value(), "yes");
        assert!(err.to_string().contains("yes"));
    }

    #[test]
    fn test_json_caster() {
        let v = JsonCaster.cast(&json!(r#"{"a": {"b": 1}}"#)).unwrap();
        assert_eq!(v.get("a").and_then(|a| a.get("b")), Some(&CastValue::Int(1)));

        let passthrough = JsonCaster.cast(&json!({"k": "v"})).unwrap();
        assert_eq!(passthrough.get("k"), Some(&CastValue::from("v")));

        let err = JsonCaster.cast(&json!("not json")).unwrap_err();
        assert!(matches!(err, CastError::InvalidJson { .. }));
    }

    #[test]
    fn test_pg_array_caster() {
        let v = PgArrayCaster.cast(&json!("{1,x}")).unwrap();
        assert_eq!(v, CastValue::Array(vec![1.into(), "x".into()]));
        assert!(PgArrayCaster.cast(&json!(12)).is_err());
    }
}
