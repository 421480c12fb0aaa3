//! SmartTable Value Model
//!
//! Records arrive loosely typed: the same field may hold strings in one row
//! and numbers in the next. A `Value` is the tagged union every engine stage
//! works on, and a `Record` keeps its fields in the order they were supplied,
//! because field order drives column order.
//!
//! # Examples
//!
//! ```
//! use smarttable::{records_from_json_value, Value};
//! use serde_json::json;
//!
//! let records = records_from_json_value(json!([
//!     { "id": 1, "name": "Alice", "tags": ["a", "b"] },
//! ])).unwrap();
//!
//! assert_eq!(records[0].get("name").and_then(Value::as_str), Some("Alice"));
//! assert!(records[0].get("tags").unwrap().as_list().is_some());
//! ```

use crate::error::{Result, TableError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

/// An ordered mapping of field name to value.
pub type Record = IndexMap<String, Value>;

/// A single loosely-typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    Object(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `Int` and `Float`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// True for integers and for floats without a fractional part.
    pub fn is_integer(&self) -> bool {
        match self {
            Value::Int(_) => true,
            Value::Float(f) => f.is_finite() && f.fract() == 0.0,
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Interprets the value as a point in time.
    ///
    /// Native dates are returned as-is, strings are parsed as ISO-8601 and
    /// numbers are taken as milliseconds since the Unix epoch.
    pub fn to_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => parse_date(s),
            Value::Int(ms) => DateTime::from_timestamp_millis(*ms),
            Value::Float(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
            _ => None,
        }
    }

    /// The string form of a primitive (`String(value)` in a browser host).
    ///
    /// Returns `None` for nulls, dates, lists and objects.
    pub fn primitive_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Float(f) => Some(format_number(*f)),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Truthiness as a JavaScript host would see it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::List(_) | Value::Object(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Compact JSON text of this value.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Formats a float the way a browser prints numbers: integral values carry
/// no fractional part and negative zero prints as `0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Parses an ISO-8601 date or date-time string.
///
/// Accepts `YYYY-MM`, `YYYY-MM-DD`, and date-times separated by `T` or a
/// space, with or without fractional seconds and offset. Strings without an
/// offset are read as UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    let bytes = s.as_bytes();
    // Require a `YYYY-` prefix so plain numbers and codes never parse.
    if bytes.len() < 7 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    if s.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }
    None
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            // Integral floats serialize as integers, `{x: 1}` stays `{"x":1}`.
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*f as i64)
            }
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&to_iso_string(d)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(record) => {
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (k, v) in record {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}

/// Converts a JSON array of objects into records, keeping key order.
pub fn records_from_json_value(json: JsonValue) -> Result<Vec<Record>> {
    let items = match json {
        JsonValue::Array(items) => items,
        _ => return Err(TableError::InvalidRecord(0)),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match Value::from(item) {
            Value::Object(record) => Ok(record),
            _ => Err(TableError::InvalidRecord(index)),
        })
        .collect()
}

/// Parses JSON text holding an array of objects into records.
pub fn records_from_json(text: &str) -> Result<Vec<Record>> {
    let json: JsonValue = serde_json::from_str(text)?;
    records_from_json_value(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_key_order() {
        let records = records_from_json_value(json!([
            { "zeta": 1, "alpha": "a", "mid": null }
        ]))
        .unwrap();

        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(records[0].get("zeta"), Some(&Value::Int(1)));
        assert!(records[0].get("mid").unwrap().is_null());
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let err = records_from_json_value(json!([{ "id": 1 }, 5])).unwrap_err();
        assert!(matches!(err, TableError::InvalidRecord(1)));

        assert!(records_from_json("not json").is_err());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(Value::Float(3.0).primitive_string().as_deref(), Some("3"));
        assert_eq!(Value::Bool(true).primitive_string().as_deref(), Some("true"));
        assert_eq!(Value::Null.primitive_string(), None);
    }

    #[test]
    fn test_integer_detection() {
        assert!(Value::Int(2024).is_integer());
        assert!(Value::Float(2024.0).is_integer());
        assert!(!Value::Float(2024.5).is_integer());
        assert!(!Value::String("2024".into()).is_integer());
    }

    #[test]
    fn test_parse_date_formats() {
        let d = parse_date("2024-03-15").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 15));

        let d = parse_date("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-15T10:30:00+00:00");

        let d = parse_date("2024-03-15T23:30:00-02:00").unwrap();
        assert_eq!(d.day(), 16);

        assert!(parse_date("2024-03-15 08:00:00").is_some());
        assert!(parse_date("2024-03").is_some());

        assert!(parse_date("hello").is_none());
        assert!(parse_date("2024").is_none());
        assert!(parse_date("12345678").is_none());
        assert!(parse_date("2024-13-45").is_none());
    }

    #[test]
    fn test_to_date_from_millis() {
        let d = Value::Int(0).to_date().unwrap();
        assert_eq!(d.year(), 1970);
        assert!(Value::Bool(true).to_date().is_none());
    }

    #[test]
    fn test_serialize_preserves_order_and_integral_floats() {
        let value = Value::from(json!({ "x": 1, "b": [1.0, 2.5], "a": null }));
        assert_eq!(value.to_json_string().unwrap(), r#"{"x":1,"b":[1,2.5],"a":null}"#);

        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(
            Value::Date(date).to_json_string().unwrap(),
            "\"2024-01-15T00:00:00.000Z\""
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }
}
