//! Preview strings.
//!
//! A preview is the short human-readable form of any value. Schema inference
//! uses it to decide whether a field is categorical, and every filter
//! comparison goes through it as well, so a filter value taken from an
//! option list always matches the rows that produced that option.

use crate::config::{TableConfig, DEFAULT_DATE_FORMAT};
use crate::value::Value;
use chrono::{DateTime, Utc};

/// Keys consulted, in order, to label an object value.
pub const LABEL_KEYS: [&str; 5] = ["name", "title", "label", "code", "id"];

/// Produces preview strings.
///
/// # Examples
///
/// ```
/// use smarttable::{PreviewFormatter, Value};
/// use serde_json::json;
///
/// let fmt = PreviewFormatter::default();
/// assert_eq!(fmt.preview(&Value::Null), "");
/// assert_eq!(fmt.preview(&Value::from(json!(["red", 2]))), "red, 2");
/// assert_eq!(fmt.preview(&Value::from(json!({ "id": 7, "name": "Ops" }))), "Ops");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFormatter {
    date_format: String,
    max_len: usize,
}

impl Default for PreviewFormatter {
    fn default() -> Self {
        PreviewFormatter {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_len: 40,
        }
    }
}

impl PreviewFormatter {
    pub fn new(date_format: impl Into<String>, max_len: usize) -> Self {
        PreviewFormatter {
            date_format: date_format.into(),
            max_len: max_len.max(4),
        }
    }

    pub fn from_config(config: &TableConfig) -> Self {
        Self::new(config.date_format.clone(), config.preview_max_len)
    }

    pub fn preview(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
                value.primitive_string().unwrap_or_default()
            }
            Value::Date(d) => self.format_date(d),
            Value::List(items) => items
                .iter()
                .map(|item| self.preview(item))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(record) => {
                for key in LABEL_KEYS {
                    if let Some(v) = record.get(key).filter(|v| v.is_truthy()) {
                        return self.preview(v);
                    }
                }
                let json = value.to_json_string().unwrap_or_else(|_| "Object".to_string());
                self.truncate(json)
            }
        }
    }

    /// Locale date string for a point in time.
    pub fn format_date(&self, date: &DateTime<Utc>) -> String {
        date.format(&self.date_format).to_string()
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() > self.max_len {
            let mut short: String = text.chars().take(self.max_len - 3).collect();
            short.push('…');
            short
        } else {
            text
        }
    }

    /// Trimmed, lower-cased preview used for equality checks.
    pub fn normalized(&self, value: &Value) -> String {
        normalize_label(&self.preview(value))
    }

    /// True when the cell previews to the same text as `filter`,
    /// ignoring case and surrounding whitespace.
    pub fn matches(&self, cell: &Value, filter: &str) -> bool {
        if let Value::String(s) = cell {
            if s == filter {
                return true;
            }
        }
        self.normalized(cell) == normalize_label(filter)
    }
}

/// Preview with the default formatter.
pub fn preview(value: &Value) -> String {
    PreviewFormatter::default().preview(value)
}

pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}
