//! SmartTable Schema Inference
//!
//! Classifies every field of a record set into a filter kind and, for
//! categorical fields, builds the option list a filter menu offers.
//! Inference is a pure function of the records, the overrides and the
//! configured thresholds; the engine memoizes its output per data snapshot.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::preview::{normalize_label, PreviewFormatter};
use crate::value::{Record, Value};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Label used for an option whose preview is empty.
pub const EMPTY_OPTION_LABEL: &str = "—";

/// How a field is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Search,
    Select,
    Number,
    Year,
    Date,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Search,
        FieldKind::Select,
        FieldKind::Number,
        FieldKind::Year,
        FieldKind::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Search => "search",
            FieldKind::Select => "select",
            FieldKind::Number => "number",
            FieldKind::Year => "year",
            FieldKind::Date => "date",
        }
    }

    /// Kinds that carry an option list.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Year)
    }

    /// Parses a kind named in an override for `field`.
    pub fn parse_for(field: &str, kind: &str) -> Result<Self> {
        kind.parse().map_err(|_| TableError::unknown_kind(field, kind))
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FieldKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown filter kind '{}'", s))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a date filter picks one day or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    Single,
    #[default]
    Range,
}

/// One entry of a categorical filter menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub label: String,
    pub value: Value,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterOption {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// The inferred filtering semantics of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FilterOption>>,
    #[serde(default, rename = "dateMode", skip_serializing_if = "Option::is_none")]
    pub date_mode: Option<DateMode>,
}

/// A host-supplied correction to inference for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    #[serde(rename = "type", alias = "kind")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FilterOption>>,
    #[serde(default, rename = "dateMode", alias = "date_mode", skip_serializing_if = "Option::is_none")]
    pub date_mode: Option<DateMode>,
    /// Use `options` as-is instead of merging them with the inferred ones.
    #[serde(default, alias = "replaceOptions")]
    pub replace_options: bool,
}

impl FieldOverride {
    pub fn new(kind: FieldKind) -> Self {
        FieldOverride {
            kind,
            options: None,
            date_mode: None,
            replace_options: false,
        }
    }

    pub fn with_options(mut self, options: Vec<FilterOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_date_mode(mut self, mode: DateMode) -> Self {
        self.date_mode = Some(mode);
        self
    }

    pub fn replacing_options(mut self) -> Self {
        self.replace_options = true;
        self
    }

    /// Checks the override is internally consistent.
    pub fn validate(&self, field: &str) -> Result<()> {
        if self.date_mode.is_some() && self.kind != FieldKind::Date {
            return Err(TableError::invalid_override(
                field,
                format!("dateMode requires type 'date', got '{}'", self.kind),
            ));
        }
        Ok(())
    }
}

/// Overrides keyed by field name.
pub type FieldOverrides = IndexMap<String, FieldOverride>;

/// Parses an overrides document such as
/// `{"status": {"type": "select", "options": [...]}}`.
///
/// Unknown kinds are reported with the offending field name.
pub fn parse_overrides(text: &str) -> Result<FieldOverrides> {
    let raw: IndexMap<String, JsonValue> = serde_json::from_str(text)?;
    let mut overrides = FieldOverrides::new();

    for (field, mut body) in raw {
        let kind = body
            .get("type")
            .or_else(|| body.get("kind"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| TableError::invalid_override(&field, "missing 'type'"))?;
        FieldKind::parse_for(&field, &kind).inspect_err(|e| warn!("{}", e))?;

        if let Some(obj) = body.as_object_mut() {
            obj.remove("kind");
            obj.insert("type".to_string(), JsonValue::String(kind));
        }
        let parsed: FieldOverride = serde_json::from_value(body)?;
        parsed.validate(&field).inspect_err(|e| warn!("{}", e))?;
        overrides.insert(field, parsed);
    }

    Ok(overrides)
}

/// Title-cases a field key: underscores become spaces and the first letter
/// of every word is upper-cased.
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Infers field descriptors from records.
///
/// # Examples
///
/// ```
/// use smarttable::{records_from_json_value, FieldKind, FieldOverrides, SchemaInferencer};
/// use serde_json::json;
///
/// let records = records_from_json_value(json!([
///     { "id": 1, "year": 1999, "status": "open" },
///     { "id": 2, "year": 2021, "status": "closed" },
/// ])).unwrap();
///
/// let schema = SchemaInferencer::default()
///     .with_current_year(2024)
///     .infer(&records, &FieldOverrides::new())
///     .unwrap();
///
/// assert_eq!(schema[1].kind, FieldKind::Year);
/// assert_eq!(schema[2].kind, FieldKind::Select);
/// assert_eq!(schema[2].options.as_ref().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaInferencer {
    formatter: PreviewFormatter,
    current_year: i32,
    max_options: usize,
    max_label_len: usize,
}

impl Default for SchemaInferencer {
    fn default() -> Self {
        Self::new(&TableConfig::default())
    }
}

impl SchemaInferencer {
    pub fn new(config: &TableConfig) -> Self {
        SchemaInferencer {
            formatter: PreviewFormatter::from_config(config),
            current_year: config.current_year(),
            max_options: config.select_max_options,
            max_label_len: config.select_max_label_len,
        }
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn formatter(&self) -> &PreviewFormatter {
        &self.formatter
    }

    /// Builds one descriptor per key of the first record, in key order.
    pub fn infer(&self, records: &[Record], overrides: &FieldOverrides) -> Result<Vec<FieldDescriptor>> {
        for (field, o) in overrides {
            o.validate(field)?;
        }

        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };

        let descriptors: Vec<FieldDescriptor> = first
            .keys()
            .map(|key| self.describe(key, records, overrides.get(key)))
            .collect();

        for field in overrides.keys() {
            if !first.contains_key(field) {
                debug!("Override for '{}' ignored: field not present in data", field);
            }
        }
        debug!(
            "Inferred {} field(s) from {} record(s)",
            descriptors.len(),
            records.len()
        );
        Ok(descriptors)
    }

    fn describe(&self, key: &str, records: &[Record], field_override: Option<&FieldOverride>) -> FieldDescriptor {
        let values: Vec<&Value> = records
            .iter()
            .filter_map(|r| r.get(key))
            .filter(|v| !v.is_null())
            .collect();

        let (mut kind, mut options) = self.classify(&values);
        trace!("Field '{}' inferred as {}", key, kind);

        let mut date_mode = None;
        if let Some(o) = field_override {
            kind = o.kind;
            date_mode = o.date_mode;
            options = if kind.has_options() {
                merge_options(options, o.options.clone(), o.replace_options)
            } else {
                None
            };
            if kind == FieldKind::Select && options.is_none() {
                options = Some(self.label_options(&values));
            }
            trace!("Field '{}' overridden to {}", key, kind);
        }

        FieldDescriptor {
            key: key.to_string(),
            title: title_case(key),
            kind,
            options,
            date_mode,
        }
    }

    fn classify(&self, values: &[&Value]) -> (FieldKind, Option<Vec<FilterOption>>) {
        if !values.is_empty() && values.iter().all(|v| v.is_numeric()) {
            let max_year = f64::from(self.current_year + 1);
            let years = values.iter().all(|v| {
                v.is_integer() && v.as_f64().is_some_and(|n| (1900.0..=max_year).contains(&n))
            });
            let kind = if years { FieldKind::Year } else { FieldKind::Number };
            return (kind, None);
        }

        if values.first().is_some_and(|v| looks_like_date(v)) {
            return (FieldKind::Date, None);
        }

        let previews: Vec<String> = values.iter().map(|v| self.formatter.preview(v)).collect();
        let uniques: IndexSet<String> = previews.iter().map(|p| normalize_label(p)).collect();
        let categorical = !uniques.is_empty()
            && uniques.len() <= self.max_options
            && previews.iter().all(|p| p.chars().count() <= self.max_label_len);

        if !categorical {
            return (FieldKind::Search, None);
        }

        let mut seen = IndexSet::new();
        let options = values
            .iter()
            .zip(previews)
            .filter_map(|(value, preview)| {
                let label = if preview.is_empty() {
                    EMPTY_OPTION_LABEL.to_string()
                } else {
                    preview
                };
                if !seen.insert(label.to_lowercase()) {
                    return None;
                }
                let value = match value {
                    Value::Object(_) => Value::String(label.clone()),
                    other => (*other).clone(),
                };
                Some(FilterOption { label, value })
            })
            .collect();

        (FieldKind::Select, Some(options))
    }

    /// Options whose value is their own label, one per distinct preview.
    fn label_options(&self, values: &[&Value]) -> Vec<FilterOption> {
        let mut seen = IndexSet::new();
        values
            .iter()
            .map(|v| self.formatter.preview(v))
            .filter(|label| seen.insert(label.to_lowercase()))
            .map(|label| FilterOption::new(label.clone(), label))
            .collect()
    }
}

/// True for native dates and ISO-8601 strings. Numbers are never dates here.
pub(crate) fn looks_like_date(value: &Value) -> bool {
    match value {
        Value::Date(_) => true,
        Value::String(s) => crate::value::parse_date(s).is_some(),
        _ => false,
    }
}

/// Union by case-insensitive label, inferred options first.
fn merge_options(
    inferred: Option<Vec<FilterOption>>,
    supplied: Option<Vec<FilterOption>>,
    replace: bool,
) -> Option<Vec<FilterOption>> {
    match (inferred, supplied) {
        (inferred, None) => inferred,
        (_, Some(supplied)) if replace => Some(supplied),
        (None, Some(supplied)) => Some(supplied),
        (Some(mut merged), Some(supplied)) => {
            let mut seen: IndexSet<String> =
                merged.iter().map(|o| o.label.to_lowercase()).collect();
            for option in supplied {
                if seen.insert(option.label.to_lowercase()) {
                    merged.push(option);
                }
            }
            Some(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::records_from_json_value;
    use serde_json::json;

    fn inferencer() -> SchemaInferencer {
        SchemaInferencer::default().with_current_year(2024)
    }

    fn infer(data: JsonValue) -> Vec<FieldDescriptor> {
        let records = records_from_json_value(data).unwrap();
        inferencer().infer(&records, &FieldOverrides::new()).unwrap()
    }

    fn column(values: Vec<JsonValue>) -> JsonValue {
        JsonValue::Array(values.into_iter().map(|v| json!({ "f": v })).collect())
    }

    #[test]
    fn test_empty_dataset() {
        assert!(infer(json!([])).is_empty());
    }

    #[test]
    fn test_year_versus_number() {
        let schema = infer(column(vec![json!(1999), json!(2001), json!(2024)]));
        assert_eq!(schema[0].kind, FieldKind::Year);

        let schema = infer(column(vec![json!(1999), json!(2001), json!(20240)]));
        assert_eq!(schema[0].kind, FieldKind::Number);

        let schema = infer(column(vec![json!(1999.5), json!(2001)]));
        assert_eq!(schema[0].kind, FieldKind::Number);

        // currentYear + 1 is still a year
        let schema = infer(column(vec![json!(2025)]));
        assert_eq!(schema[0].kind, FieldKind::Year);
    }

    #[test]
    fn test_nulls_are_ignored() {
        let schema = infer(column(vec![json!(null), json!(3.5), json!(null)]));
        assert_eq!(schema[0].kind, FieldKind::Number);

        let schema = infer(column(vec![json!(null), json!(null)]));
        assert_eq!(schema[0].kind, FieldKind::Search);
        assert!(schema[0].options.is_none());
    }

    #[test]
    fn test_date_uses_first_value() {
        let schema = infer(column(vec![json!("2024-01-05"), json!("not a date")]));
        assert_eq!(schema[0].kind, FieldKind::Date);

        let schema = infer(column(vec![json!("not a date"), json!("2024-01-05")]));
        assert_eq!(schema[0].kind, FieldKind::Select);
    }

    #[test]
    fn test_select_options_deduplicate_case_insensitively() {
        let schema = infer(column(vec![json!("A"), json!("A"), json!("b"), json!("B")]));
        assert_eq!(schema[0].kind, FieldKind::Select);

        let options = schema[0].options.as_ref().unwrap();
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "b"]);
        assert_eq!(options[1].value, Value::from("b"));
    }

    #[test]
    fn test_object_options_use_their_label() {
        let schema = infer(column(vec![
            json!({ "id": 1, "name": "Ops" }),
            json!({ "id": 2, "name": "Legal" }),
        ]));
        let options = schema[0].options.as_ref().unwrap();
        assert_eq!(options[0], FilterOption::new("Ops", "Ops"));
        assert_eq!(options[1], FilterOption::new("Legal", "Legal"));
    }

    #[test]
    fn test_empty_preview_gets_placeholder_label() {
        let schema = infer(column(vec![json!(""), json!("x")]));
        let options = schema[0].options.as_ref().unwrap();
        assert_eq!(options[0].label, EMPTY_OPTION_LABEL);
        assert_eq!(options[0].value, Value::from(""));
    }

    #[test]
    fn test_too_many_or_too_long_falls_back_to_search() {
        let many: Vec<JsonValue> = (0..11).map(|i| json!(format!("v{}", i))).collect();
        assert_eq!(infer(column(many))[0].kind, FieldKind::Search);

        let long = "x".repeat(31);
        assert_eq!(infer(column(vec![json!(long)]))[0].kind, FieldKind::Search);
    }

    #[test]
    fn test_titles_and_key_order() {
        let schema = infer(json!([{ "created_at": "x", "id": 1, "full name": "y" }]));
        let titles: Vec<&str> = schema.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Created At", "Id", "Full Name"]);
        assert_eq!(title_case("status2_code"), "Status2 Code");
    }

    #[test]
    fn test_override_merges_options() {
        let records =
            records_from_json_value(column(vec![json!("open"), json!("closed")])).unwrap();
        let mut overrides = FieldOverrides::new();
        overrides.insert(
            "f".to_string(),
            FieldOverride::new(FieldKind::Select).with_options(vec![
                FilterOption::new("OPEN", "open"),
                FilterOption::new("Archived", "archived"),
            ]),
        );

        let schema = inferencer().infer(&records, &overrides).unwrap();
        let labels: Vec<&str> = schema[0]
            .options
            .as_ref()
            .unwrap()
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, vec!["open", "closed", "Archived"]);

        overrides["f"].replace_options = true;
        let schema = inferencer().infer(&records, &overrides).unwrap();
        assert_eq!(schema[0].options.as_ref().unwrap().len(), 2);
        assert_eq!(schema[0].options.as_ref().unwrap()[0].label, "OPEN");
    }

    #[test]
    fn test_select_override_builds_options_from_data() {
        let long = "a label that is clearly longer than thirty characters";
        let records =
            records_from_json_value(column(vec![json!(long), json!("short"), json!(long)])).unwrap();
        let mut overrides = FieldOverrides::new();
        overrides.insert("f".to_string(), FieldOverride::new(FieldKind::Select));

        let schema = inferencer().infer(&records, &overrides).unwrap();
        assert_eq!(schema[0].kind, FieldKind::Select);
        let options = schema[0].options.as_ref().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0], FilterOption::new(long, long));
    }

    #[test]
    fn test_override_to_search_drops_options() {
        let records = records_from_json_value(column(vec![json!("a"), json!("b")])).unwrap();
        let mut overrides = FieldOverrides::new();
        overrides.insert("f".to_string(), FieldOverride::new(FieldKind::Search));

        let schema = inferencer().infer(&records, &overrides).unwrap();
        assert_eq!(schema[0].kind, FieldKind::Search);
        assert!(schema[0].options.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let overrides = parse_overrides(
            r#"{
                "due": { "type": "date", "dateMode": "single" },
                "status": { "kind": "select", "options": [{ "label": "Open", "value": "OPEN" }] }
            }"#,
        )
        .unwrap();

        assert_eq!(overrides["due"].date_mode, Some(DateMode::Single));
        assert_eq!(overrides["status"].kind, FieldKind::Select);
        assert_eq!(overrides["status"].options.as_ref().unwrap()[0].value, Value::from("OPEN"));
    }

    #[test]
    fn test_parse_overrides_rejects_bad_config() {
        let err = parse_overrides(r#"{ "status": { "type": "dropdown" } }"#).unwrap_err();
        assert!(matches!(
            err,
            TableError::UnknownFieldKind { ref field, ref kind } if field == "status" && kind == "dropdown"
        ));

        let err = parse_overrides(r#"{ "name": { "type": "search", "dateMode": "range" } }"#)
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidOverride { .. }));
    }
}
