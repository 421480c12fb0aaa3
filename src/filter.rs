//! Filter values and predicates.
//!
//! Every predicate is pure and total: malformed cells and half-filled filter
//! values are treated permissively, so no row is ever dropped because its
//! data is messy.

use crate::error::{Result, TableError};
use crate::preview::{normalize_label, PreviewFormatter};
use crate::schema::FieldKind;
use crate::value::{format_number, parse_date, Value};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a number filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberCondition {
    IsEqualTo,
    IsBetween,
    IsGreaterThan,
    IsLessThan,
}

impl NumberCondition {
    pub fn label(&self) -> &'static str {
        match self {
            NumberCondition::IsEqualTo => "Is equal to",
            NumberCondition::IsBetween => "Is between",
            NumberCondition::IsGreaterThan => "Is greater than",
            NumberCondition::IsLessThan => "Is less than",
        }
    }
}

/// `{condition, value: [a, b]}`; the second operand is only read by
/// `is-between`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberFilter {
    pub condition: Option<NumberCondition>,
    pub value: [Option<f64>; 2],
}

impl NumberFilter {
    pub fn new(condition: NumberCondition, first: f64) -> Self {
        NumberFilter {
            condition: Some(condition),
            value: [Some(first), None],
        }
    }

    pub fn between(low: f64, high: f64) -> Self {
        NumberFilter {
            condition: Some(NumberCondition::IsBetween),
            value: [Some(low), Some(high)],
        }
    }
}

/// A single day, or a range with optional bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateFilter {
    Single(DateTime<Utc>),
    Range {
        #[serde(default)]
        from: Option<DateTime<Utc>>,
        #[serde(default)]
        to: Option<DateTime<Utc>>,
    },
}

/// The value stored for one column filter. Its variant always matches the
/// kind of the column it is stored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    Search(String),
    Select(Vec<String>),
    Number(NumberFilter),
    Year(String),
    Date(DateFilter),
}

impl FilterValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FilterValue::Search(_) => FieldKind::Search,
            FilterValue::Select(_) => FieldKind::Select,
            FilterValue::Number(_) => FieldKind::Number,
            FilterValue::Year(_) => FieldKind::Year,
            FilterValue::Date(_) => FieldKind::Date,
        }
    }

    /// False when the value cannot exclude any row.
    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Search(s) | FilterValue::Year(s) => !s.trim().is_empty(),
            FilterValue::Select(values) => !values.is_empty(),
            FilterValue::Number(n) => n.condition.is_some() && n.value[0].is_some(),
            FilterValue::Date(DateFilter::Single(_)) => true,
            FilterValue::Date(DateFilter::Range { from, .. }) => from.is_some(),
        }
    }

    /// Evaluates this filter against one cell.
    pub fn matches(&self, cell: &Value, formatter: &PreviewFormatter) -> bool {
        match self {
            FilterValue::Search(s) => text_search(cell, s, formatter),
            FilterValue::Select(values) => multi_select_includes(cell, values, formatter),
            FilterValue::Number(n) => number_condition(cell, n),
            FilterValue::Year(y) => year_equals(cell, y),
            FilterValue::Date(d) => date_between(cell, Some(d)),
        }
    }

    /// Short labels describing the value, one per selected item.
    pub fn labels(&self) -> Vec<String> {
        match self {
            FilterValue::Search(s) | FilterValue::Year(s) => {
                if s.is_empty() {
                    Vec::new()
                } else {
                    vec![s.clone()]
                }
            }
            FilterValue::Select(values) => values.clone(),
            FilterValue::Number(n) => {
                let Some(condition) = n.condition else {
                    return Vec::new();
                };
                let operand = |v: Option<f64>| v.map(format_number).unwrap_or_default();
                let label = match n.value {
                    [None, None] => condition.label().to_string(),
                    [a, None] => format!("{} {}", condition.label(), operand(a)),
                    [a, Some(b)] => format!(
                        "{} {} and {}",
                        condition.label(),
                        operand(a),
                        format_number(b)
                    ),
                };
                vec![label]
            }
            FilterValue::Date(DateFilter::Single(d)) => vec![format_long_date(d)],
            FilterValue::Date(DateFilter::Range { from, to }) => match (from, to) {
                (Some(from), Some(to)) => {
                    vec![format!("{} – {}", format_long_date(from), format_long_date(to))]
                }
                (Some(from), None) => vec![format!("{} – …", format_long_date(from))],
                _ => Vec::new(),
            },
        }
    }

    /// The labels collapsed for a filter chip: up to two joined by commas,
    /// otherwise the first followed by a count.
    pub fn summary(&self) -> Option<String> {
        let labels = self.labels();
        match labels.len() {
            0 => None,
            1 | 2 => Some(labels.join(", ")),
            n => Some(format!("{} and {} more", labels[0], n - 1)),
        }
    }

    /// Parses a compact textual filter for a column of `kind`.
    ///
    /// * search, year: the text itself
    /// * select: comma separated values
    /// * number: `eq:5`, `gt:5`, `lt:5` or `between:1:5`
    /// * date: `2024-01-05` for a single day, `from..to` with either side optional
    pub fn parse(column: &str, kind: FieldKind, text: &str) -> Result<Self> {
        let invalid = |reason: String| TableError::InvalidFilter {
            column: column.to_string(),
            reason,
        };
        match kind {
            FieldKind::Search => Ok(FilterValue::Search(text.to_string())),
            FieldKind::Year => Ok(FilterValue::Year(text.trim().to_string())),
            FieldKind::Select => Ok(FilterValue::Select(
                text.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            FieldKind::Number => {
                let mut parts = text.split(':');
                let op = parts.next().unwrap_or_default().trim();
                let condition = match op {
                    "eq" | "is-equal-to" => NumberCondition::IsEqualTo,
                    "gt" | "is-greater-than" => NumberCondition::IsGreaterThan,
                    "lt" | "is-less-than" => NumberCondition::IsLessThan,
                    "between" | "is-between" => NumberCondition::IsBetween,
                    other => return Err(invalid(format!("unknown number condition '{}'", other))),
                };
                let mut operand = || -> Result<Option<f64>> {
                    match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
                        None => Ok(None),
                        Some(s) => s
                            .parse::<f64>()
                            .map(Some)
                            .map_err(|_| invalid(format!("'{}' is not a number", s))),
                    }
                };
                let first = operand()?;
                let second = operand()?;
                Ok(FilterValue::Number(NumberFilter {
                    condition: Some(condition),
                    value: [first, second],
                }))
            }
            FieldKind::Date => {
                let parse = |s: &str| -> Result<Option<DateTime<Utc>>> {
                    let s = s.trim();
                    if s.is_empty() {
                        return Ok(None);
                    }
                    parse_date(s)
                        .map(Some)
                        .ok_or_else(|| invalid(format!("'{}' is not a date", s)))
                };
                match text.split_once("..") {
                    Some((from, to)) => Ok(FilterValue::Date(DateFilter::Range {
                        from: parse(from)?,
                        to: parse(to)?,
                    })),
                    None => match parse(text)? {
                        Some(day) => Ok(FilterValue::Date(DateFilter::Single(day))),
                        None => Err(invalid("empty date filter".to_string())),
                    },
                }
            }
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary().unwrap_or_default())
    }
}

fn format_long_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// The predicate a column applies, named after the filter kind it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterFn {
    TextSearch,
    MultiSelectIncludes,
    NumberCondition,
    YearEquals,
    DateBetween,
}

impl FilterFn {
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Search => FilterFn::TextSearch,
            FieldKind::Select => FilterFn::MultiSelectIncludes,
            FieldKind::Number => FilterFn::NumberCondition,
            FieldKind::Year => FilterFn::YearEquals,
            FieldKind::Date => FilterFn::DateBetween,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FilterFn::TextSearch => FieldKind::Search,
            FilterFn::MultiSelectIncludes => FieldKind::Select,
            FilterFn::NumberCondition => FieldKind::Number,
            FilterFn::YearEquals => FieldKind::Year,
            FilterFn::DateBetween => FieldKind::Date,
        }
    }
}

/// Empty filter matches everything. A list cell matches when any of its
/// elements matches any filter value.
pub fn multi_select_includes(cell: &Value, values: &[String], formatter: &PreviewFormatter) -> bool {
    if values.is_empty() {
        return true;
    }
    match cell {
        Value::List(items) => values
            .iter()
            .any(|f| items.iter().any(|item| formatter.matches(item, f))),
        _ => values.iter().any(|f| formatter.matches(cell, f)),
    }
}

/// Single day: same calendar day. Range: inclusive bounds, or `cell >= from`
/// when only `from` is set. Missing or unparsable cells pass.
pub fn date_between(cell: &Value, filter: Option<&DateFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let Some(date) = cell.to_date() else {
        return true;
    };
    match filter {
        DateFilter::Single(day) => date.date_naive() == day.date_naive(),
        DateFilter::Range {
            from: Some(from),
            to: Some(to),
        } => date >= *from && date <= *to,
        DateFilter::Range {
            from: Some(from),
            to: None,
        } => date >= *from,
        DateFilter::Range { .. } => true,
    }
}

/// Compares the cell's calendar year with the filter. A missing cell fails,
/// an unparsable one passes.
pub fn year_equals(cell: &Value, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        return true;
    }
    if !cell.is_truthy() {
        return false;
    }
    let Ok(wanted) = filter.parse::<f64>() else {
        return true;
    };
    match cell_year(cell) {
        Some(year) => f64::from(year) == wanted,
        None => true,
    }
}

fn cell_year(cell: &Value) -> Option<i32> {
    match cell {
        Value::Int(_) | Value::Float(_) if cell.is_integer() => {
            cell.as_f64().and_then(|n| i32::try_from(n as i64).ok())
        }
        Value::String(s) => s
            .trim()
            .parse::<i32>()
            .ok()
            .or_else(|| parse_date(s).map(|d| d.year())),
        Value::Date(d) => Some(d.year()),
        _ => None,
    }
}

/// Case-insensitive substring match on the cell preview.
pub fn text_search(cell: &Value, filter: &str, formatter: &PreviewFormatter) -> bool {
    let needle = normalize_label(filter);
    if needle.is_empty() {
        return true;
    }
    formatter.preview(cell).to_lowercase().contains(&needle)
}

/// Numeric comparison. Non-numeric cells pass, as does a filter without a
/// condition or first operand.
pub fn number_condition(cell: &Value, filter: &NumberFilter) -> bool {
    let (Some(condition), Some(a)) = (filter.condition, filter.value[0]) else {
        return true;
    };
    let Some(n) = cell_number(cell) else {
        return true;
    };
    match condition {
        NumberCondition::IsEqualTo => n == a,
        NumberCondition::IsGreaterThan => n > a,
        NumberCondition::IsLessThan => n < a,
        NumberCondition::IsBetween => match filter.value[1] {
            Some(b) => n >= a.min(b) && n <= a.max(b),
            None => n >= a,
        },
    }
}

fn cell_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        other => other.as_f64().filter(|n| !n.is_nan()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt() -> PreviewFormatter {
        PreviewFormatter::default()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn day(s: &str) -> DateTime<Utc> {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_multi_select_on_lists() {
        let cell = Value::from(json!(["red", "blue"]));
        assert!(multi_select_includes(&cell, &strings(&["blue"]), &fmt()));
        assert!(!multi_select_includes(&cell, &strings(&["green"]), &fmt()));
        assert!(multi_select_includes(&cell, &[], &fmt()));
    }

    #[test]
    fn test_multi_select_on_scalars() {
        assert!(multi_select_includes(&Value::from("Open"), &strings(&["open", "closed"]), &fmt()));
        assert!(!multi_select_includes(&Value::Null, &strings(&["open"]), &fmt()));
        assert!(multi_select_includes(&Value::Int(3), &strings(&["3"]), &fmt()));
        let team = Value::from(json!({ "id": 4, "name": "Ops" }));
        assert!(multi_select_includes(&team, &strings(&["ops"]), &fmt()));
    }

    #[test]
    fn test_date_between() {
        let cell = Value::from("2024-03-10T15:30:00Z");
        assert!(date_between(&cell, None));
        assert!(date_between(&cell, Some(&DateFilter::Single(day("2024-03-10")))));
        assert!(!date_between(&cell, Some(&DateFilter::Single(day("2024-03-11")))));

        let range = DateFilter::Range {
            from: Some(day("2024-03-01")),
            to: Some(day("2024-03-31")),
        };
        assert!(date_between(&cell, Some(&range)));
        assert!(!date_between(&Value::from("2024-04-01"), Some(&range)));

        let open = DateFilter::Range {
            from: Some(day("2024-03-11")),
            to: None,
        };
        assert!(!date_between(&cell, Some(&open)));

        let only_to = DateFilter::Range {
            from: None,
            to: Some(day("2000-01-01")),
        };
        assert!(date_between(&cell, Some(&only_to)));
    }

    #[test]
    fn test_date_between_is_permissive() {
        let filter = DateFilter::Single(day("2024-03-10"));
        assert!(date_between(&Value::from("garbage"), Some(&filter)));
        assert!(date_between(&Value::Null, Some(&filter)));
    }

    #[test]
    fn test_year_equals() {
        assert!(year_equals(&Value::Int(2021), "2021"));
        assert!(!year_equals(&Value::Int(2021), "2020"));
        assert!(year_equals(&Value::from("2021-06-01"), "2021"));
        assert!(year_equals(&Value::Null, ""));
        assert!(!year_equals(&Value::Null, "2021"));
        assert!(year_equals(&Value::from("someday"), "2021"));
        assert!(year_equals(&Value::Int(2021), "not a year"));
    }

    #[test]
    fn test_text_search() {
        let cell = Value::from("Quarterly Report");
        assert!(text_search(&cell, "report", &fmt()));
        assert!(text_search(&cell, "  QUARTER ", &fmt()));
        assert!(!text_search(&cell, "annual", &fmt()));
        assert!(text_search(&Value::Null, "", &fmt()));
        assert!(!text_search(&Value::Null, "x", &fmt()));
    }

    #[test]
    fn test_number_condition() {
        let cell = Value::Int(5);
        assert!(number_condition(&cell, &NumberFilter::new(NumberCondition::IsEqualTo, 5.0)));
        assert!(number_condition(&cell, &NumberFilter::new(NumberCondition::IsGreaterThan, 4.0)));
        assert!(!number_condition(&cell, &NumberFilter::new(NumberCondition::IsLessThan, 5.0)));
        assert!(number_condition(&cell, &NumberFilter::between(5.0, 9.0)));
        assert!(!number_condition(&cell, &NumberFilter::between(6.0, 9.0)));
        assert!(number_condition(&Value::from("7.5"), &NumberFilter::between(7.0, 8.0)));

        assert!(number_condition(&cell, &NumberFilter::default()));
        assert!(number_condition(&Value::from("n/a"), &NumberFilter::new(NumberCondition::IsEqualTo, 1.0)));
    }

    #[test]
    fn test_predicates_are_total() {
        let cells = vec![
            Value::Null,
            Value::Bool(true),
            Value::Float(f64::NAN),
            Value::from(json!([[], {}])),
            Value::from(json!({ "deep": { "x": [1, null] } })),
        ];
        let filters = vec![
            FilterValue::Search("x".to_string()),
            FilterValue::Select(strings(&["a"])),
            FilterValue::Number(NumberFilter::between(1.0, 2.0)),
            FilterValue::Year("2020".to_string()),
            FilterValue::Date(DateFilter::Single(day("2020-01-01"))),
        ];
        for cell in &cells {
            for filter in &filters {
                let _ = filter.matches(cell, &fmt());
            }
        }
    }

    #[test]
    fn test_labels_and_summary() {
        let select = FilterValue::Select(strings(&["A", "B"]));
        assert_eq!(select.summary().as_deref(), Some("A, B"));

        let select = FilterValue::Select(strings(&["A", "B", "C"]));
        assert_eq!(select.summary().as_deref(), Some("A and 2 more"));

        let number = FilterValue::Number(NumberFilter::between(1.0, 5.0));
        assert_eq!(number.summary().as_deref(), Some("Is between 1 and 5"));

        let number = FilterValue::Number(NumberFilter::new(NumberCondition::IsGreaterThan, 2.5));
        assert_eq!(number.to_string(), "Is greater than 2.5");

        let range = FilterValue::Date(DateFilter::Range {
            from: Some(day("2024-01-05")),
            to: None,
        });
        assert_eq!(range.summary().as_deref(), Some("Jan 5, 2024 – …"));

        assert_eq!(FilterValue::Select(Vec::new()).summary(), None);
    }

    #[test]
    fn test_is_active() {
        assert!(!FilterValue::Search("  ".to_string()).is_active());
        assert!(FilterValue::Search("x".to_string()).is_active());
        assert!(!FilterValue::Number(NumberFilter::default()).is_active());
        assert!(!FilterValue::Date(DateFilter::Range { from: None, to: None }).is_active());
    }

    #[test]
    fn test_parse_compact_filters() {
        assert_eq!(
            FilterValue::parse("tags", FieldKind::Select, "red, blue,").unwrap(),
            FilterValue::Select(strings(&["red", "blue"]))
        );
        assert_eq!(
            FilterValue::parse("qty", FieldKind::Number, "between:1:5").unwrap(),
            FilterValue::Number(NumberFilter::between(1.0, 5.0))
        );
        assert_eq!(
            FilterValue::parse("due", FieldKind::Date, "2024-01-01..").unwrap(),
            FilterValue::Date(DateFilter::Range {
                from: Some(day("2024-01-01")),
                to: None
            })
        );
        assert!(FilterValue::parse("qty", FieldKind::Number, "about:3").is_err());
        assert!(FilterValue::parse("due", FieldKind::Date, "soon").is_err());
    }

    #[test]
    fn test_filter_value_serialization() {
        let value = FilterValue::Select(strings(&["a"]));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, json!({ "type": "select", "value": ["a"] }));

        let number: FilterValue = serde_json::from_value(json!({
            "type": "number",
            "value": { "condition": "is-between", "value": [1, 3] }
        }))
        .unwrap();
        assert_eq!(number, FilterValue::Number(NumberFilter::between(1.0, 3.0)));
    }
}
