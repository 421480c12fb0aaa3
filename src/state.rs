//! Table state slices.
//!
//! `TableState` is a plain value: each slice is replaced wholesale by its
//! setter on `DataTable`. The helpers here keep the slices consistent with
//! the current column list.

use crate::columns::{ColumnDefinition, Pin};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::filter::FilterValue;
use crate::preview::PreviewFormatter;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key. Keys apply in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSort {
    #[serde(rename = "columnId", alias = "id")]
    pub column_id: String,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn asc(column_id: impl Into<String>) -> Self {
        ColumnSort {
            column_id: column_id.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        ColumnSort {
            column_id: column_id.into(),
            direction: SortDirection::Desc,
        }
    }
}

pub type SortingState = Vec<ColumnSort>;
pub type ColumnFilters = IndexMap<String, FilterValue>;
pub type VisibilityState = IndexMap<String, bool>;
pub type RowSelection = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    #[serde(rename = "pageIndex")]
    pub page_index: usize,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        PaginationState {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size.max(1))
    }

    /// Bounds of the current page within `rows`, clamped.
    pub fn bounds(&self, rows: usize) -> (usize, usize) {
        let size = self.page_size.max(1);
        let start = self.page_index.saturating_mul(size).min(rows);
        (start, start.saturating_add(size).min(rows))
    }
}

/// All user-driven table state.
///
/// # Examples
///
/// ```
/// use smarttable::{TableState, ColumnSort};
///
/// let mut state = TableState::default();
/// state.sorting = vec![ColumnSort::desc("score")];
/// let json = serde_json::to_string(&state).unwrap();
/// let back: TableState = serde_json::from_str(&json).unwrap();
/// assert_eq!(back, state);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableState {
    pub sorting: SortingState,
    #[serde(rename = "columnFilters")]
    pub column_filters: ColumnFilters,
    pub pagination: PaginationState,
    #[serde(rename = "columnVisibility")]
    pub column_visibility: VisibilityState,
    #[serde(rename = "columnOrder")]
    pub column_order: Vec<String>,
    #[serde(rename = "rowSelection")]
    pub row_selection: RowSelection,
}

/// Cycles one key through asc, desc and removed.
///
/// With `multi` the other keys are kept in place and a new key is appended;
/// without it the result holds at most this key.
pub fn toggle_sort(sorting: &[ColumnSort], column_id: &str, multi: bool) -> SortingState {
    let current = sorting.iter().find(|s| s.column_id == column_id).map(|s| s.direction);
    let next = match current {
        None => Some(SortDirection::Asc),
        Some(SortDirection::Asc) => Some(SortDirection::Desc),
        Some(SortDirection::Desc) => None,
    };

    if !multi {
        return next
            .map(|direction| {
                vec![ColumnSort {
                    column_id: column_id.to_string(),
                    direction,
                }]
            })
            .unwrap_or_default();
    }

    let mut result: SortingState = sorting.to_vec();
    match (current, next) {
        (None, Some(direction)) => result.push(ColumnSort {
            column_id: column_id.to_string(),
            direction,
        }),
        (Some(_), Some(direction)) => {
            for key in result.iter_mut().filter(|s| s.column_id == column_id) {
                key.direction = direction;
            }
        }
        (_, None) => result.retain(|s| s.column_id != column_id),
    }
    result
}

/// Ordering used by the sort stage. Nulls sort last in both directions.
///
/// Values of different kinds never compare by content: booleans come first,
/// then numbers, dates and finally everything else by preview text. Numbers
/// use `f64::total_cmp`, so NaN has a fixed place.
pub fn compare_cells(a: &Value, b: &Value, direction: SortDirection, formatter: &PreviewFormatter) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let base = sort_rank(a).cmp(&sort_rank(b)).then_with(|| match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) if a.is_numeric() && b.is_numeric() => x.total_cmp(&y),
            _ => compare_text(&formatter.normalized(a), &formatter.normalized(b)),
        },
    });

    match direction {
        SortDirection::Asc => base,
        SortDirection::Desc => base.reverse(),
    }
}

fn sort_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Date(_) => 2,
        _ => 3,
    }
}

/// Text comparison where runs of digits compare by numeric value.
fn compare_text(a: &str, b: &str) -> Ordering {
    let mut xs = a.chars().peekable();
    let mut ys = b.chars().peekable();
    loop {
        match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let nx = take_digits(&mut xs);
                let ny = take_digits(&mut ys);
                let ord = nx
                    .trim_start_matches('0')
                    .len()
                    .cmp(&ny.trim_start_matches('0').len())
                    .then_with(|| nx.trim_start_matches('0').cmp(ny.trim_start_matches('0')));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                xs.next();
                ys.next();
            }
        }
    }
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = it.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

/// Brings a visibility map in line with the columns: new ids default to
/// visible, forced-hidden ids are hidden, stale ids are dropped and columns
/// that cannot be hidden are always visible.
pub fn reconcile_visibility(
    previous: &VisibilityState,
    columns: &[ColumnDefinition],
    force_hidden: &[String],
) -> VisibilityState {
    columns
        .iter()
        .map(|c| {
            let visible = if !c.hideable {
                true
            } else if force_hidden.contains(&c.id) {
                false
            } else {
                previous.get(&c.id).copied().unwrap_or(true)
            };
            (c.id.clone(), visible)
        })
        .collect()
}

/// Turns `requested` into a permutation of the column ids: known ids keep
/// their requested position, missing ids follow in column order, and
/// synthetic columns stay pinned to their edges.
pub fn reconcile_order(requested: &[String], columns: &[ColumnDefinition]) -> Vec<String> {
    let pinned = |edge: Pin| columns.iter().filter(move |c| c.pin == Some(edge)).map(|c| c.id.clone());
    let movable: IndexSet<&str> = columns
        .iter()
        .filter(|c| c.pin.is_none())
        .map(|c| c.id.as_str())
        .collect();

    let mut middle: IndexSet<String> = requested
        .iter()
        .filter(|id| movable.contains(id.as_str()))
        .cloned()
        .collect();
    middle.extend(movable.iter().map(|id| id.to_string()));

    pinned(Pin::Leading)
        .chain(middle)
        .chain(pinned(Pin::Trailing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnDefinitionBuilder;
    use crate::schema::{FieldOverrides, SchemaInferencer};
    use crate::value::records_from_json_value;
    use serde_json::json;

    fn columns() -> Vec<ColumnDefinition> {
        let records = records_from_json_value(json!([{ "id": 1, "a": "x", "b": "y", "c": "z" }])).unwrap();
        let schema = SchemaInferencer::default().infer(&records, &FieldOverrides::new()).unwrap();
        let keys: Vec<String> = records[0].keys().cloned().collect();
        ColumnDefinitionBuilder::new().build(&keys, &schema).unwrap()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_toggle_sort_cycle() {
        let s = toggle_sort(&[], "a", false);
        assert_eq!(s, vec![ColumnSort::asc("a")]);
        let s = toggle_sort(&s, "a", false);
        assert_eq!(s, vec![ColumnSort::desc("a")]);
        let s = toggle_sort(&s, "a", false);
        assert!(s.is_empty());
    }

    #[test]
    fn test_toggle_sort_multi_keeps_key_order() {
        let s = toggle_sort(&[], "a", true);
        let s = toggle_sort(&s, "b", true);
        let s = toggle_sort(&s, "a", true);
        assert_eq!(s, vec![ColumnSort::desc("a"), ColumnSort::asc("b")]);
        let s = toggle_sort(&s, "a", true);
        assert_eq!(s, vec![ColumnSort::asc("b")]);

        // Without multi, another column replaces the keys.
        let s = toggle_sort(&s, "c", false);
        assert_eq!(s, vec![ColumnSort::asc("c")]);
    }

    #[test]
    fn test_compare_cells() {
        use SortDirection::*;
        let fmt = PreviewFormatter::default();
        assert_eq!(compare_cells(&Value::Int(2), &Value::Float(10.0), Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::Null, &Value::Int(1), Asc, &fmt), Ordering::Greater);
        assert_eq!(compare_cells(&Value::Null, &Value::Int(1), Desc, &fmt), Ordering::Greater);
        assert_eq!(compare_cells(&Value::from("b"), &Value::from("A"), Asc, &fmt), Ordering::Greater);
        assert_eq!(compare_cells(&Value::from("item 9"), &Value::from("item 10"), Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::from("b"), &Value::from("a"), Desc, &fmt), Ordering::Less);
    }

    #[test]
    fn test_compare_cells_ranks_kinds() {
        use SortDirection::*;
        let fmt = PreviewFormatter::default();
        // Numbers before text, whatever the text looks like.
        assert_eq!(compare_cells(&Value::Int(-2), &Value::from("-3"), Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::Int(-5), &Value::from("-3"), Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::Bool(true), &Value::Int(0), Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::from("x"), &Value::Int(0), Desc, &fmt), Ordering::Less);

        let nan = Value::Float(f64::NAN);
        assert_eq!(compare_cells(&nan, &nan, Asc, &fmt), Ordering::Equal);
        assert_eq!(compare_cells(&Value::Float(1e300), &nan, Asc, &fmt), Ordering::Less);
        assert_eq!(compare_cells(&Value::Int(-1), &nan, Asc, &fmt), Ordering::Less);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = PaginationState { page_index: 2, page_size: 10 };
        assert_eq!(p.bounds(25), (20, 25));
        assert_eq!(p.bounds(5), (5, 5));
        assert_eq!(p.page_count(25), 3);
        assert_eq!(p.page_count(0), 0);
    }

    #[test]
    fn test_reconcile_visibility() {
        let cols = columns();
        let mut previous = VisibilityState::new();
        previous.insert("a".to_string(), false);
        previous.insert("gone".to_string(), false);
        previous.insert("select".to_string(), false);

        let vis = reconcile_visibility(&previous, &cols, &strings(&["b"]));
        assert_eq!(vis.get("a"), Some(&false));
        assert_eq!(vis.get("b"), Some(&false));
        assert_eq!(vis.get("c"), Some(&true));
        assert_eq!(vis.get("select"), Some(&true));
        assert!(!vis.contains_key("gone"));
    }

    #[test]
    fn test_reconcile_order_is_permutation() {
        let cols = columns();
        let order = reconcile_order(&strings(&["c", "actions", "ghost", "a", "c"]), &cols);
        assert_eq!(order, strings(&["select", "c", "a", "id", "b", "actions"]));

        let mut sorted = order.clone();
        sorted.sort();
        let mut expected: Vec<String> = cols.iter().map(|c| c.id.clone()).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
