//! Column definitions.
//!
//! Turns the inferred schema into the ordered list of columns a table shows:
//! one data column per field, minus hidden fields, reordered by an explicit
//! order, framed by synthetic columns (row selection and custom columns on
//! the leading edge, custom columns and row actions on the trailing edge).

use crate::error::{Result, TableError};
use crate::filter::FilterFn;
use crate::render::{default_renderer, renderer, CellDisplay, CellRenderer, RowActions};
use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::{Record, Value};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::fmt;
use std::rc::Rc;

pub const SELECT_COLUMN_ID: &str = "select";
pub const ACTIONS_COLUMN_ID: &str = "actions";

/// Which edge a synthetic column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    Leading,
    Trailing,
}

/// How a column reads its value from a record.
#[derive(Clone)]
pub enum Accessor {
    Field(String),
    Computed(Rc<dyn Fn(&Record) -> Value>),
    /// Display-only column.
    None,
}

impl Accessor {
    pub fn value(&self, record: &Record) -> Value {
        match self {
            Accessor::Field(key) => record.get(key).cloned().unwrap_or(Value::Null),
            Accessor::Computed(f) => f(record),
            Accessor::None => Value::Null,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(key) => f.debug_tuple("Field").field(key).finish(),
            Accessor::Computed(_) => f.write_str("Computed"),
            Accessor::None => f.write_str("None"),
        }
    }
}

#[derive(Clone)]
pub struct ColumnDefinition {
    pub id: String,
    pub title: String,
    pub accessor: Accessor,
    pub renderer: CellRenderer,
    pub filter_kind: Option<FieldKind>,
    pub filter_fn: Option<FilterFn>,
    pub sortable: bool,
    pub hideable: bool,
    pub filterable: bool,
    /// Set for synthetic columns.
    pub pin: Option<Pin>,
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("accessor", &self.accessor)
            .field("filter_kind", &self.filter_kind)
            .field("sortable", &self.sortable)
            .field("hideable", &self.hideable)
            .field("filterable", &self.filterable)
            .field("pin", &self.pin)
            .finish_non_exhaustive()
    }
}

impl ColumnDefinition {
    /// A host-defined synthetic column. It is never sorted, filtered or hidden.
    pub fn display(id: impl Into<String>, title: impl Into<String>, renderer: CellRenderer) -> Self {
        ColumnDefinition {
            id: id.into(),
            title: title.into(),
            accessor: Accessor::None,
            renderer,
            filter_kind: None,
            filter_fn: None,
            sortable: false,
            hideable: false,
            filterable: false,
            pin: None,
        }
    }

    /// A synthetic column computed from the whole record.
    pub fn computed<F>(id: impl Into<String>, title: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> Value + 'static,
    {
        let mut column = Self::display(id, title, renderer(crate::render::render_text));
        column.accessor = Accessor::Computed(Rc::new(compute));
        column
    }

    /// The leading row-selection checkbox column.
    pub fn selection() -> Self {
        Self::display(
            SELECT_COLUMN_ID,
            "",
            renderer(|ctx| CellDisplay::Checkbox { checked: ctx.selected }),
        )
    }

    /// The trailing row-actions column.
    pub fn actions(actions: RowActions) -> Self {
        Self::display(
            ACTIONS_COLUMN_ID,
            "Actions",
            renderer(move |ctx| CellDisplay::Actions(actions.menu(ctx.record))),
        )
    }

    pub fn is_synthetic(&self) -> bool {
        self.pin.is_some()
    }

    pub fn value(&self, record: &Record) -> Value {
        self.accessor.value(record)
    }
}

/// Builds the ordered column list for a table.
///
/// # Examples
///
/// ```
/// use smarttable::{ColumnDefinitionBuilder, SchemaInferencer, FieldOverrides, records_from_json_value};
/// use serde_json::json;
///
/// let records = records_from_json_value(json!([{ "id": 1, "name": "A", "email": "a@x" }])).unwrap();
/// let schema = SchemaInferencer::default().infer(&records, &FieldOverrides::new()).unwrap();
/// let keys: Vec<String> = records[0].keys().cloned().collect();
///
/// let columns = ColumnDefinitionBuilder::new()
///     .column_order(vec!["email".to_string()])
///     .hidden_columns(vec!["id".to_string()])
///     .build(&keys, &schema)
///     .unwrap();
///
/// let ids: Vec<&str> = columns.iter().map(|c| c.id.as_str()).collect();
/// assert_eq!(ids, vec!["select", "email", "name", "actions"]);
/// ```
#[derive(Clone)]
pub struct ColumnDefinitionBuilder {
    renderers: IndexMap<String, CellRenderer>,
    before: Vec<ColumnDefinition>,
    after: Vec<ColumnDefinition>,
    column_order: Option<Vec<String>>,
    hidden_columns: Vec<String>,
    show_select: bool,
    row_actions: Option<RowActions>,
    show_controls: bool,
}

impl Default for ColumnDefinitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnDefinitionBuilder {
    pub fn new() -> Self {
        ColumnDefinitionBuilder {
            renderers: IndexMap::new(),
            before: Vec::new(),
            after: Vec::new(),
            column_order: None,
            hidden_columns: Vec::new(),
            show_select: true,
            row_actions: Some(RowActions::default()),
            show_controls: true,
        }
    }

    pub fn renderer(mut self, field: impl Into<String>, renderer: CellRenderer) -> Self {
        self.renderers.insert(field.into(), renderer);
        self
    }

    pub fn renderers(mut self, renderers: IndexMap<String, CellRenderer>) -> Self {
        self.renderers.extend(renderers);
        self
    }

    pub fn columns_before(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.before = columns;
        self
    }

    pub fn columns_after(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.after = columns;
        self
    }

    pub fn column_order(mut self, order: Vec<String>) -> Self {
        self.column_order = Some(order);
        self
    }

    pub fn hidden_columns(mut self, hidden: Vec<String>) -> Self {
        self.hidden_columns = hidden;
        self
    }

    pub fn show_select(mut self, show: bool) -> Self {
        self.show_select = show;
        self
    }

    /// `None` removes the row-actions column.
    pub fn row_actions(mut self, actions: Option<RowActions>) -> Self {
        self.row_actions = actions;
        self
    }

    pub fn show_controls(mut self, show: bool) -> Self {
        self.show_controls = show;
        self
    }

    pub fn build(&self, keys: &[String], descriptors: &[FieldDescriptor]) -> Result<Vec<ColumnDefinition>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let by_key: IndexMap<&str, &FieldDescriptor> =
            descriptors.iter().map(|d| (d.key.as_str(), d)).collect();
        let hidden: IndexSet<&str> = self.hidden_columns.iter().map(String::as_str).collect();

        let mut data_columns: IndexMap<&str, ColumnDefinition> = keys
            .iter()
            .filter(|k| !hidden.contains(k.as_str()))
            .map(|key| (key.as_str(), self.data_column(key, by_key.get(key.as_str()).copied())))
            .collect();

        let mut ordered = Vec::with_capacity(data_columns.len());
        if let Some(order) = self.column_order.as_ref().filter(|o| !o.is_empty()) {
            for id in order {
                match data_columns.shift_remove(id.as_str()) {
                    Some(column) => ordered.push(column),
                    None if !hidden.contains(id.as_str()) && !keys.contains(id) => {
                        warn!("column_order names unknown column '{}'", id)
                    }
                    None => {}
                }
            }
        }
        ordered.extend(data_columns.into_values());

        let mut columns = Vec::with_capacity(ordered.len() + self.before.len() + self.after.len() + 2);
        if self.show_select {
            columns.push(ColumnDefinition::selection());
        }
        columns.extend(self.before.iter().cloned());
        for column in &mut columns {
            pin(column, Pin::Leading);
        }
        columns.extend(ordered);

        let mut trailing: Vec<ColumnDefinition> = self.after.to_vec();
        if let Some(actions) = &self.row_actions {
            trailing.push(ColumnDefinition::actions(actions.clone()));
        }
        for mut column in trailing {
            pin(&mut column, Pin::Trailing);
            columns.push(column);
        }

        let mut seen = IndexSet::new();
        for column in &columns {
            if !seen.insert(column.id.as_str()) {
                warn!("Duplicate column id '{}'", column.id);
                return Err(TableError::DuplicateColumn(column.id.clone()));
            }
        }

        debug!("Built {} column(s) from {} field(s)", columns.len(), keys.len());
        Ok(columns)
    }

    fn data_column(&self, key: &str, descriptor: Option<&FieldDescriptor>) -> ColumnDefinition {
        let filter_kind = descriptor.map(|d| d.kind);
        let renderer = self
            .renderers
            .get(key)
            .cloned()
            .unwrap_or_else(|| default_renderer(key));

        ColumnDefinition {
            id: key.to_string(),
            title: descriptor
                .map(|d| d.title.clone())
                .unwrap_or_else(|| crate::schema::title_case(key)),
            accessor: Accessor::Field(key.to_string()),
            renderer,
            filter_kind,
            filter_fn: filter_kind.map(FilterFn::for_kind),
            sortable: self.show_controls,
            hideable: self.show_controls,
            filterable: self.show_controls && filter_kind.is_some(),
            pin: None,
        }
    }
}

fn pin(column: &mut ColumnDefinition, edge: Pin) {
    column.pin = Some(edge);
    column.sortable = false;
    column.hideable = false;
    column.filterable = false;
    column.filter_kind = None;
    column.filter_fn = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CellContext;
    use crate::schema::{FieldOverrides, SchemaInferencer};
    use crate::value::records_from_json_value;
    use serde_json::json;

    fn fixture() -> (Vec<String>, Vec<FieldDescriptor>) {
        let records = records_from_json_value(json!([
            { "id": 1, "name": "Alpha", "status": "open", "created_at": "2024-01-01", "score": 3.5 },
            { "id": 2, "name": "Beta", "status": "closed", "created_at": "2024-02-01", "score": 9.0 },
        ]))
        .unwrap();
        let schema = SchemaInferencer::default()
            .with_current_year(2024)
            .infer(&records, &FieldOverrides::new())
            .unwrap();
        (records[0].keys().cloned().collect(), schema)
    }

    fn ids(columns: &[ColumnDefinition]) -> Vec<&str> {
        columns.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_default_layout() {
        let (keys, schema) = fixture();
        let columns = ColumnDefinitionBuilder::new().build(&keys, &schema).unwrap();
        assert_eq!(
            ids(&columns),
            vec!["select", "id", "name", "status", "created_at", "score", "actions"]
        );

        let status = &columns[3];
        assert_eq!(status.filter_fn, Some(FilterFn::MultiSelectIncludes));
        assert!(status.sortable && status.hideable && status.filterable);
        assert_eq!(columns[4].filter_fn, Some(FilterFn::DateBetween));
        assert_eq!(columns[5].filter_fn, Some(FilterFn::NumberCondition));

        let select = &columns[0];
        assert!(select.is_synthetic());
        assert!(!select.sortable && !select.hideable && !select.filterable);
    }

    #[test]
    fn test_empty_keys_yield_no_columns() {
        let columns = ColumnDefinitionBuilder::new().build(&[], &[]).unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_hide_and_order() {
        let (keys, schema) = fixture();
        let columns = ColumnDefinitionBuilder::new()
            .show_select(false)
            .row_actions(None)
            .hidden_columns(vec!["id".to_string(), "score".to_string()])
            .column_order(vec!["status".to_string(), "id".to_string(), "ghost".to_string()])
            .build(&keys, &schema)
            .unwrap();
        assert_eq!(ids(&columns), vec!["status", "name", "created_at"]);
    }

    #[test]
    fn test_synthetic_columns_frame_data() {
        let (keys, schema) = fixture();
        let before = ColumnDefinition::display("drag", "", renderer(|_| CellDisplay::Empty));
        let after = ColumnDefinition::computed("label", "Label", |r| {
            Value::from(format!("#{}", r.get("id").and_then(Value::primitive_string).unwrap_or_default()))
        });
        let columns = ColumnDefinitionBuilder::new()
            .columns_before(vec![before])
            .columns_after(vec![after])
            .build(&keys, &schema)
            .unwrap();

        let all = ids(&columns);
        assert_eq!(&all[..2], &["select", "drag"]);
        assert_eq!(&all[all.len() - 2..], &["label", "actions"]);
        assert_eq!(columns[1].pin, Some(Pin::Leading));
        assert_eq!(columns[all.len() - 2].pin, Some(Pin::Trailing));

        let record = records_from_json_value(json!([{ "id": 7 }])).unwrap().remove(0);
        assert_eq!(columns[all.len() - 2].value(&record), Value::from("#7"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let (keys, schema) = fixture();
        let clash = ColumnDefinition::display("name", "Name", renderer(|_| CellDisplay::Empty));
        let err = ColumnDefinitionBuilder::new()
            .columns_after(vec![clash])
            .build(&keys, &schema)
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(id) if id == "name"));
    }

    #[test]
    fn test_controls_disabled() {
        let (keys, schema) = fixture();
        let columns = ColumnDefinitionBuilder::new()
            .show_controls(false)
            .build(&keys, &schema)
            .unwrap();
        assert!(columns.iter().all(|c| !c.sortable && !c.hideable && !c.filterable));
        assert_eq!(columns[3].filter_kind, Some(FieldKind::Select));
    }

    #[test]
    fn test_custom_renderer_wins() {
        let (keys, schema) = fixture();
        let columns = ColumnDefinitionBuilder::new()
            .renderer("name", renderer(|ctx| CellDisplay::Text(format!("<{}>", ctx.formatter.preview(ctx.value)))))
            .build(&keys, &schema)
            .unwrap();

        let record = records_from_json_value(json!([{ "name": "Alpha" }])).unwrap().remove(0);
        let formatter = crate::preview::PreviewFormatter::default();
        let value = columns[2].value(&record);
        let ctx = CellContext {
            row_id: "0",
            row_index: 0,
            column_id: "name",
            value: &value,
            record: &record,
            selected: false,
            formatter: &formatter,
        };
        assert_eq!((columns[2].renderer)(&ctx), CellDisplay::Text("<Alpha>".to_string()));
    }
}
