//! The table engine.
//!
//! A `DataTable` owns one data snapshot, the schema and columns derived from
//! it, and the user-driven `TableState`. The visible row set is never
//! stored: `row_model()` recomputes it from `(data, state)` on demand, so
//! identical inputs always produce identical output.
//!
//! ```text
//! rows -> column filters (AND) -> multi-key stable sort -> facets -> page
//! ```

use crate::columns::{ColumnDefinition, ColumnDefinitionBuilder, ACTIONS_COLUMN_ID, SELECT_COLUMN_ID};
use crate::config::{TableConfig, TableOptions};
use crate::error::{Result, TableError};
use crate::export::{to_csv, ExportHandler, ExportOutcome, Exporter};
use crate::filter::FilterValue;
use crate::preview::PreviewFormatter;
use crate::render::{CellContext, CellDisplay, CellRenderer, RowActions};
use crate::reorder::move_item;
use crate::schema::{FieldDescriptor, FieldOverride, SchemaInferencer};
use crate::selection::SelectionSynchronizer;
use crate::state::{
    compare_cells, reconcile_order, reconcile_visibility, toggle_sort, ColumnFilters, PaginationState,
    RowSelection, SortingState, TableState, VisibilityState,
};
use crate::value::{Record, Value};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

/// A row as seen by one pass of the row model.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow<'a> {
    /// The declared id, or `row-{index}` when the record has none.
    pub id: String,
    /// Position in the table's local row order.
    pub index: usize,
    pub record: &'a Record,
    pub selected: bool,
}

/// Per-column value counts over the filtered rows, plus selection counts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Facets {
    pub unique_values: IndexMap<String, IndexMap<String, usize>>,
    /// Selected rows among the filtered rows.
    pub selected: usize,
    /// Filtered rows.
    pub total: usize,
}

impl Facets {
    pub fn unique_values(&self, column_id: &str) -> Option<&IndexMap<String, usize>> {
        self.unique_values.get(column_id)
    }
}

/// Output of one pipeline pass.
#[derive(Debug, Clone)]
pub struct RowModel<'a> {
    /// Filtered and sorted, before pagination.
    pub rows: Vec<TableRow<'a>>,
    pub page: Range<usize>,
    pub page_count: usize,
    pub facets: Facets,
    /// Rows before filtering.
    pub total_rows: usize,
}

impl<'a> RowModel<'a> {
    pub fn page_rows(&self) -> &[TableRow<'a>] {
        &self.rows[self.page.clone()]
    }

    pub fn filtered_rows(&self) -> &[TableRow<'a>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One entry of the filter bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBarItem {
    pub descriptor: FieldDescriptor,
    pub value: Option<FilterValue>,
    /// Chip label of the active value.
    pub label: Option<String>,
}

type SelectionCallback = Box<dyn FnMut(&[String])>;

/// Configures and builds a [`DataTable`].
pub struct DataTableBuilder {
    config: TableConfig,
    options: TableOptions,
    renderers: IndexMap<String, CellRenderer>,
    before: Vec<ColumnDefinition>,
    after: Vec<ColumnDefinition>,
    row_actions: RowActions,
    on_selection_change: Option<SelectionCallback>,
    initial_selection: Vec<String>,
    export_handler: Option<ExportHandler>,
    state: Option<TableState>,
}

impl Default for DataTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataTableBuilder {
    pub fn new() -> Self {
        DataTableBuilder {
            config: TableConfig::default(),
            options: TableOptions::default(),
            renderers: IndexMap::new(),
            before: Vec::new(),
            after: Vec::new(),
            row_actions: RowActions::default(),
            on_selection_change: None,
            initial_selection: Vec::new(),
            export_handler: None,
            state: None,
        }
    }

    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn override_field(mut self, field: impl Into<String>, field_override: FieldOverride) -> Self {
        self.options.overrides.insert(field.into(), field_override);
        self
    }

    pub fn renderer(mut self, field: impl Into<String>, renderer: CellRenderer) -> Self {
        self.renderers.insert(field.into(), renderer);
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

    pub fn row_actions(mut self, actions: RowActions) -> Self {
        self.row_actions = actions;
        self
    }

    pub fn on_selection_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[String]) + 'static,
    {
        self.on_selection_change = Some(Box::new(callback));
        self
    }

    pub fn initial_selection(mut self, ids: Vec<String>) -> Self {
        self.initial_selection = ids;
        self
    }

    pub fn export_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Record]) + 'static,
    {
        self.export_handler = Some(Rc::new(handler));
        self
    }

    /// Restores a previously captured state snapshot.
    pub fn state(mut self, state: TableState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self, data: impl Into<Rc<Vec<Record>>>) -> Result<DataTable> {
        let data = data.into();
        let mut exporter = Exporter::from_config(&self.config);
        exporter.set_handler(self.export_handler);

        let mut table = DataTable {
            formatter: PreviewFormatter::from_config(&self.config),
            inferencer: SchemaInferencer::new(&self.config),
            column_builder: ColumnDefinitionBuilder::new(),
            renderers: self.renderers,
            before: self.before,
            after: self.after,
            row_actions: self.row_actions,
            row_order: (0..data.len()).collect(),
            data,
            schema: Rc::new(Vec::new()),
            columns: Vec::new(),
            state: TableState {
                pagination: PaginationState::new(self.config.page_size),
                ..TableState::default()
            },
            selection: SelectionSynchronizer::new(),
            on_selection_change: self.on_selection_change,
            exporter,
            options: self.options,
            config: self.config,
        };
        table.column_builder = table.make_column_builder();
        table.rebuild()?;

        if let Some(state) = self.state {
            table.set_state(state)?;
        }
        if !self.initial_selection.is_empty() {
            table.set_initial_selection(&self.initial_selection);
        }
        Ok(table)
    }
}

/// Single-threaded table engine over one data snapshot.
///
/// # Examples
///
/// ```
/// use smarttable::{records_from_json_value, ColumnSort, DataTable, FilterValue};
/// use serde_json::json;
///
/// let data = records_from_json_value(json!([
///     { "id": 1, "name": "Alice", "team": "Ops" },
///     { "id": 2, "name": "Bob", "team": "Dev" },
///     { "id": 3, "name": "Cara", "team": "Ops" },
/// ])).unwrap();
///
/// let mut table = DataTable::new(data).unwrap();
/// table.set_filter("team", FilterValue::Select(vec!["ops".into()])).unwrap();
/// table.set_sorting(vec![ColumnSort::desc("name")]).unwrap();
///
/// let ids: Vec<String> = table.row_model().page_rows().iter().map(|r| r.id.clone()).collect();
/// assert_eq!(ids, vec!["3", "1"]);
/// ```
pub struct DataTable {
    config: TableConfig,
    options: TableOptions,
    formatter: PreviewFormatter,
    inferencer: SchemaInferencer,
    column_builder: ColumnDefinitionBuilder,
    renderers: IndexMap<String, CellRenderer>,
    before: Vec<ColumnDefinition>,
    after: Vec<ColumnDefinition>,
    row_actions: RowActions,
    data: Rc<Vec<Record>>,
    /// Indices into `data` in local display order.
    row_order: Vec<usize>,
    schema: Rc<Vec<FieldDescriptor>>,
    columns: Vec<ColumnDefinition>,
    state: TableState,
    selection: SelectionSynchronizer,
    on_selection_change: Option<SelectionCallback>,
    exporter: Exporter,
}

impl fmt::Debug for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTable")
            .field("rows", &self.data.len())
            .field("schema", &self.schema)
            .field("columns", &self.columns.iter().map(|c| &c.id).collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DataTable {
    pub fn builder() -> DataTableBuilder {
        DataTableBuilder::new()
    }

    pub fn new(data: impl Into<Rc<Vec<Record>>>) -> Result<Self> {
        DataTableBuilder::new().build(data)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn formatter(&self) -> &PreviewFormatter {
        &self.formatter
    }

    pub fn data(&self) -> &Rc<Vec<Record>> {
        &self.data
    }

    pub fn schema(&self) -> &[FieldDescriptor] {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Shown by hosts when the row model is empty.
    pub fn empty_message(&self) -> &str {
        &self.config.empty_message
    }

    fn make_column_builder(&self) -> ColumnDefinitionBuilder {
        let mut builder = ColumnDefinitionBuilder::new()
            .renderers(self.renderers.clone())
            .columns_before(self.before.clone())
            .columns_after(self.after.clone())
            .hidden_columns(self.options.hidden_columns.clone())
            .show_select(self.options.show_select)
            .show_controls(self.options.show_controls)
            .row_actions(self.options.show_actions.then(|| self.row_actions.clone()));
        if let Some(order) = &self.options.column_order {
            builder = builder.column_order(order.clone());
        }
        builder
    }

    /// Recomputes schema and columns for the current data and options, then
    /// reconciles every state slice against them. Nothing is committed when
    /// inference or column building fails.
    fn rebuild(&mut self) -> Result<()> {
        let schema = self.inferencer.infer(&self.data, &self.options.overrides)?;
        let keys: Vec<String> = self
            .data
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let columns = self.column_builder.build(&keys, &schema)?;

        self.schema = Rc::new(schema);
        self.columns = columns;
        self.reconcile();
        Ok(())
    }

    fn reconcile(&mut self) {
        self.state.column_visibility =
            reconcile_visibility(&self.state.column_visibility, &self.columns, &self.options.hidden_columns);
        self.state.column_order = reconcile_order(&self.state.column_order, &self.columns);

        let columns = &self.columns;
        self.state.sorting.retain(|s| {
            let keep = columns.iter().any(|c| c.id == s.column_id && c.sortable);
            if !keep {
                debug!("Dropping sort on missing column '{}'", s.column_id);
            }
            keep
        });
        self.state.column_filters.retain(|id, value| {
            let keep = columns
                .iter()
                .any(|c| &c.id == id && c.filterable && c.filter_kind == Some(value.kind()));
            if !keep {
                debug!("Dropping filter on column '{}'", id);
            }
            keep
        });

        let valid = self.row_id_set();
        let before = self.state.row_selection.len();
        self.state.row_selection.retain(|id| valid.contains(id));
        if self.state.row_selection.len() != before {
            debug!("Dropped {} stale selected id(s)", before - self.state.row_selection.len());
        }
        self.emit_selection();
    }

    /// Replaces the data snapshot. The schema is only recomputed when the
    /// snapshot is a different allocation; returns whether it was.
    pub fn set_data(&mut self, data: impl Into<Rc<Vec<Record>>>) -> Result<bool> {
        let data = data.into();
        if Rc::ptr_eq(&data, &self.data) {
            trace!("set_data: same snapshot, nothing to do");
            return Ok(false);
        }
        let previous = std::mem::replace(&mut self.data, data);
        let previous_order = std::mem::replace(&mut self.row_order, (0..self.data.len()).collect());
        if let Err(e) = self.rebuild() {
            warn!("Rejected data snapshot: {}", e);
            self.data = previous;
            self.row_order = previous_order;
            return Err(e);
        }
        debug!("Loaded {} record(s), {} column(s)", self.data.len(), self.columns.len());
        Ok(true)
    }

    /// Replaces layout options and overrides, recomputing schema and columns.
    pub fn set_options(&mut self, options: TableOptions) -> Result<()> {
        let previous = std::mem::replace(&mut self.options, options);
        let builder = self.make_column_builder();
        let previous_builder = std::mem::replace(&mut self.column_builder, builder);
        if let Err(e) = self.rebuild() {
            self.options = previous;
            self.column_builder = previous_builder;
            return Err(e);
        }
        Ok(())
    }

    pub fn on_selection_change<F>(&mut self, callback: F)
    where
        F: FnMut(&[String]) + 'static,
    {
        self.on_selection_change = Some(Box::new(callback));
    }

    pub fn set_export_handler(&mut self, handler: Option<ExportHandler>) {
        self.exporter.set_handler(handler);
    }

    fn row_id(&self, record: &Record, position: usize) -> String {
        match record.get(&self.config.id_field) {
            Some(Value::Null) | None => format!("row-{}", position),
            Some(v) => v.primitive_string().unwrap_or_else(|| self.formatter.preview(v)),
        }
    }

    /// Row ids in local display order.
    pub fn row_ids(&self) -> Vec<String> {
        self.row_order
            .iter()
            .enumerate()
            .map(|(pos, &i)| self.row_id(&self.data[i], pos))
            .collect()
    }

    fn row_id_set(&self) -> IndexSet<String> {
        self.row_ids().into_iter().collect()
    }

    /// Runs the pipeline against the current data and state.
    pub fn row_model(&self) -> RowModel<'_> {
        let formatter = &self.formatter;
        let all: Vec<TableRow<'_>> = self
            .row_order
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let record = &self.data[i];
                let id = self.row_id(record, pos);
                TableRow {
                    selected: self.state.row_selection.contains(&id),
                    id,
                    index: pos,
                    record,
                }
            })
            .collect();
        let total_rows = all.len();

        let filters: Vec<(&ColumnDefinition, &FilterValue)> = self
            .state
            .column_filters
            .iter()
            .filter_map(|(id, value)| self.column(id).map(|c| (c, value)))
            .collect();
        let mut rows: Vec<TableRow<'_>> = all
            .into_iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, value)| value.matches(&column.value(row.record), formatter))
            })
            .collect();

        let keys: Vec<(&ColumnDefinition, _)> = self
            .state
            .sorting
            .iter()
            .filter_map(|s| self.column(&s.column_id).map(|c| (c, s.direction)))
            .collect();
        if !keys.is_empty() {
            let mut keyed: Vec<(Vec<Value>, TableRow<'_>)> = rows
                .into_iter()
                .map(|row| (keys.iter().map(|(c, _)| c.value(row.record)).collect(), row))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                keys.iter()
                    .zip(a.iter().zip(b.iter()))
                    .map(|((_, direction), (x, y))| compare_cells(x, y, *direction, formatter))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }
        trace!(
            "Row model: {} of {} row(s) after {} filter(s), {} sort key(s)",
            rows.len(),
            total_rows,
            filters.len(),
            keys.len()
        );

        let facets = self.facets(&rows);
        let pagination = self.state.pagination;
        let (start, end) = pagination.bounds(rows.len());

        RowModel {
            page_count: pagination.page_count(rows.len()),
            page: start..end,
            facets,
            total_rows,
            rows,
        }
    }

    fn facets(&self, rows: &[TableRow<'_>]) -> Facets {
        let unique_values = self
            .columns
            .iter()
            .filter(|c| !c.is_synthetic())
            .map(|column| {
                let mut counts: IndexMap<String, usize> = IndexMap::new();
                for row in rows {
                    let value = column.value(row.record);
                    let values = match value {
                        Value::List(items) => items,
                        other => vec![other],
                    };
                    for v in &values {
                        *counts.entry(self.formatter.preview(v)).or_insert(0) += 1;
                    }
                }
                (column.id.clone(), counts)
            })
            .collect();

        Facets {
            unique_values,
            selected: rows.iter().filter(|r| r.selected).count(),
            total: rows.len(),
        }
    }

    /// Renders one cell through its column's renderer.
    pub fn render_cell(&self, row: &TableRow<'_>, column: &ColumnDefinition) -> CellDisplay {
        let value = column.value(row.record);
        let ctx = CellContext {
            row_id: &row.id,
            row_index: row.index,
            column_id: &column.id,
            value: &value,
            record: row.record,
            selected: row.selected,
            formatter: &self.formatter,
        };
        (column.renderer)(&ctx)
    }

    // ---- state setters: each replaces exactly one slice ----

    /// Restores a whole snapshot. Sorting and filters are validated first;
    /// on error no slice is touched.
    pub fn set_state(&mut self, state: TableState) -> Result<()> {
        let sorting = self.checked_sorting(state.sorting)?;
        let filters = self.checked_filters(state.column_filters)?;
        self.state.sorting = sorting;
        self.state.column_filters = filters;
        self.set_pagination(state.pagination);
        self.set_column_visibility(state.column_visibility);
        self.set_column_order(state.column_order);
        self.set_row_selection(state.row_selection);
        Ok(())
    }

    pub fn set_sorting(&mut self, sorting: SortingState) -> Result<()> {
        self.state.sorting = self.checked_sorting(sorting)?;
        Ok(())
    }

    /// Drops repeated keys; an unknown or unsortable column is an error.
    fn checked_sorting(&self, sorting: SortingState) -> Result<SortingState> {
        let mut deduped: SortingState = Vec::with_capacity(sorting.len());
        for key in sorting {
            match self.column(&key.column_id) {
                None => return Err(TableError::UnknownColumn(key.column_id)),
                Some(c) if !c.sortable => return Err(TableError::NotSortable(key.column_id)),
                Some(_) => {}
            }
            if !deduped.iter().any(|k| k.column_id == key.column_id) {
                deduped.push(key);
            }
        }
        Ok(deduped)
    }

    /// Replaces all column filters. Values that cannot exclude anything are
    /// dropped; a value for an unknown or non-filterable column, or of the
    /// wrong kind, rejects the whole update.
    pub fn set_column_filters(&mut self, filters: ColumnFilters) -> Result<()> {
        self.state.column_filters = self.checked_filters(filters)?;
        Ok(())
    }

    fn checked_filters(&self, filters: ColumnFilters) -> Result<ColumnFilters> {
        for (id, value) in &filters {
            self.check_filter(id, value).inspect_err(|e| warn!("{}", e))?;
        }
        Ok(filters.into_iter().filter(|(_, v)| v.is_active()).collect())
    }

    fn check_filter(&self, id: &str, value: &FilterValue) -> Result<()> {
        let column = self
            .column(id)
            .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?;
        if !column.filterable {
            return Err(TableError::NotFilterable(id.to_string()));
        }
        match column.filter_kind {
            Some(kind) if kind == value.kind() => Ok(()),
            Some(kind) => Err(TableError::FilterKindMismatch {
                column: id.to_string(),
                expected: kind.as_str(),
                actual: value.kind().as_str(),
            }),
            None => Err(TableError::NotFilterable(id.to_string())),
        }
    }

    pub fn set_pagination(&mut self, pagination: PaginationState) {
        self.state.pagination = PaginationState {
            page_index: pagination.page_index,
            page_size: pagination.page_size.max(1),
        };
    }

    /// Replaces visibility. Unknown ids are dropped, missing ids default to
    /// visible and non-hideable columns stay visible.
    pub fn set_column_visibility(&mut self, visibility: VisibilityState) {
        self.state.column_visibility = reconcile_visibility(&visibility, &self.columns, &[]);
    }

    /// Replaces the column order, normalized to a permutation of the column ids.
    pub fn set_column_order(&mut self, order: Vec<String>) {
        self.state.column_order = reconcile_order(&order, &self.columns);
    }

    /// Replaces the selection. Ids not present in the data are dropped.
    pub fn set_row_selection(&mut self, selection: RowSelection) {
        let valid = self.row_id_set();
        self.state.row_selection = selection.into_iter().filter(|id| valid.contains(id)).collect();
        self.emit_selection();
    }

    fn emit_selection(&mut self) {
        if let Some(ids) = self.selection.observe(&self.state.row_selection) {
            if let Some(callback) = self.on_selection_change.as_mut() {
                callback(&ids);
            }
        }
    }

    /// Applies the host's selected-id input. A list equal to the previous
    /// input, or to the current selection, writes nothing.
    pub fn set_initial_selection(&mut self, ids: &[String]) {
        if let Some(next) = self.selection.bulk_set(&self.state.row_selection, ids) {
            self.set_row_selection(next);
        }
    }

    // ---- sorting and filtering conveniences ----

    /// Cycles a column through asc, desc and unsorted, then returns to the
    /// first page.
    pub fn toggle_sorting(&mut self, column_id: &str, multi: bool) -> Result<()> {
        let next = toggle_sort(&self.state.sorting, column_id, multi);
        self.set_sorting(next)?;
        self.first_page();
        Ok(())
    }

    /// Sets one filter, keeping the others, then returns to the first page.
    pub fn set_filter(&mut self, column_id: &str, value: FilterValue) -> Result<()> {
        let mut filters = self.state.column_filters.clone();
        filters.insert(column_id.to_string(), value);
        self.set_column_filters(filters)?;
        self.first_page();
        Ok(())
    }

    pub fn clear_filter(&mut self, column_id: &str) {
        if self.state.column_filters.shift_remove(column_id).is_some() {
            self.first_page();
        }
    }

    pub fn reset_column_filters(&mut self) {
        self.state.column_filters.clear();
        self.first_page();
    }

    pub fn is_filtered(&self) -> bool {
        !self.state.column_filters.is_empty()
    }

    /// Filter bar entries in schema order, narrowed to `visible_filters` when
    /// set, and limited to fields whose column accepts filters.
    pub fn filter_bar(&self) -> Vec<FilterBarItem> {
        self.schema
            .iter()
            .filter(|d| {
                self.options
                    .visible_filters
                    .as_ref()
                    .map_or(true, |keys| keys.contains(&d.key))
            })
            .filter(|d| self.column(&d.key).is_some_and(|c| c.filterable))
            .map(|d| {
                let value = self.state.column_filters.get(&d.key).cloned();
                FilterBarItem {
                    label: value.as_ref().and_then(FilterValue::summary),
                    descriptor: d.clone(),
                    value,
                }
            })
            .collect()
    }

    // ---- pagination conveniences ----

    pub fn page_count(&self) -> usize {
        self.row_model().page_count
    }

    pub fn can_previous_page(&self) -> bool {
        self.state.pagination.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.state.pagination.page_index + 1 < self.page_count()
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        let max = self.page_count().saturating_sub(1);
        self.set_pagination(PaginationState {
            page_index: page_index.min(max),
            ..self.state.pagination
        });
    }

    /// Changes the page size, keeping the first row of the current page in view.
    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        let top_row = self.state.pagination.page_index * self.state.pagination.page_size;
        self.set_pagination(PaginationState {
            page_index: top_row / page_size,
            page_size,
        });
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.config.page_size_options
    }

    pub fn first_page(&mut self) {
        self.set_page_index(0);
    }

    pub fn last_page(&mut self) {
        self.set_page_index(self.page_count().saturating_sub(1));
    }

    pub fn next_page(&mut self) -> bool {
        if !self.can_next_page() {
            return false;
        }
        self.set_page_index(self.state.pagination.page_index + 1);
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.can_previous_page() {
            return false;
        }
        self.set_page_index(self.state.pagination.page_index - 1);
        true
    }

    // ---- selection conveniences ----

    pub fn is_row_selected(&self, row_id: &str) -> bool {
        self.state.row_selection.contains(row_id)
    }

    pub fn set_row_selected(&mut self, row_id: &str, selected: bool) {
        let mut selection = self.state.row_selection.clone();
        if selected {
            selection.insert(row_id.to_string());
        } else {
            selection.remove(row_id);
        }
        self.set_row_selection(selection);
    }

    pub fn toggle_row_selected(&mut self, row_id: &str) {
        let selected = self.is_row_selected(row_id);
        self.set_row_selected(row_id, !selected);
    }

    pub fn is_all_page_rows_selected(&self) -> bool {
        let model = self.row_model();
        let page = model.page_rows();
        !page.is_empty() && page.iter().all(|r| r.selected)
    }

    pub fn toggle_all_page_rows_selected(&mut self, selected: bool) {
        let page_ids: Vec<String> = self.row_model().page_rows().iter().map(|r| r.id.clone()).collect();
        let mut selection = self.state.row_selection.clone();
        for id in page_ids {
            if selected {
                selection.insert(id);
            } else {
                selection.remove(&id);
            }
        }
        self.set_row_selection(selection);
    }

    pub fn reset_row_selection(&mut self) {
        self.set_row_selection(RowSelection::new());
    }

    /// Selected ids, sorted.
    pub fn selected_ids(&self) -> Vec<String> {
        self.state.row_selection.iter().cloned().collect()
    }

    /// Selected rows in local display order, regardless of filters.
    pub fn selected_rows(&self) -> Vec<&Record> {
        self.row_order
            .iter()
            .enumerate()
            .map(|(pos, &i)| (self.row_id(&self.data[i], pos), &self.data[i]))
            .filter(|(id, _)| self.state.row_selection.contains(id))
            .map(|(_, record)| record)
            .collect()
    }

    /// "n of m row(s) selected." over the filtered rows.
    pub fn selection_summary(&self) -> String {
        let facets = self.row_model().facets;
        format!("{} of {} row(s) selected.", facets.selected, facets.total)
    }

    // ---- visibility and ordering ----

    pub fn is_column_visible(&self, column_id: &str) -> bool {
        self.state.column_visibility.get(column_id).copied().unwrap_or(true)
    }

    pub fn toggle_column_visibility(&mut self, column_id: &str) -> Result<()> {
        let column = self
            .column(column_id)
            .ok_or_else(|| TableError::UnknownColumn(column_id.to_string()))?;
        if !column.hideable {
            debug!("Column '{}' cannot be hidden", column_id);
            return Ok(());
        }
        let mut visibility = self.state.column_visibility.clone();
        visibility.insert(column_id.to_string(), !self.is_column_visible(column_id));
        self.set_column_visibility(visibility);
        Ok(())
    }

    pub fn show_all_columns(&mut self) {
        let visibility = self.columns.iter().map(|c| (c.id.clone(), true)).collect();
        self.set_column_visibility(visibility);
    }

    /// Columns in display order, hidden ones left out.
    pub fn visible_columns(&self) -> Vec<&ColumnDefinition> {
        self.state
            .column_order
            .iter()
            .filter(|id| self.is_column_visible(id))
            .filter_map(|id| self.column(id))
            .collect()
    }

    /// Hideable columns a "view options" menu offers, with their visibility.
    pub fn hideable_columns(&self) -> Vec<(&ColumnDefinition, bool)> {
        self.columns
            .iter()
            .filter(|c| c.hideable && c.id != SELECT_COLUMN_ID && c.id != ACTIONS_COLUMN_ID)
            .map(|c| (c, self.is_column_visible(&c.id)))
            .collect()
    }

    /// Moves a row in the local order. Returns whether anything moved.
    pub fn move_row(&mut self, active_id: &str, over_id: &str) -> bool {
        let ids = self.row_ids();
        let (Some(from), Some(to)) = (
            ids.iter().position(|id| id == active_id),
            ids.iter().position(|id| id == over_id),
        ) else {
            return false;
        };
        let (active, over) = (self.row_order[from], self.row_order[to]);
        move_item(&mut self.row_order, &active, &over)
    }

    /// Moves a data column in `column_order`. Synthetic columns stay pinned.
    pub fn move_column(&mut self, active_id: &str, over_id: &str) -> bool {
        let movable = |id: &str| self.column(id).is_some_and(|c| !c.is_synthetic());
        if !movable(active_id) || !movable(over_id) {
            return false;
        }
        let mut order = self.state.column_order.clone();
        if !move_item(&mut order, &active_id.to_string(), &over_id.to_string()) {
            return false;
        }
        self.set_column_order(order);
        true
    }

    // ---- export ----

    /// Filtered and sorted records, ignoring pagination.
    pub fn export_rows(&self) -> Vec<Record> {
        self.row_model().rows.iter().map(|r| r.record.clone()).collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        to_csv(&self.export_rows(), &self.exporter.blacklist)
    }

    pub fn export(&self) -> Result<ExportOutcome> {
        self.exporter.export(&self.export_rows())
    }
}
