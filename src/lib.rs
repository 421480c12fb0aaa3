//! SmartTable - Adaptive Tabular Data Engine
//!
//! Turns an array of loosely-typed records into a filterable, sortable,
//! paginated and selectable table. Field kinds and filter options are
//! inferred from the data; the visible rows are a pure function of the data
//! snapshot and the table state.
//!
//! ```
//! use smarttable::{records_from_json_value, DataTable, FieldKind};
//! use serde_json::json;
//!
//! let data = records_from_json_value(json!([
//!     { "id": 1, "status": "open", "year": 2021 },
//!     { "id": 2, "status": "closed", "year": 2023 },
//! ])).unwrap();
//!
//! let table = DataTable::new(data).unwrap();
//! assert_eq!(table.schema()[1].kind, FieldKind::Select);
//! assert_eq!(table.schema()[2].kind, FieldKind::Year);
//! assert_eq!(table.row_model().page_rows().len(), 2);
//! ```

pub mod value;
pub mod error;
pub mod config;
pub mod preview;
pub mod schema;
pub mod filter;
pub mod render;
pub mod columns;
pub mod state;
pub mod selection;
pub mod reorder;
pub mod export;
pub mod engine;

pub use value::{parse_date, records_from_json, records_from_json_value, to_iso_string, Record, Value};
pub use error::{Result, TableError};
pub use config::{TableConfig, TableOptions};
pub use preview::{preview, PreviewFormatter};
pub use schema::{
    parse_overrides, title_case, DateMode, FieldDescriptor, FieldKind, FieldOverride, FieldOverrides, FilterOption,
    SchemaInferencer,
};
pub use filter::{DateFilter, FilterFn, FilterValue, NumberCondition, NumberFilter};
pub use render::{
    renderer, ActionKind, CellContext, CellDisplay, CellRenderer, ExtraAction, MenuItem, RowAction, RowActions,
    StatusBadge,
};
pub use columns::{Accessor, ColumnDefinition, ColumnDefinitionBuilder, Pin};
pub use state::{
    ColumnFilters, ColumnSort, PaginationState, RowSelection, SortDirection, SortingState, TableState,
    VisibilityState,
};
pub use selection::SelectionSynchronizer;
pub use reorder::{move_item, moved, DragSession};
pub use export::{to_csv, CsvArtifact, ExportOutcome, Exporter};
pub use engine::{DataTable, DataTableBuilder, Facets, FilterBarItem, RowModel, TableRow};
