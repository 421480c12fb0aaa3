//! Engine configuration.
//!
//! `TableConfig` holds the knobs shared by every stage (id field, page sizes,
//! date format, categorical thresholds, export defaults). `TableOptions` holds
//! the per-table layout flags a host passes alongside its data. Both
//! deserialize from JSON with every field optional.

use crate::error::Result;
use crate::schema::FieldOverrides;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 5] = [10, 20, 30, 40, 50];
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";
pub const DEFAULT_EXPORT_FILENAME: &str = "export.csv";

/// Shared engine settings.
///
/// # Examples
///
/// ```
/// use smarttable::TableConfig;
///
/// let config = TableConfig::from_json(r#"{ "page_size": 25, "id_field": "uuid" }"#).unwrap();
/// assert_eq!(config.page_size, 25);
/// assert_eq!(config.id_field, "uuid");
/// assert_eq!(config.select_max_options, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Field holding each record's stable identifier.
    pub id_field: String,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    /// `strftime` pattern used for locale date previews.
    pub date_format: String,
    /// A field is categorical when it has at most this many distinct previews...
    pub select_max_options: usize,
    /// ...and none of them is longer than this.
    pub select_max_label_len: usize,
    /// Object previews longer than this are truncated.
    pub preview_max_len: usize,
    pub export_filename: String,
    /// Columns never written to CSV.
    pub export_blacklist: Vec<String>,
    /// Pins the year used by year detection; the clock is used when unset.
    pub current_year: Option<i32>,
    /// Shown by hosts when the visible row set is empty.
    pub empty_message: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            id_field: "id".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            select_max_options: 10,
            select_max_label_len: 30,
            preview_max_len: 40,
            export_filename: DEFAULT_EXPORT_FILENAME.to_string(),
            export_blacklist: vec!["actions".to_string(), "select".to_string()],
            current_year: None,
            empty_message: "No results.".to_string(),
        }
    }
}

impl TableConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }
}

/// Per-table layout flags and field overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Adds the leading row-selection checkbox column.
    pub show_select: bool,
    /// Adds the trailing row-actions column.
    pub show_actions: bool,
    /// Enables sorting, filtering and hiding on data columns.
    pub show_controls: bool,
    pub column_order: Option<Vec<String>>,
    pub hidden_columns: Vec<String>,
    /// Restricts the filter bar to these fields.
    pub visible_filters: Option<Vec<String>>,
    pub overrides: FieldOverrides,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            show_select: true,
            show_actions: true,
            show_controls: true,
            column_order: None,
            hidden_columns: Vec::new(),
            visible_filters: None,
            overrides: FieldOverrides::new(),
        }
    }
}

impl TableOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
