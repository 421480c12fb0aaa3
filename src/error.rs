//! Error type shared by every SmartTable module.
//!
//! Engine-local failures are configuration failures: an override naming an
//! unknown kind, a filter value that does not fit its column, a duplicate
//! column id. Predicates and row models never fail.

/// Errors reported by SmartTable.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// An override named a filter kind that does not exist.
    #[error("Unknown filter kind '{kind}' for field '{field}' (expected one of search, select, number, year, date)")]
    UnknownFieldKind { field: String, kind: String },

    /// An override is well-formed JSON but contradicts itself.
    #[error("Invalid override for field '{field}': {reason}")]
    InvalidOverride { field: String, reason: String },

    /// Two columns ended up with the same id.
    #[error("Duplicate column id '{0}'")]
    DuplicateColumn(String),

    /// A state slice referenced a column that is not part of the table.
    #[error("Column '{0}' not found in table")]
    UnknownColumn(String),

    /// A filter was set on a column that does not accept filters.
    #[error("Column '{0}' is not filterable")]
    NotFilterable(String),

    /// A sort key named a column that cannot be sorted.
    #[error("Column '{0}' is not sortable")]
    NotSortable(String),

    /// A filter value does not match the kind of its column.
    #[error("Filter for column '{column}' has kind {actual}, expected {expected}")]
    FilterKindMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A textual filter could not be parsed for its column.
    #[error("Invalid filter for column '{column}': {reason}")]
    InvalidFilter { column: String, reason: String },

    /// An input document was not an array of records.
    #[error("Record at index {0} is not an object")]
    InvalidRecord(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Exported CSV is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    /// Creates an unknown field kind error.
    pub fn unknown_kind(field: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnknownFieldKind {
            field: field.into(),
            kind: kind.into(),
        }
    }

    /// Creates an invalid override error.
    pub fn invalid_override(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOverride {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_field() {
        let err = TableError::unknown_kind("status", "dropdown");
        let msg = err.to_string();
        assert!(msg.contains("dropdown"));
        assert!(msg.contains("status"));

        let err = TableError::FilterKindMismatch {
            column: "age".to_string(),
            expected: "number",
            actual: "search",
        };
        assert_eq!(
            err.to_string(),
            "Filter for column 'age' has kind search, expected number"
        );
    }
}
