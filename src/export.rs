//! CSV export.
//!
//! Export works on the filtered, sorted row set before pagination. The
//! header is the union of record keys in order of first appearance, minus
//! the blacklisted synthetic columns. Data cells are always quoted.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::value::{to_iso_string, Record, Value};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// One row flattened to strings, keyed by exported field.
pub type ExportRecord = IndexMap<String, String>;

/// Replaces the built-in CSV path entirely.
pub type ExportHandler = Rc<dyn Fn(&[Record])>;

/// String form of a cell in the export.
pub fn serialize_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Date(d) => to_iso_string(d),
        Value::List(_) | Value::Object(_) => value.to_json_string().unwrap_or_default(),
        other => other.primitive_string().unwrap_or_default(),
    }
}

/// Union of non-blacklisted keys, in order of first appearance.
pub fn export_header(rows: &[Record], blacklist: &[String]) -> Vec<String> {
    let keys: IndexSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
    keys.into_iter()
        .filter(|k| !blacklist.contains(k))
        .cloned()
        .collect()
}

/// Flattens rows against a header; missing fields become empty strings.
pub fn flatten(rows: &[Record], header: &[String]) -> Vec<ExportRecord> {
    rows.iter()
        .map(|row| {
            header
                .iter()
                .map(|key| {
                    let cell = row.get(key).map(serialize_cell).unwrap_or_default();
                    (key.clone(), cell)
                })
                .collect()
        })
        .collect()
}

/// Renders rows as CSV text. An empty row set yields an empty string.
///
/// # Examples
///
/// ```
/// use smarttable::{records_from_json_value, to_csv};
/// use serde_json::json;
///
/// let rows = records_from_json_value(json!([
///     { "id": 1, "name": "A,B", "note": null },
///     { "id": 2, "name": "C", "note": { "x": 1 } },
/// ])).unwrap();
///
/// assert_eq!(
///     to_csv(&rows, &[]).unwrap(),
///     "id,name,note\n\"1\",\"A,B\",\"\"\n\"2\",\"C\",\"{\"\"x\"\":1}\""
/// );
/// ```
pub fn to_csv(rows: &[Record], blacklist: &[String]) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let header = export_header(rows, blacklist);
    let mut buf = Vec::new();
    write_csv(&mut buf, &header, &flatten(rows, &header))?;
    let mut text = String::from_utf8(buf)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Writes a header row followed by fully quoted data rows, `\n` terminated.
pub fn write_csv<W: Write>(out: W, header: &[String], records: &[ExportRecord]) -> Result<()> {
    let mut head = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    head.write_record(header)?;
    let out = head.into_inner().map_err(|e| TableError::Io(e.into_error()))?;

    let mut body = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    for record in records {
        body.write_record(record.values())?;
    }
    body.flush()?;
    Ok(())
}

/// A CSV document ready to be handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvArtifact {
    pub filename: String,
    pub mime_type: String,
    pub content: String,
}

impl CsvArtifact {
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        out.write_all(self.content.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No rows: nothing was produced.
    Empty,
    Csv(CsvArtifact),
    /// A host handler received the rows instead.
    Delegated { rows: usize },
}

/// Export settings plus an optional host handler.
#[derive(Clone)]
pub struct Exporter {
    pub blacklist: Vec<String>,
    pub filename: String,
    pub mime_type: String,
    handler: Option<ExportHandler>,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("blacklist", &self.blacklist)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

impl Exporter {
    pub fn from_config(config: &TableConfig) -> Self {
        Exporter {
            blacklist: config.export_blacklist.clone(),
            filename: config.export_filename.clone(),
            mime_type: CSV_MIME_TYPE.to_string(),
            handler: None,
        }
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Record]) + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }

    pub fn set_handler(&mut self, handler: Option<ExportHandler>) {
        self.handler = handler;
    }

    pub fn export(&self, rows: &[Record]) -> Result<ExportOutcome> {
        if let Some(handler) = &self.handler {
            debug!("Delegating export of {} row(s) to host handler", rows.len());
            handler(rows);
            return Ok(ExportOutcome::Delegated { rows: rows.len() });
        }
        if rows.is_empty() {
            info!("Nothing to export");
            return Ok(ExportOutcome::Empty);
        }

        let content = to_csv(rows, &self.blacklist)?;
        debug!("Exported {} row(s), {} byte(s)", rows.len(), content.len());
        Ok(ExportOutcome::Csv(CsvArtifact {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{parse_date, records_from_json_value};
    use serde_json::json;
    use std::cell::Cell;

    fn rows(data: serde_json::Value) -> Vec<Record> {
        records_from_json_value(data).unwrap()
    }

    #[test]
    fn test_csv_scenario() {
        let data = rows(json!([
            { "id": 1, "name": "A,B", "note": null },
            { "id": 2, "name": "C", "note": { "x": 1 } },
        ]));
        assert_eq!(
            to_csv(&data, &[]).unwrap(),
            "id,name,note\n\"1\",\"A,B\",\"\"\n\"2\",\"C\",\"{\"\"x\"\":1}\""
        );
    }

    #[test]
    fn test_header_union_and_blacklist() {
        let data = rows(json!([
            { "id": 1, "select": true },
            { "id": 2, "extra": "x", "actions": "menu" },
        ]));
        let blacklist = vec!["select".to_string(), "actions".to_string()];
        assert_eq!(export_header(&data, &blacklist), vec!["id", "extra"]);
        assert_eq!(to_csv(&data, &blacklist).unwrap(), "id,extra\n\"1\",\"\"\n\"2\",\"x\"");
    }

    #[test]
    fn test_cell_serialization() {
        assert_eq!(serialize_cell(&Value::Null), "");
        assert_eq!(serialize_cell(&Value::Float(2.0)), "2");
        assert_eq!(serialize_cell(&Value::from(json!(["a", 1]))), r#"["a",1]"#);
        let date = parse_date("2024-05-06T07:08:09Z").unwrap();
        assert_eq!(serialize_cell(&Value::Date(date)), "2024-05-06T07:08:09.000Z");
        assert_eq!(serialize_cell(&Value::from("say \"hi\"")), "say \"hi\"");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let data = rows(json!([{ "q": "say \"hi\"\nbye" }]));
        assert_eq!(to_csv(&data, &[]).unwrap(), "q\n\"say \"\"hi\"\"\nbye\"");
    }

    #[test]
    fn test_exporter_outcomes() {
        let exporter = Exporter::default();
        assert_eq!(exporter.export(&[]).unwrap(), ExportOutcome::Empty);

        let data = rows(json!([{ "id": 1 }]));
        match exporter.export(&data).unwrap() {
            ExportOutcome::Csv(artifact) => {
                assert_eq!(artifact.filename, "export.csv");
                assert_eq!(artifact.mime_type, CSV_MIME_TYPE);
                assert_eq!(artifact.content, "id\n\"1\"");
                let mut out = Vec::new();
                artifact.write_to(&mut out).unwrap();
                assert_eq!(out, b"id\n\"1\"");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_handler_replaces_default_path() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let exporter = Exporter::default().with_handler(move |rows| seen.set(seen.get() + rows.len()));

        let data = rows(json!([{ "id": 1 }, { "id": 2 }]));
        assert_eq!(exporter.export(&data).unwrap(), ExportOutcome::Delegated { rows: 2 });
        assert_eq!(calls.get(), 2);
    }
}
