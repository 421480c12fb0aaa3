//! smarttable-export
//!
//! Loads a JSON array of records, applies filters and sorting, and writes the
//! result as CSV (or the inferred schema as JSON).

use clap::Parser;
use smarttable::{
    parse_overrides, records_from_json, ColumnSort, DataTable, ExportOutcome, FilterValue, TableConfig,
    TableError, TableOptions,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smarttable-export")]
#[command(about = "Filter, sort and export a JSON record array as CSV", long_about = None)]
struct Args {
    /// JSON file holding an array of records, or `-` for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Table configuration (JSON)
    #[arg(long, env = "SMARTTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Field overrides (JSON), e.g. {"status": {"type": "select"}}
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Column filter as COLUMN=EXPR; may be repeated
    #[arg(short, long = "filter", value_name = "COLUMN=EXPR")]
    filters: Vec<String>,

    /// Sort key, `-` prefix for descending; may be repeated
    #[arg(short, long = "sort", value_name = "COLUMN", allow_hyphen_values = true)]
    sort: Vec<String>,

    /// Print the inferred schema instead of exporting
    #[arg(long)]
    schema: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), TableError> {
    let config = match &args.config {
        Some(path) => TableConfig::from_json(&fs::read_to_string(path)?)?,
        None => TableConfig::default(),
    };
    let mut options = TableOptions::default();
    if let Some(path) = &args.overrides {
        options.overrides = parse_overrides(&fs::read_to_string(path)?)?;
    }

    let text = if args.input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input)?
    };
    let records = records_from_json(&text)?;
    log::info!("Read {} record(s) from {}", records.len(), args.input);

    let mut table = DataTable::builder().config(config).options(options).build(records)?;

    if args.schema {
        let json = serde_json::to_string_pretty(table.schema())?;
        return emit(args.output.as_ref(), json.as_bytes());
    }

    for arg in &args.filters {
        let (column, expr) = arg.split_once('=').ok_or_else(|| TableError::InvalidFilter {
            column: arg.clone(),
            reason: "expected COLUMN=EXPR".to_string(),
        })?;
        let kind = table
            .column(column)
            .and_then(|c| c.filter_kind)
            .ok_or_else(|| TableError::NotFilterable(column.to_string()))?;
        table.set_filter(column, FilterValue::parse(column, kind, expr)?)?;
    }

    let sorting = args
        .sort
        .iter()
        .map(|key| match key.strip_prefix('-') {
            Some(column) => ColumnSort::desc(column),
            None => ColumnSort::asc(key.as_str()),
        })
        .collect();
    table.set_sorting(sorting)?;

    match table.export()? {
        ExportOutcome::Csv(artifact) => {
            let mut content = artifact.content.into_bytes();
            content.push(b'\n');
            emit(args.output.as_ref(), &content)
        }
        _ => {
            eprintln!("{}", table.empty_message());
            Ok(())
        }
    }
}

fn emit(path: Option<&PathBuf>, bytes: &[u8]) -> Result<(), TableError> {
    match path {
        Some(path) => fs::write(path, bytes)?,
        None => io::stdout().lock().write_all(bytes)?,
    }
    Ok(())
}
