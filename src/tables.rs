//! Table files on disk.
//!
//! Inputs are read from `<dir>/<table>.json` (array of objects) or
//! `<dir>/<table>.csv` (header row, blank cells are null). Outputs are written
//! as CSV, pretty JSON or both.

use crate::errors::{InputError, OutputError};
use crate::raslog::record::InputTables;
use crate::raslog::table::Table;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ERRDUMP: &str = "errdump";
pub const SWITCHSHOW: &str = "switchshow";
pub const SWITCH_PARAMS: &str = "switch_params_aggregated";
pub const PORTSHOW: &str = "portshow_aggregated";

/// Output file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    /// Write both `.csv` and `.json`
    Both,
}

impl OutputFormat {
    fn extensions(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Csv => &["csv"],
            OutputFormat::Json => &["json"],
            OutputFormat::Both => &["csv", "json"],
        }
    }
}

/// Parsed input tables plus the raw bytes they came from, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct LoadedInputs {
    pub tables: InputTables,
    pub raw: Vec<(String, Vec<u8>)>,
}

pub async fn load_inputs(dir: &Path) -> Result<LoadedInputs, InputError> {
    let mut raw = Vec::new();

    let (path, bytes) = read_table(dir, ERRDUMP).await?;
    let errdump = parse_rows(ERRDUMP, &path, &bytes)?;
    raw.push((ERRDUMP.to_string(), bytes));

    let (path, bytes) = read_table(dir, SWITCHSHOW).await?;
    let switchshow = parse_rows(SWITCHSHOW, &path, &bytes)?;
    raw.push((SWITCHSHOW.to_string(), bytes));

    let (path, bytes) = read_table(dir, SWITCH_PARAMS).await?;
    let switch_params = parse_rows(SWITCH_PARAMS, &path, &bytes)?;
    raw.push((SWITCH_PARAMS.to_string(), bytes));

    let (path, bytes) = read_table(dir, PORTSHOW).await?;
    let portshow = parse_rows(PORTSHOW, &path, &bytes)?;
    raw.push((PORTSHOW.to_string(), bytes));

    let tables = InputTables {
        errdump,
        switchshow,
        switch_params,
        portshow,
    };
    info!(
        dir = %dir.display(),
        errdump = tables.errdump.len(),
        portshow = tables.portshow.len(),
        "input tables loaded"
    );
    Ok(LoadedInputs { tables, raw })
}

async fn read_table(dir: &Path, table: &str) -> Result<(PathBuf, Vec<u8>), InputError> {
    for ext in ["json", "csv"] {
        let path = dir.join(format!("{table}.{ext}"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "read input table");
                return Ok((path, bytes));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(InputError::Read { path, source }),
        }
    }
    Err(InputError::Missing {
        table: table.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Decode one table into typed rows.
pub fn parse_rows<T: DeserializeOwned>(
    table: &str,
    path: &Path,
    bytes: &[u8],
) -> Result<Vec<T>, InputError> {
    let malformed = |message: String| InputError::Malformed {
        table: table.to_string(),
        message,
    };

    let objects = if path.extension().is_some_and(|e| e == "json") {
        json_objects(bytes).map_err(malformed)?
    } else {
        csv_objects(bytes).map_err(malformed)?
    };

    objects
        .into_iter()
        .enumerate()
        .map(|(i, object)| {
            serde_json::from_value(Value::Object(object))
                .map_err(|e| malformed(format!("row {}: {}", i + 1, e)))
        })
        .collect()
}

fn json_objects(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, String> {
    let rows: Vec<Value> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(object) => Ok(stringify_scalars(object)),
            other => Err(format!("row {}: expected an object, got {}", i + 1, other)),
        })
        .collect()
}

/// Identity columns are text even when an export wrote them as numbers.
fn stringify_scalars(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other,
            };
            (k, v)
        })
        .collect()
}

fn csv_objects(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, String> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| e.to_string())?;
            Ok(headers
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.to_string(), Value::String(cell.to_string())))
                .collect())
        })
        .collect()
}

/// Files `format` produces for table `name` inside `dir`.
pub fn output_paths(dir: &Path, name: &str, format: OutputFormat) -> Vec<PathBuf> {
    format
        .extensions()
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .collect()
}

/// Write every table in `format`, creating `dir` if needed.
pub async fn write_outputs(
    dir: &Path,
    tables: &[(&str, Table)],
    format: OutputFormat,
) -> Result<Vec<PathBuf>, OutputError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| OutputError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut written = Vec::new();
    for (name, table) in tables {
        for path in output_paths(dir, name, format) {
            let bytes = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => table.to_json()?,
                _ => table.to_csv()?,
            };
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|source| OutputError::Write {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), rows = table.len(), "wrote output table");
            written.push(path);
        }
    }
    Ok(written)
}
