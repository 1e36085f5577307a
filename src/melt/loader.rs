//! Report loading
//!
//! Reads one report document and flattens it into a single-row table whose
//! columns are dotted paths to every scalar leaf. Arrays are kept whole in
//! their own column for the expander to pick apart later.

use crate::error::{MeltError, Result};
use crate::melt::types::{Row, Table};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Separator between path segments of flattened column names
pub const PATH_SEPARATOR: &str = ".";

/// Load and flatten the report at `path`
pub fn load_report<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let mut content = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MeltError::InputNotFound(path.to_path_buf()),
        _ => MeltError::Io(e),
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Read report");

    let value: Value = simd_json::serde::from_slice(&mut content)
        .map_err(|e| MeltError::Parse(format!("{}: {}", path.display(), e)))?;

    let table = flatten_document(value)?;
    info!(path = %path.display(), rows = table.len(), columns = table.width(), "Loaded report");
    Ok(table)
}

/// Parse a report from a string
pub fn parse_report(json: &str) -> Result<Table> {
    let value: Value = serde_json::from_str(json).map_err(|e| MeltError::Parse(e.to_string()))?;
    flatten_document(value)
}

/// Flatten one decoded document into the single-row report record
pub fn flatten_document(value: Value) -> Result<Table> {
    let document = match value {
        Value::Object(document) => document,
        other => {
            return Err(MeltError::Parse(format!(
                "expected a JSON object at the top level, found {}",
                kind_of(&other)
            )))
        }
    };

    let mut row = Row::new();
    flatten_object(document, None, &mut row);
    Ok(Table::from_rows("report", [row]))
}

/// Nested objects become dotted paths; arrays and scalars are leaves.
/// An empty nested object contributes no column.
fn flatten_object(obj: Map<String, Value>, prefix: Option<&str>, row: &mut Row) {
    for (key, value) in obj.into_iter() {
        let path = match prefix {
            Some(p) => format!("{}{}{}", p, PATH_SEPARATOR, key),
            None => key,
        };

        match value {
            Value::Object(nested) => flatten_object(nested, Some(&path), row),
            leaf => {
                row.insert(path, leaf);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
