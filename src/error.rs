//! Error types for report extraction.
//!
//! Every variant is terminal for the report being processed: callers get
//! either the full set of tables or one of these, never partial output.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeltError {
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("JSON parsing error: {0}")]
    Parse(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Column name collision: {column} produced by {sources:?}")]
    NameCollision { column: String, sources: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeltError {
    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        MeltError::Schema(format!("table '{}' has no column '{}'", table, column))
    }
}

pub type Result<T> = std::result::Result<T, MeltError>;
