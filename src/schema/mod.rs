//! Column typing for extracted tables
//!
//! Declared schemas for the shared key columns, plus value-based inference
//! for everything else.

pub mod columns;
pub mod tables;

pub use columns::{ColumnSchema, ColumnType, TableSchema};
pub use tables::{declared_field, declared_type, DeclaredSchema, Field, HISTORY_SNAPSHOT};
