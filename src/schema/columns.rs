//! Semantic column typing for extracted tables
//!
//! Accumulates per-column statistics over every row of a table and resolves
//! them into one semantic type, with the date and timestamp detection done
//! on string values.

use crate::melt::Table;
use crate::schema::tables::declared_field;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Semantic type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Only nulls were seen
    Null,
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    Timestamp,
    /// Nested array kept unexpanded
    Array,
    /// Nested object kept unexpanded
    Object,
    /// Incompatible types in one column
    Mixed,
}

impl ColumnType {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => ColumnType::Null,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    ColumnType::Integer
                } else {
                    ColumnType::Decimal
                }
            }
            Value::String(s) => detect_format(s),
            Value::Array(_) => ColumnType::Array,
            Value::Object(_) => ColumnType::Object,
        }
    }

    /// Widen two observed types into one that holds both
    fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, t) | (t, Null) => t,
            (Integer, Decimal) | (Decimal, Integer) => Decimal,
            (Date, Timestamp) | (Timestamp, Date) => Timestamp,
            (Date, String) | (String, Date) | (Timestamp, String) | (String, Timestamp) => String,
            _ => Mixed,
        }
    }
}

/// Typed description of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub nullable: bool,
    /// Declared schema and version the type came from; absent when inferred from the data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_by: Option<String>,
}

/// Typed description of a whole table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Default)]
struct ColumnStats {
    type_counts: HashMap<ColumnType, usize>,
    null_count: usize,
}

impl ColumnStats {
    fn add_value(&mut self, value: &Value) {
        let ty = ColumnType::from_value(value);
        if ty == ColumnType::Null {
            self.null_count += 1;
        } else {
            *self.type_counts.entry(ty).or_insert(0) += 1;
        }
    }

    fn resolve(&self) -> ColumnType {
        self.type_counts
            .keys()
            .fold(ColumnType::Null, |acc, ty| acc.unify(*ty))
    }
}

impl TableSchema {
    /// Type every column of `table`, preferring declared types
    pub fn infer(table: &Table) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|name| {
                let mut stats = ColumnStats::default();
                for value in table.column(name) {
                    stats.add_value(value);
                }

                let declared = declared_field(name);
                ColumnSchema {
                    name: name.clone(),
                    ty: declared.map_or_else(|| stats.resolve(), |(_, field)| field.ty),
                    nullable: stats.null_count > 0,
                    declared_by: declared.map(|(schema, _)| schema.tag()),
                }
            })
            .collect();

        TableSchema {
            table: table.name().to_string(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn detect_format(value: &str) -> ColumnType {
    let len = value.len();

    if len == 10 && value.as_bytes()[4] == b'-' && ISO_DATE_REGEX.is_match(value) {
        return ColumnType::Date;
    }

    if len >= 19 && ISO_DATETIME_REGEX.is_match(value) {
        return ColumnType::Timestamp;
    }

    ColumnType::String
}
