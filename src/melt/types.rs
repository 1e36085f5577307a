use crate::error::{MeltError, Result};
use crate::schema::tables::{FACILITY_KEY_FIELDS, HISTORY_SNAPSHOT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One record of a table, keyed by column name. Absent keys read as null.
pub type Row = Map<String, Value>;

static NULL: Value = Value::Null;

/// An ordered sequence of records sharing one column list
///
/// Columns are the union of every row's keys in first-appearance order, so
/// concatenating rows with heterogeneous keys behaves like an outer union.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, keeping their order
    pub fn from_rows(name: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Self {
        rows.into_iter().fold(Table::new(name), |mut table, row| {
            table.push_row(row);
            table
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether every row carries `column`, even as an explicit null
    pub fn is_dense(&self, column: &str) -> bool {
        self.rows.iter().all(|r| r.contains_key(column))
    }

    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.has_column(key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Cell at (`row`, `column`), null when the row lacks the column
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// Every cell of one column, top to bottom
    pub fn column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |r| r.get(column).unwrap_or(&NULL))
    }

    /// Fail with a schema error naming the first absent column
    pub fn require_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c.as_ref())) {
            Some(missing) => Err(MeltError::missing_column(&self.name, missing.as_ref())),
            None => Ok(()),
        }
    }

    /// Project onto `columns`, in the given order
    pub fn select<S: AsRef<str>>(&self, name: impl Into<String>, columns: &[S]) -> Result<Table> {
        self.require_columns(columns)?;

        let rows = self.rows.iter().map(|row| {
            columns
                .iter()
                .map(|c| {
                    let c = c.as_ref();
                    (c.to_string(), row.get(c).cloned().unwrap_or(Value::Null))
                })
                .collect::<Row>()
        });

        let mut table = Table::from_rows(name, rows);
        // keep declared columns even when there are no rows to carry them
        table.columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Ok(table)
    }

    /// Rename columns through `mapping`; unmapped columns keep their name
    pub(crate) fn renamed(self, mapping: &HashMap<String, String>) -> Table {
        let rename = |c: String| mapping.get(&c).cloned().unwrap_or(c);

        Table {
            name: self.name,
            columns: self.columns.into_iter().map(rename).collect(),
            rows: self
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(|(k, v)| (rename(k), v)).collect())
                .collect(),
        }
    }

    /// Uniform records: every column present, absent cells as null
    pub fn records(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                .collect()
        })
    }
}

/// Row and column counts of one extracted table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableShape {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
}

/// The named tables produced from one report, in extraction order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    tables: Vec<Table>,
}

impl Extraction {
    pub fn new() -> Self {
        Extraction { tables: Vec::new() }
    }

    pub(crate) fn push(&mut self, table: Table) {
        self.tables.push(table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Shape of every table, in extraction order
    pub fn summary(&self) -> Vec<TableShape> {
        self.tables
            .iter()
            .map(|t| TableShape {
                table: t.name.clone(),
                rows: t.len(),
                columns: t.width(),
            })
            .collect()
    }

    /// Column count summed across all tables
    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(Table::width).sum()
    }
}

/// Configuration for extracting one report
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Path prefixes stripped from column names (document header, debtor)
    pub namespace_prefixes: Vec<String>,

    /// Source paths of the columns identifying the report, carried onto every child row
    pub identifier_columns: Vec<String>,

    /// Facility columns carried onto history, collateral and guarantor rows
    pub facility_key_columns: Vec<String>,

    /// Path fragment marking debtor-level fields for the information summary
    pub debtor_namespace: String,

    /// Header paths merged into the information summary
    pub summary_header_columns: Vec<String>,

    /// Facility column holding the history snapshots
    pub history_column: String,

    /// Facility column holding the outstanding principal arrears
    pub arrears_column: String,

    /// Fields copied into a synthesized snapshot when no facility has history
    pub history_fields: Vec<String>,

    /// Prefix for every output table name
    pub table_prefix: String,

    /// Fail instead of using `history_fields` when no facility has history
    pub strict_history: bool,

    /// Produce an empty history table instead of failing when there are no facilities
    pub allow_empty_facilities: bool,

    /// Carry null identifier values onto child rows instead of failing
    pub allow_null_identifiers: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            namespace_prefixes: vec![
                String::from("report.header."),
                String::from("report.debitur."),
            ],
            identifier_columns: [
                "report.header.username",
                "report.debitur.nomor_identitas",
                "report.header.id_report",
                "report.header.tgl_permintaan",
                "report.debitur.npwp",
                "report.debitur.email",
                "report.debitur.telepon",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            facility_key_columns: FACILITY_KEY_FIELDS.names().map(String::from).collect(),
            debtor_namespace: String::from("report.debitur"),
            summary_header_columns: [
                "report.header.username",
                "report.header.id_report",
                "report.header.tgl_permintaan",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            history_column: String::from("riwayat_fasilitas"),
            arrears_column: String::from("tunggakan_pokok"),
            history_fields: HISTORY_SNAPSHOT.names().map(String::from).collect(),
            table_prefix: String::new(),
            strict_history: false,
            allow_empty_facilities: false,
            allow_null_identifiers: false,
        }
    }
}
