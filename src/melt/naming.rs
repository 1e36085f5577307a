//! Canonical column names
//!
//! Flattened report columns carry their full JSON path. The namespace
//! prefixes of the document header and the debtor are dropped so child
//! table schemas do not depend on where a field was nested.

use crate::error::{MeltError, Result};
use crate::melt::types::Table;
use std::collections::HashMap;

/// Strips configured namespace prefixes from column names
#[derive(Debug, Clone)]
pub struct ColumnNamer {
    prefixes: Vec<String>,
}

impl ColumnNamer {
    pub fn new(prefixes: Vec<String>) -> Self {
        ColumnNamer {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    /// Canonical name for one source path
    ///
    /// Prefixes are stripped until none applies, so the result never starts
    /// with a namespace prefix and renaming twice changes nothing.
    pub fn canonical<'a>(&self, path: &'a str) -> &'a str {
        let mut name = path;
        while let Some(rest) = self
            .prefixes
            .iter()
            .find_map(|p| name.strip_prefix(p.as_str()))
        {
            name = rest;
        }
        name
    }

    /// Source path to canonical name for every column that changes
    ///
    /// Two source columns landing on the same canonical name is an error.
    pub fn mapping<S: AsRef<str>>(&self, columns: &[S]) -> Result<HashMap<String, String>> {
        let mut seen: HashMap<&str, &str> = HashMap::with_capacity(columns.len());
        let mut mapping = HashMap::new();

        for column in columns {
            let column = column.as_ref();
            let canonical = self.canonical(column);

            if let Some(previous) = seen.insert(canonical, column) {
                return Err(MeltError::NameCollision {
                    column: canonical.to_string(),
                    sources: vec![previous.to_string(), column.to_string()],
                });
            }

            if canonical != column {
                mapping.insert(column.to_string(), canonical.to_string());
            }
        }

        Ok(mapping)
    }

    /// Rename every column of `table` to its canonical name
    pub fn normalize(&self, table: Table) -> Result<Table> {
        let mapping = self.mapping(table.columns())?;
        if mapping.is_empty() {
            return Ok(table);
        }
        Ok(table.renamed(&mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::types::ExtractConfig;
    use serde_json::json;

    fn namer() -> ColumnNamer {
        ColumnNamer::new(ExtractConfig::default().namespace_prefixes)
    }

    fn report() -> Table {
        let row = json!({
            "report.header.username": "analyst",
            "report.debitur.nomor_identitas": "317",
            "report.fasilitas": [],
            "skor": 1
        });
        match row {
            serde_json::Value::Object(map) => Table::from_rows("report", vec![map]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_strips_namespace_prefixes() {
        let normalized = namer().normalize(report()).unwrap();

        assert_eq!(
            normalized.columns(),
            &["username", "nomor_identitas", "report.fasilitas", "skor"]
        );
        assert_eq!(normalized.value(0, "username"), &json!("analyst"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = namer().normalize(report()).unwrap();
        let twice = namer().normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_nested_prefixes_strip_fully() {
        assert_eq!(namer().canonical("report.debitur.report.header.x"), "x");
        assert_eq!(namer().canonical("report.fasilitas"), "report.fasilitas");
    }

    #[test]
    fn test_collision_is_an_error() {
        let err = namer()
            .mapping(&["report.header.email", "report.debitur.email"])
            .unwrap_err();

        match err {
            MeltError::NameCollision { column, sources } => {
                assert_eq!(column, "email");
                assert_eq!(sources, vec!["report.header.email", "report.debitur.email"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collision_with_unprefixed_column() {
        assert!(namer().mapping(&["email", "report.debitur.email"]).is_err());
    }
}
