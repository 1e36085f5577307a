//! Facility history reconciliation
//!
//! A facility whose history array is empty still gets one snapshot row,
//! synthesized from the facility itself, so every facility appears in the
//! history table.

use crate::error::{MeltError, Result};
use crate::melt::extractor::{element_rows, warn_null_keys};
use crate::melt::naming::ColumnNamer;
use crate::melt::types::{ExtractConfig, Row, Table};
use serde_json::Value;
use tracing::debug;

pub const SNAPSHOT_ORDER_COLUMN: &str = "snapshot_order";
pub const STATUS_COLUMN: &str = "status_tunggakan";

/// Builds the facility history table from the facilities table
pub struct HistoryReconciler<'a> {
    config: &'a ExtractConfig,
    namer: &'a ColumnNamer,
}

impl<'a> HistoryReconciler<'a> {
    pub fn new(config: &'a ExtractConfig, namer: &'a ColumnNamer) -> Self {
        HistoryReconciler { config, namer }
    }

    /// One row per history element, or one synthesized row per facility
    /// without history, in facility order. `carry` is copied onto every row.
    pub fn reconcile(&self, facilities: &Table, carry: &[String], name: &str) -> Result<Table> {
        if facilities.is_empty() {
            if self.config.allow_empty_facilities {
                return Ok(Table::new(name));
            }
            return Err(MeltError::EmptyInput(format!(
                "table '{}' has no rows to reconcile history against",
                facilities.name()
            )));
        }
        facilities.require_columns(carry)?;
        warn_null_keys(facilities, carry, name);

        let history_column = self.config.history_column.as_str();
        let matching = self.matching_columns(facilities)?;

        let rows = (0..facilities.len()).try_fold(Vec::new(), |mut rows, i| {
            match element_rows(facilities, i, history_column, carry) {
                Some(snapshots) => rows.extend(snapshots),
                None => rows.push(self.synthesize(facilities, i, &matching, carry)?),
            }
            Ok::<_, MeltError>(rows)
        })?;

        let history = Table::from_rows(name, rows);
        debug!(table = name, rows = history.len(), "Reconciled facility history");
        self.namer.normalize(history)
    }

    /// Facility columns a synthesized snapshot copies, in facility column order
    ///
    /// The field set comes from the first element of the first non-empty
    /// history. With no history anywhere the configured default set is used,
    /// restricted to columns every facility row carries.
    fn matching_columns(&self, facilities: &Table) -> Result<Vec<String>> {
        let observed = facilities
            .column(&self.config.history_column)
            .find_map(|cell| match cell {
                Value::Array(items) => items.first().and_then(Value::as_object),
                _ => None,
            })
            .map(|first| first.keys().cloned().collect::<Vec<_>>());

        let (reference, dense_only) = match observed {
            Some(keys) => (keys, false),
            None if self.config.strict_history => {
                return Err(MeltError::EmptyInput(format!(
                    "no facility in '{}' has a non-empty '{}'",
                    facilities.name(),
                    self.config.history_column
                )))
            }
            None => {
                debug!("No facility history present, using the declared snapshot fields");
                (self.config.history_fields.clone(), true)
            }
        };

        Ok(facilities
            .columns()
            .iter()
            .filter(|c| reference.contains(*c))
            .filter(|c| !dense_only || facilities.is_dense(c))
            .cloned()
            .collect())
    }

    fn synthesize(&self, facilities: &Table, i: usize, matching: &[String], carry: &[String]) -> Result<Row> {
        let mut row: Row = matching
            .iter()
            .map(|c| (c.clone(), facilities.value(i, c).clone()))
            .collect();

        let in_arrears = self.in_arrears(facilities, i)?;
        row.insert(SNAPSHOT_ORDER_COLUMN.to_string(), Value::from(1));
        row.insert(STATUS_COLUMN.to_string(), Value::from(u8::from(in_arrears)));

        for column in carry {
            row.insert(column.clone(), facilities.value(i, column).clone());
        }
        Ok(row)
    }

    /// Whether the facility's outstanding principal arrears are above zero
    fn in_arrears(&self, facilities: &Table, i: usize) -> Result<bool> {
        let column = self.config.arrears_column.as_str();
        facilities.require_columns(&[column])?;

        match facilities.value(i, column) {
            Value::Null => Ok(false),
            Value::Number(n) => Ok(n.as_f64().map_or(false, |v| v > 0.0)),
            Value::String(s) if s.trim().is_empty() => Ok(false),
            Value::String(s) => s.trim().parse::<f64>().map(|v| v > 0.0).map_err(|_| {
                MeltError::Schema(format!("'{}' of facility {} is not a number: {:?}", column, i, s))
            }),
            other => Err(MeltError::Schema(format!(
                "'{}' of facility {} is not a number: {}",
                column, i, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facilities(rows: Vec<Value>) -> Table {
        Table::from_rows("facilities", rows.into_iter().filter_map(|v| v.as_object().cloned()))
    }

    fn carry() -> Vec<String> {
        vec!["id_report".to_string(), "nomor_rekening_fasilitas".to_string()]
    }

    fn reconcile(config: &ExtractConfig, table: &Table) -> Result<Table> {
        let namer = ColumnNamer::new(config.namespace_prefixes.clone());
        HistoryReconciler::new(config, &namer).reconcile(table, &carry(), "facilities_history")
    }

    #[test]
    fn test_empty_history_synthesizes_arrears_row() {
        let table = facilities(vec![json!({
            "id_report": "R1",
            "nomor_rekening_fasilitas": "F1",
            "tunggakan_pokok": 1500,
            "baki_debet": 10000,
            "nama_pelapor": "Bank A",
            "riwayat_fasilitas": []
        })]);

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history.value(0, "snapshot_order"), &json!(1));
        assert_eq!(history.value(0, "status_tunggakan"), &json!(1));
        assert_eq!(history.value(0, "baki_debet"), &json!(10000));
        assert_eq!(history.value(0, "nomor_rekening_fasilitas"), &json!("F1"));
        assert!(!history.has_column("nama_pelapor"));
        assert!(!history.has_column("riwayat_fasilitas"));
    }

    #[test]
    fn test_zero_arrears_sets_status_zero() {
        let table = facilities(vec![json!({
            "id_report": "R1",
            "nomor_rekening_fasilitas": "F1",
            "tunggakan_pokok": 0,
            "riwayat_fasilitas": []
        })]);

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();
        assert_eq!(history.value(0, "status_tunggakan"), &json!(0));
    }

    #[test]
    fn test_history_elements_become_rows_without_synthesis() {
        let table = facilities(vec![json!({
            "id_report": "R1",
            "nomor_rekening_fasilitas": "F1",
            "tunggakan_pokok": 1500,
            "riwayat_fasilitas": [
                {"periode_data": "2024-01", "kolektibilitas": 1},
                {"periode_data": "2024-02", "kolektibilitas": 2}
            ]
        })]);

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();

        assert_eq!(history.len(), 2);
        assert!(!history.has_column("snapshot_order"));
        assert_eq!(history.value(1, "periode_data"), &json!("2024-02"));
        assert!(history.column("nomor_rekening_fasilitas").all(|v| v == &json!("F1")));
    }

    #[test]
    fn test_synthesized_row_uses_observed_history_fields() {
        let table = facilities(vec![
            json!({
                "id_report": "R1",
                "nomor_rekening_fasilitas": "F1",
                "tunggakan_pokok": 0,
                "kolektibilitas": 1,
                "plafon": 5000,
                "riwayat_fasilitas": [{"kolektibilitas": 1}]
            }),
            json!({
                "id_report": "R1",
                "nomor_rekening_fasilitas": "F2",
                "tunggakan_pokok": "250.5",
                "kolektibilitas": 3,
                "plafon": 9000,
                "riwayat_fasilitas": []
            }),
        ]);

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.value(1, "kolektibilitas"), &json!(3));
        assert_eq!(history.value(1, "status_tunggakan"), &json!(1));
        // plafon is a declared field but absent from the observed snapshot keys
        assert!(!history.has_column("plafon"));
        assert_eq!(history.value(0, "snapshot_order"), &Value::Null);
    }

    #[test]
    fn test_no_facilities_is_empty_input() {
        let err = reconcile(&ExtractConfig::default(), &Table::new("facilities")).unwrap_err();
        assert!(matches!(err, MeltError::EmptyInput(_)));

        let config = ExtractConfig {
            allow_empty_facilities: true,
            ..ExtractConfig::default()
        };
        let history = reconcile(&config, &Table::new("facilities")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_strict_history_rejects_report_without_any_history() {
        let table = facilities(vec![json!({
            "id_report": "R1",
            "nomor_rekening_fasilitas": "F1",
            "tunggakan_pokok": 0
        })]);

        let config = ExtractConfig {
            strict_history: true,
            ..ExtractConfig::default()
        };
        assert!(matches!(reconcile(&config, &table).unwrap_err(), MeltError::EmptyInput(_)));

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.value(0, "tunggakan_pokok"), &json!(0));
    }

    #[test]
    fn test_declared_fallback_skips_fields_missing_on_some_facility() {
        let table = facilities(vec![
            json!({
                "id_report": "R1",
                "nomor_rekening_fasilitas": "F1",
                "tunggakan_pokok": 0,
                "plafon": 5000,
                "kolektibilitas": null
            }),
            json!({
                "id_report": "R1",
                "nomor_rekening_fasilitas": "F2",
                "tunggakan_pokok": 700,
                "kolektibilitas": 2
            }),
        ]);

        let history = reconcile(&ExtractConfig::default(), &table).unwrap();

        assert_eq!(history.len(), 2);
        assert!(!history.has_column("plafon"));
        assert_eq!(history.value(1, "tunggakan_pokok"), &json!(700));
        // an explicit null still counts as present
        assert_eq!(history.value(0, "kolektibilitas"), &Value::Null);
        assert_eq!(history.value(1, "kolektibilitas"), &json!(2));
        assert_eq!(history.value(1, "status_tunggakan"), &json!(1));
    }

    #[test]
    fn test_unparseable_arrears_is_schema_error() {
        let table = facilities(vec![json!({
            "id_report": "R1",
            "nomor_rekening_fasilitas": "F1",
            "tunggakan_pokok": "banyak",
            "riwayat_fasilitas": []
        })]);

        assert!(matches!(
            reconcile(&ExtractConfig::default(), &table).unwrap_err(),
            MeltError::Schema(_)
        ));
    }
}
