use crate::error::Result;
use crate::melt::naming::ColumnNamer;
use crate::melt::types::{Row, Table};
use serde_json::Value;
use tracing::{debug, warn};

/// Explodes an array-of-objects column into its own child table
///
/// Every child row gets a copy of the parent row's carry columns, so it can
/// be joined back without any generated ids.
pub struct ListExpander<'a> {
    namer: &'a ColumnNamer,
}

impl<'a> ListExpander<'a> {
    pub fn new(namer: &'a ColumnNamer) -> Self {
        ListExpander { namer }
    }

    /// Expand `array_column` of `table` into a table named `name`
    ///
    /// Rows whose cell is not a non-empty array of objects contribute
    /// nothing. An input with no rows yields an empty table without checking
    /// columns, so expansions chained on an empty result stay empty.
    pub fn expand(&self, table: &Table, array_column: &str, carry: &[String], name: &str) -> Result<Table> {
        if table.is_empty() {
            return Ok(Table::new(name));
        }

        table.require_columns(&[array_column])?;
        table.require_columns(carry)?;
        warn_null_keys(table, carry, name);

        let expanded = (0..table.len()).fold(Table::new(name), |mut out, i| {
            if let Some(rows) = element_rows(table, i, array_column, carry) {
                rows.for_each(|row| out.push_row(row));
            }
            out
        });

        debug!(table = name, source = array_column, rows = expanded.len(), "Expanded array column");
        self.namer.normalize(expanded)
    }

    /// Like [`expand`](Self::expand), but an absent array column yields an
    /// empty table instead of a schema error
    pub fn expand_optional(
        &self,
        table: &Table,
        array_column: &str,
        carry: &[String],
        name: &str,
    ) -> Result<Table> {
        if !table.is_empty() && !table.has_column(array_column) {
            debug!(table = name, source = array_column, "Array column absent, table is empty");
            table.require_columns(carry)?;
            return Ok(Table::new(name));
        }
        self.expand(table, array_column, carry, name)
    }
}

/// Child rows for row `i`, each carrying the parent's `carry` values
///
/// `None` when the cell is null, not an array, empty, or not made of objects.
pub(crate) fn element_rows<'t>(
    table: &'t Table,
    i: usize,
    array_column: &str,
    carry: &'t [String],
) -> Option<impl Iterator<Item = Row> + 't> {
    let items = match table.value(i, array_column) {
        Value::Array(items) if !items.is_empty() => items,
        Value::Array(_) | Value::Null => return None,
        other => {
            warn!(column = array_column, row = i, value = %other, "Expected an array, skipping row");
            return None;
        }
    };

    if !is_entity_array(items) {
        warn!(column = array_column, row = i, "Array holds non-object elements, skipping row");
        return None;
    }

    let rows = items.iter().filter_map(Value::as_object).map(move |element| {
        let mut row = element.clone();
        for column in carry {
            row.insert(column.clone(), table.value(i, column).clone());
        }
        row
    });

    Some(rows)
}

/// Warn once per carried column that holds a null in any parent row
pub(crate) fn warn_null_keys(table: &Table, carry: &[String], name: &str) {
    for (column, nulls) in null_key_counts(table, carry) {
        warn!(table = name, column = %column, rows = nulls, "Carried key is null");
    }
}

/// Carried columns with at least one null cell, and how many parent rows have one
fn null_key_counts<'c>(table: &Table, carry: &'c [String]) -> Vec<(&'c str, usize)> {
    carry
        .iter()
        .map(|column| (column.as_str(), table.column(column).filter(|v| v.is_null()).count()))
        .filter(|(_, nulls)| *nulls > 0)
        .collect()
}

/// An array is expanded only when every element is an object
fn is_entity_array(arr: &[Value]) -> bool {
    arr.iter().all(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeltError;
    use crate::melt::types::ExtractConfig;
    use serde_json::json;

    fn namer() -> ColumnNamer {
        ColumnNamer::new(ExtractConfig::default().namespace_prefixes)
    }

    fn table(rows: Vec<Value>) -> Table {
        Table::from_rows(
            "parent",
            rows.into_iter().filter_map(|v| v.as_object().cloned()),
        )
    }

    fn carry(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_expand_preserves_row_and_element_order() {
        let parent = table(vec![
            json!({"id_report": "R0", "items": [{"n": 1}, {"n": 2}]}),
            json!({"id_report": "R1", "items": []}),
        ]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "items", &carry(&["id_report"]), "child")
            .unwrap();

        assert_eq!(child.name(), "child");
        assert_eq!(child.len(), 2);
        assert_eq!(child.value(0, "n"), &json!(1));
        assert_eq!(child.value(1, "n"), &json!(2));
        assert!(child.column("id_report").all(|v| v == &json!("R0")));
        assert_eq!(child.columns(), &["n", "id_report"]);
    }

    #[test]
    fn test_expand_normalizes_carried_columns() {
        let parent = table(vec![json!({
            "report.header.username": "analyst",
            "report.scoring": [{"skor": 700}]
        })]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "report.scoring", &carry(&["report.header.username"]), "scoring")
            .unwrap();

        assert_eq!(child.columns(), &["skor", "username"]);
    }

    #[test]
    fn test_carry_overwrites_element_field() {
        let parent = table(vec![json!({"id": "parent", "items": [{"id": "child"}]})]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "items", &carry(&["id"]), "child")
            .unwrap();

        assert_eq!(child.value(0, "id"), &json!("parent"));
        assert_eq!(child.width(), 1);
    }

    #[test]
    fn test_nothing_to_expand_gives_zero_columns() {
        let parent = table(vec![json!({"k": 1, "items": []}), json!({"k": 2, "items": null})]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "items", &carry(&["k"]), "child")
            .unwrap();

        assert!(child.is_empty());
        assert_eq!(child.width(), 0);
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let parent = table(vec![
            json!({"k": 1, "items": ["a", "b"]}),
            json!({"k": 2, "items": "oops"}),
            json!({"k": 3, "items": [{"n": 1}]}),
        ]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "items", &carry(&["k"]), "child")
            .unwrap();

        assert_eq!(child.len(), 1);
        assert_eq!(child.value(0, "k"), &json!(3));
    }

    #[test]
    fn test_heterogeneous_elements_union_columns() {
        let parent = table(vec![json!({"k": 1, "items": [{"a": 1}, {"b": 2}]})]);

        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&parent, "items", &carry(&["k"]), "child")
            .unwrap();

        assert_eq!(child.columns(), &["a", "k", "b"]);
        assert_eq!(child.value(0, "b"), &Value::Null);
    }

    #[test]
    fn test_null_keys_counted_once_per_column() {
        let parent = table(vec![
            json!({"k": null, "j": "x", "items": [{"n": 1}, {"n": 2}, {"n": 3}]}),
            json!({"k": null, "j": null, "items": [{"n": 4}]}),
        ]);

        let carried = carry(&["k", "j", "items"]);
        let counts = null_key_counts(&parent, &carried);
        assert_eq!(counts, vec![("k", 2), ("j", 1)]);
    }

    #[test]
    fn test_missing_columns_are_schema_errors() {
        let parent = table(vec![json!({"k": 1, "items": [{"n": 1}]})]);
        let namer = namer();
        let expander = ListExpander::new(&namer);

        let err = expander.expand(&parent, "absent", &carry(&["k"]), "c").unwrap_err();
        assert!(matches!(err, MeltError::Schema(_)));

        let err = expander.expand(&parent, "items", &carry(&["absent"]), "c").unwrap_err();
        assert!(matches!(err, MeltError::Schema(_)));
    }

    #[test]
    fn test_empty_parent_never_raises() {
        let namer = namer();
        let child = ListExpander::new(&namer)
            .expand(&Table::new("empty"), "absent", &carry(&["also_absent"]), "c")
            .unwrap();

        assert!(child.is_empty());
        assert_eq!(child.width(), 0);
    }

    #[test]
    fn test_expand_optional_absent_column() {
        let parent = table(vec![json!({"k": 1})]);
        let namer = namer();
        let expander = ListExpander::new(&namer);

        let child = expander.expand_optional(&parent, "items", &carry(&["k"]), "c").unwrap();
        assert!(child.is_empty());

        let err = expander.expand_optional(&parent, "items", &carry(&["nope"]), "c").unwrap_err();
        assert!(matches!(err, MeltError::Schema(_)));
    }
}
