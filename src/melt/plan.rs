//! Declared extraction plan for a Pefindo report
//!
//! Each output table is described once, up front: where its rows come from
//! and which keys are carried onto them. Tables derived from another table's
//! output (history, collateral, guarantor) name that table as their parent,
//! and the plan checks parents are extracted first.

use crate::error::{MeltError, Result};
use crate::melt::naming::ColumnNamer;
use crate::melt::types::ExtractConfig;
use std::collections::HashSet;

pub const SCORING: &str = "scoring";
pub const INFORMATION_SUMMARY: &str = "information_summary";
pub const FACILITIES: &str = "facilities";
pub const FACILITIES_HISTORY: &str = "facilities_history";
pub const FACILITIES_COLLATERAL: &str = "facilities_collateral";
pub const FACILITIES_GUARANTOR: &str = "facilities_guarantor";
pub const INQUIRY: &str = "inquiry";
pub const INQUIRY_SUMMARY: &str = "inquiry_summary";
pub const INFORMATION_HISTORY: &str = "information_history";
pub const COLLECTIBILITY_HISTORY: &str = "collectibility_history";

/// Where the rows of an output table come from
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// An array column of the report record
    ReportArray { column: String },
    /// The debtor's scalar fields merged with the summary header fields
    DebtorFields,
    /// An array column of a table extracted earlier
    ChildArray { parent: String, column: String },
    /// The history column of a facility table, reconciled
    FacilityHistory { parent: String },
}

impl TableSource {
    fn parent(&self) -> Option<&str> {
        match self {
            TableSource::ChildArray { parent, .. } | TableSource::FacilityHistory { parent } => {
                Some(parent.as_str())
            }
            _ => None,
        }
    }
}

/// Which keys are copied onto every row of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryKeys {
    /// The report's identifier columns
    Identifiers,
    /// Identifier columns plus the facility keys
    FacilityKeys,
    /// Nothing beyond what the source holds
    None,
}

/// Plan for one output table
#[derive(Debug, Clone)]
pub struct TablePlan {
    /// Table name without the configured prefix
    pub name: String,
    pub source: TableSource,
    pub carry: CarryKeys,
}

impl TablePlan {
    pub fn new(name: &str, source: TableSource, carry: CarryKeys) -> Self {
        TablePlan {
            name: name.to_string(),
            source,
            carry,
        }
    }

    fn report_array(name: &str, column: &str) -> Self {
        Self::new(
            name,
            TableSource::ReportArray { column: column.to_string() },
            CarryKeys::Identifiers,
        )
    }

    fn facility_array(name: &str, column: &str) -> Self {
        Self::new(
            name,
            TableSource::ChildArray {
                parent: FACILITIES.to_string(),
                column: column.to_string(),
            },
            CarryKeys::FacilityKeys,
        )
    }
}

/// Ordered table plans plus the configuration they run under
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub tables: Vec<TablePlan>,
    pub config: ExtractConfig,
}

impl ExtractionPlan {
    /// The standard table set of a Pefindo report, in extraction order
    pub fn pefindo(config: ExtractConfig) -> Result<Self> {
        let tables = vec![
            TablePlan::report_array(SCORING, "report.scoring"),
            TablePlan::new(INFORMATION_SUMMARY, TableSource::DebtorFields, CarryKeys::None),
            TablePlan::report_array(FACILITIES, "report.fasilitas"),
            TablePlan::new(
                FACILITIES_HISTORY,
                TableSource::FacilityHistory { parent: FACILITIES.to_string() },
                CarryKeys::FacilityKeys,
            ),
            TablePlan::facility_array(FACILITIES_COLLATERAL, "agunan"),
            TablePlan::facility_array(FACILITIES_GUARANTOR, "penjamin"),
            TablePlan::report_array(INQUIRY, "report.permintaan_data"),
            TablePlan::report_array(INQUIRY_SUMMARY, "report.summary_permintaan_data"),
            TablePlan::report_array(INFORMATION_HISTORY, "report.riwayat_identitas_debitur"),
            TablePlan::report_array(COLLECTIBILITY_HISTORY, "report.summary_riwayat_debitur"),
        ];

        Self::from_tables(tables, config)
    }

    /// Build a plan from explicit table plans
    ///
    /// Names must be unique and every parent must be planned before its children.
    pub fn from_tables(tables: Vec<TablePlan>, config: ExtractConfig) -> Result<Self> {
        let mut planned: HashSet<&str> = HashSet::new();

        for table in &tables {
            if let Some(parent) = table.source.parent() {
                if !planned.contains(parent) {
                    return Err(MeltError::Schema(format!(
                        "table '{}' depends on '{}', which is not extracted before it",
                        table.name, parent
                    )));
                }
            }
            if !planned.insert(&table.name) {
                return Err(MeltError::Schema(format!("table '{}' is planned twice", table.name)));
            }
        }

        Ok(ExtractionPlan { tables, config })
    }

    /// Get the plan for a given table
    pub fn get_plan(&self, name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Canonical names of the identifier columns
    pub fn identifier_columns(&self, namer: &ColumnNamer) -> Vec<String> {
        self.config
            .identifier_columns
            .iter()
            .map(|c| namer.canonical(c).to_string())
            .collect()
    }

    /// Canonical names of the columns carried for `carry`
    pub fn carry_columns(&self, carry: CarryKeys, namer: &ColumnNamer) -> Vec<String> {
        match carry {
            CarryKeys::Identifiers => self.identifier_columns(namer),
            CarryKeys::FacilityKeys => {
                let mut columns = self.identifier_columns(namer);
                for key in &self.config.facility_key_columns {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
                columns
            }
            CarryKeys::None => Vec::new(),
        }
    }

    /// Output name of a planned table, with the configured prefix
    pub fn output_name(&self, table: &TablePlan) -> String {
        format!("{}{}", self.config.table_prefix, table.name)
    }
}
