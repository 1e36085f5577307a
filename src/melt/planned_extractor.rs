//! Plan-driven extraction of a whole report
//!
//! `ReportExtractor` walks an `ExtractionPlan` in order, expanding the report
//! record or an earlier output table for each planned table.

use crate::error::{MeltError, Result};
use crate::melt::extractor::ListExpander;
use crate::melt::history::HistoryReconciler;
use crate::melt::naming::ColumnNamer;
use crate::melt::plan::{ExtractionPlan, TablePlan, TableSource};
use crate::melt::types::{ExtractConfig, Extraction, Table};
use tracing::info;

/// Extracts every planned table from one report record
pub struct ReportExtractor {
    plan: ExtractionPlan,
    namer: ColumnNamer,
}

impl ReportExtractor {
    pub fn new(plan: ExtractionPlan) -> Self {
        let namer = ColumnNamer::new(plan.config.namespace_prefixes.clone());
        ReportExtractor { plan, namer }
    }

    /// Extractor for the standard Pefindo table set
    pub fn pefindo(config: ExtractConfig) -> Result<Self> {
        Ok(Self::new(ExtractionPlan::pefindo(config)?))
    }

    /// Extract all planned tables from a loaded report record
    ///
    /// `record` is the loader's output with full dotted paths; column names
    /// are canonicalized here, once, through a single path mapping.
    pub fn extract(&self, record: &Table) -> Result<Extraction> {
        if record.len() != 1 {
            return Err(MeltError::Schema(format!(
                "expected exactly one report row, found {}",
                record.len()
            )));
        }

        let mapping = self.namer.mapping(record.columns())?;
        let report = record.clone().renamed(&mapping).with_name("report");
        let identifiers = self.plan.identifier_columns(&self.namer);
        report.require_columns(&identifiers)?;
        if !self.plan.config.allow_null_identifiers {
            if let Some(column) = identifiers.iter().find(|c| report.value(0, c).is_null()) {
                return Err(MeltError::Schema(format!(
                    "identifier column '{}' is null, child rows could not be joined back to the report",
                    column
                )));
            }
        }

        let mut produced: Vec<(&str, Table)> = Vec::with_capacity(self.plan.tables.len());
        for table_plan in &self.plan.tables {
            let name = self.plan.output_name(table_plan);
            let table = self.extract_table(table_plan, &name, record, &report, &produced)?;

            info!(table = %name, rows = table.len(), columns = table.width(), "Extracted table");
            produced.push((table_plan.name.as_str(), table));
        }

        let extraction = produced.into_iter().fold(Extraction::new(), |mut out, (_, table)| {
            out.push(table);
            out
        });
        info!(
            tables = extraction.len(),
            total_columns = extraction.total_columns(),
            "Extraction complete"
        );
        Ok(extraction)
    }

    fn extract_table(
        &self,
        table_plan: &TablePlan,
        name: &str,
        record: &Table,
        report: &Table,
        produced: &[(&str, Table)],
    ) -> Result<Table> {
        let carry = self.plan.carry_columns(table_plan.carry, &self.namer);
        let expander = ListExpander::new(&self.namer);

        match &table_plan.source {
            TableSource::ReportArray { column } => {
                expander.expand_optional(report, column, &carry, name)
            }
            TableSource::DebtorFields => self.debtor_fields(record, name),
            TableSource::ChildArray { parent, column } => {
                let parent = Self::parent_table(produced, parent)?;
                expander.expand_optional(parent, column, &carry, name)
            }
            TableSource::FacilityHistory { parent } => {
                let parent = Self::parent_table(produced, parent)?;
                HistoryReconciler::new(&self.plan.config, &self.namer).reconcile(parent, &carry, name)
            }
        }
    }

    /// Debtor-level scalars plus the summary header fields, as one row
    fn debtor_fields(&self, record: &Table, name: &str) -> Result<Table> {
        let config = &self.plan.config;
        let mut columns: Vec<&str> = record
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|c| c.contains(config.debtor_namespace.as_str()))
            .collect();
        for header in &config.summary_header_columns {
            if !columns.contains(&header.as_str()) {
                columns.push(header);
            }
        }

        self.namer.normalize(record.select(name, &columns)?)
    }

    fn parent_table<'t>(produced: &'t [(&str, Table)], parent: &str) -> Result<&'t Table> {
        produced
            .iter()
            .find(|(name, _)| *name == parent)
            .map(|(_, table)| table)
            .ok_or_else(|| MeltError::Schema(format!("parent table '{}' was not extracted", parent)))
    }
}
