//! Pefindo report melting - flatten one nested report into relational tables
//!
//! The loader turns a report document into a single-row record of dotted
//! paths. The extractor then explodes the record's arrays into child tables,
//! copying the report's identifier columns onto every child row, and the
//! history reconciler fills in a snapshot for facilities without history.
//!
//! Which tables exist, and where each one's rows come from, is declared in
//! an `ExtractionPlan` and executed by `ReportExtractor`.

pub mod types;
pub mod loader;
pub mod naming;
pub mod extractor;
pub mod history;
pub mod writer;
pub mod plan;
pub mod planned_extractor;

pub use types::{ExtractConfig, Extraction, Row, Table, TableShape};
pub use loader::{flatten_document, load_report, parse_report};
pub use naming::ColumnNamer;
pub use extractor::ListExpander;
pub use history::HistoryReconciler;
pub use writer::{SingleWriter, TableWriter};
pub use plan::{CarryKeys, ExtractionPlan, TablePlan, TableSource};
pub use planned_extractor::ReportExtractor;
