//! # Pefindo Melt - credit report flattening
//!
//! Turns one deeply nested Pefindo credit-bureau report into a fixed set of
//! flat tables linked by copied identifier columns, ready for loading into a
//! warehouse.
//!
//! ## Modules
//!
//! - **melt**: load a report, expand its arrays into child tables, reconcile facility history
//! - **schema**: declared key schemas and semantic column typing
//!
//! ## Quick Start
//!
//! ```rust
//! use pefindo_melt::melt::{flatten_document, ExtractConfig, ReportExtractor};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), pefindo_melt::MeltError> {
//! let report = json!({
//!     "report": {
//!         "header": {"username": "analyst", "id_report": "R-1", "tgl_permintaan": "2024-03-01"},
//!         "debitur": {"nomor_identitas": "317", "npwp": "01", "email": "a@b.id", "telepon": "0812"},
//!         "scoring": [{"skor": 720}],
//!         "fasilitas": [{
//!             "nomor_rekening_fasilitas": "F-1", "id_jenis_fasilitas": "10",
//!             "id_pelapor": "B1", "id_jenis_pelapor": "1",
//!             "id_jenis_kredit": "20", "id_sifat_kredit": "1",
//!             "tunggakan_pokok": 0, "riwayat_fasilitas": []
//!         }]
//!     }
//! });
//!
//! let record = flatten_document(report)?;
//! let extraction = ReportExtractor::pefindo(ExtractConfig::default())?.extract(&record)?;
//!
//! // every child row carries the report's identifier columns
//! let scoring = extraction.get("scoring").unwrap();
//! assert_eq!(scoring.value(0, "id_report"), "R-1");
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod error;
pub mod melt;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::{MeltError, Result};
pub use melt::{
    load_report, ExtractConfig, Extraction, ExtractionPlan, ListExpander, ReportExtractor, Table,
};
pub use schema::{ColumnType, TableSchema};

/// Main entry point: load the report at `path` and extract every table
///
/// Either all tables are returned or the first error; a malformed report
/// never yields partial output.
pub fn extract_report<P: AsRef<Path>>(path: P, config: ExtractConfig) -> Result<Extraction> {
    let record = load_report(path)?;
    ReportExtractor::pefindo(config)?.extract(&record)
}
