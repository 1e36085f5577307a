//! pefindo-melt: Flatten a Pefindo credit report into relational tables
//!
//! Usage:
//!   # Write every table to stdout as one tagged JSON Lines stream
//!   pefindo-melt report.json
//!
//!   # One .jsonl file per table, plus typed column schemas
//!   pefindo-melt report.json --output-dir ./tables --schemas
//!
//!   # Original table naming, overrides from a config file
//!   pefindo-melt report.json -o ./tables --table-prefix pefindo_ --config melt.json
//!
//! Progress is logged to stderr; set RUST_LOG (e.g. RUST_LOG=debug) to adjust.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use pefindo_melt::melt::{ExtractConfig, Extraction, SingleWriter, TableWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pefindo-melt")]
#[command(about = "Flatten a Pefindo credit report into relational tables", long_about = None)]
struct Args {
    /// Report JSON file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output directory for separate .jsonl files per table
    /// If omitted, writes to stdout as a single stream tagged with `_table`
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Also write <table>.schema.json with typed columns (requires --output-dir)
    #[arg(long, requires = "output_dir")]
    schemas: bool,

    /// JSON file overriding any extraction settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prefix for every output table name (e.g. "pefindo_")
    #[arg(long)]
    table_prefix: Option<String>,

    /// Fail when no facility in the report has any history
    #[arg(long)]
    strict_history: bool,

    /// Accept reports without facilities instead of failing
    #[arg(long)]
    allow_empty_facilities: bool,

    /// Carry null identifier values onto child rows instead of failing
    #[arg(long)]
    allow_null_identifiers: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let extraction = pefindo_melt::extract_report(&args.input, config)
        .with_context(|| format!("Failed to extract {}", args.input.display()))?;

    if let Some(output_dir) = &args.output_dir {
        let writer = TableWriter::new(output_dir)?.with_schemas(args.schemas);
        let written = writer.write_extraction(&extraction)?;
        info!(files = written.len(), dir = %output_dir.display(), "Wrote tables");
    } else {
        let mut writer = SingleWriter::new(std::io::stdout().lock());
        writer.write_extraction(&extraction)?;
        writer.flush()?;
    }

    print_summary(&extraction);
    Ok(())
}

/// Defaults, then the config file, then command-line flags
fn build_config(args: &Args) -> Result<ExtractConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => ExtractConfig::default(),
    };

    if let Some(prefix) = &args.table_prefix {
        config.table_prefix = prefix.clone();
    }
    if args.strict_history {
        config.strict_history = true;
    }
    if args.allow_empty_facilities {
        config.allow_empty_facilities = true;
    }
    if args.allow_null_identifiers {
        config.allow_null_identifiers = true;
    }

    Ok(config)
}

fn print_summary(extraction: &Extraction) {
    eprintln!("{}", "=".repeat(60));
    eprintln!("EXTRACTION SUMMARY");
    eprintln!("{}", "=".repeat(60));
    for shape in extraction.summary() {
        eprintln!("{}: {} rows x {} columns", shape.table, shape.rows, shape.columns);
    }
    eprintln!("\nTotal columns across all tables: {}", extraction.total_columns());
    eprintln!("{}", "=".repeat(60));
}
