use crate::melt::types::{Extraction, Table};
use crate::schema::TableSchema;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes each table to its own JSON Lines file in a directory
pub struct TableWriter {
    output_dir: PathBuf,
    write_schemas: bool,
}

impl TableWriter {
    /// Create a writer for `output_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

        Ok(TableWriter {
            output_dir,
            write_schemas: false,
        })
    }

    /// Also write `<table>.schema.json` next to every table
    pub fn with_schemas(mut self, write_schemas: bool) -> Self {
        self.write_schemas = write_schemas;
        self
    }

    /// Write every table of an extraction, returning the files written
    pub fn write_extraction(&self, extraction: &Extraction) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for table in extraction.tables() {
            written.push(self.write_table(table)?);
            if self.write_schemas {
                written.push(self.write_schema(table)?);
            }
        }
        Ok(written)
    }

    /// Write one table as `<name>.jsonl`, one uniform record per line
    pub fn write_table(&self, table: &Table) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.jsonl", table.name()));
        let file = File::create(&path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for record in table.records() {
            let json = serde_json::to_string(&record).context("Failed to serialize record")?;
            writeln!(writer, "{}", json).context("Failed to write record")?;
        }
        writer.flush().context("Failed to flush writer")?;

        debug!(path = %path.display(), rows = table.len(), "Wrote table");
        Ok(path)
    }

    fn write_schema(&self, table: &Table) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.schema.json", table.name()));
        let schema = TableSchema::infer(table);
        let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Writes all tables to one stream, tagging each record with its table
pub struct SingleWriter<W: Write> {
    writer: W,
}

impl<W: Write> SingleWriter<W> {
    pub fn new(writer: W) -> Self {
        SingleWriter { writer }
    }

    pub fn write_extraction(&mut self, extraction: &Extraction) -> Result<()> {
        for table in extraction.tables() {
            for mut record in table.records() {
                record.insert(
                    "_table".to_string(),
                    serde_json::Value::String(table.name().to_string()),
                );

                let json = serde_json::to_string(&record).context("Failed to serialize record")?;
                writeln!(self.writer, "{}", json).context("Failed to write record")?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
