//! Row files: CSV with a header line, or one JSON object per line.

use super::{FeatureRow, FIELD_NAMES};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Ndjson,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Ndjson => "ndjson",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowSink {
    format: OutputFormat,
}

impl RowSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write all rows of one batch. A CSV header is written even for an empty batch.
    pub fn write<W: Write>(&self, rows: &[FeatureRow], w: &mut W) -> Result<()> {
        match self.format {
            OutputFormat::Csv => {
                let mut wtr = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(&mut *w);
                wtr.write_record(FIELD_NAMES)?;
                for row in rows {
                    wtr.serialize(row)?;
                }
                wtr.flush()?;
            }
            OutputFormat::Ndjson => {
                for row in rows {
                    serde_json::to_writer(&mut *w, row)?;
                    writeln!(w)?;
                }
            }
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_file(&self, rows: &[FeatureRow], path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write(rows, &mut w)
    }
}
