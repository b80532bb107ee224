//! Spool directory collector: each `*.ndjson` file holds one batch, one observation per line.

use super::CaptureBatch;
use crate::error::{EngineError, Result};
use crate::packet::PacketObservation;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

const SPOOL_EXTENSION: &str = "ndjson";
const DONE_EXTENSION: &str = "done";

pub struct SpoolCollector {
    dir: PathBuf,
}

impl SpoolCollector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pending batch files, sorted by name so timestamped files come out oldest first.
    pub fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == SPOOL_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse one batch file. Blank lines are skipped; any malformed line fails the batch.
    pub fn read_batch(&self, path: &Path) -> Result<CaptureBatch> {
        let reader = BufReader::new(File::open(path)?);
        let mut packets = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let obs: PacketObservation =
                serde_json::from_str(&line).map_err(|source| EngineError::Observation {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })?;
            packets.push(obs);
        }
        Ok(CaptureBatch::new(packets))
    }

    /// Retire a consumed batch file: delete it, or rename it to `*.done`.
    pub fn finish(&self, path: &Path, delete: bool) -> Result<()> {
        if delete {
            fs::remove_file(path)?;
        } else {
            fs::rename(path, path.with_extension(DONE_EXTENSION))?;
        }
        Ok(())
    }

    /// Retire a batch whose rows are already in `output`. When the input cannot be
    /// retired, `output` is removed again so a retry exports the batch only once.
    pub fn commit(&self, path: &Path, output: &Path, delete: bool) -> Result<()> {
        if let Err(e) = self.finish(path, delete) {
            if let Err(cleanup) = fs::remove_file(output) {
                warn!(output = %output.display(), error = %cleanup, "could not remove row file");
            }
            return Err(e);
        }
        Ok(())
    }
}
