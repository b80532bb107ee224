//! Batch-level failures. Per-packet problems are never errors; they drop the packet.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker pool: {0}")]
    WorkerPool(String),

    #[error("flow derivation panicked: {0}")]
    Derivation(String),

    #[error("malformed observation at {path}:{line}: {source}")]
    Observation {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
