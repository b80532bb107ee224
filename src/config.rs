//! Engine configuration, loaded from JSON. Missing sections fall back to defaults.

use crate::error::{EngineError, Result};
use crate::export::OutputFormat;
use crate::features::DEFAULT_WINDOW_FLOWS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spool directory with one NDJSON observation file per capture batch
    pub input_dir: PathBuf,
    /// Where feature row files are written
    pub output_dir: PathBuf,
    /// Feature derivation parameters
    pub features: FeaturesConfig,
    /// Batch loop behaviour
    pub batch: BatchConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Trailing flows (current one included) for the ct_* counts
    pub window_flows: usize,
    /// Worker threads for per-flow derivation; 0 = one per CPU, 1 = sequential
    pub workers: usize,
    /// Minimum flows in a batch before the worker pool is used
    pub parallel_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Seconds between spool scans; 0 processes the spool once and exits
    pub poll_interval_secs: u64,
    /// Row file format
    pub format: OutputFormat,
    /// Remove input files once their rows are written (otherwise renamed to *.done)
    pub delete_processed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/tmp/flowfeat/spool"),
            output_dir: PathBuf::from("/tmp/captures"),
            features: FeaturesConfig::default(),
            batch: BatchConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            window_flows: DEFAULT_WINDOW_FLOWS,
            workers: 0,
            parallel_threshold: 512,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            format: OutputFormat::Csv,
            delete_processed: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl FeaturesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_flows == 0 {
            return Err(EngineError::Config(
                "features.window_flows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Load from a JSON file. A missing file yields the defaults; an unreadable or
    /// malformed one is an error.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            EngineError::Config(format!("{}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        if self.input_dir == self.output_dir {
            return Err(EngineError::Config(
                "input_dir and output_dir must differ".to_string(),
            ));
        }
        Ok(())
    }
}
