//! flowfeat: bidirectional flow reconstruction and UNSW-NB15 style feature extraction.
//!
//! Modular structure:
//! - [`packet`] — Packet observations and raw frame decoding
//! - [`flow`] — Canonical flow keys and per-batch accumulators
//! - [`features`] — Per-flow statistics, temporal aggregates, batch engine
//! - [`export`] — Fixed-order feature rows and row files
//! - [`collectors`] — Spool directory batch source
//! - [`logging`] — Structured logging

pub mod collectors;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod flow;
pub mod logging;
pub mod packet;

pub use collectors::{CaptureBatch, SpoolCollector};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use export::{FeatureRow, RowSink, FIELD_NAMES};
pub use features::{FeatureCalculator, FlowEngine, FlowFeatures, FlowState, TemporalAggregator};
pub use flow::{FlowKey, FlowTable, Protocol};
pub use logging::StructuredLogger;
pub use packet::{FrameDecoder, PacketObservation};
