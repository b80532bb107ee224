//! Batch sources. Capture itself happens elsewhere; collectors hand finished batches to the engine.

mod spool;

pub use spool::SpoolCollector;

use crate::packet::PacketObservation;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Packets of one capture interval
#[derive(Debug, Clone)]
pub struct CaptureBatch {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub packets: Vec<PacketObservation>,
}

impl CaptureBatch {
    pub fn new(packets: Vec<PacketObservation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            packets,
        }
    }

    /// Output file stem, e.g. `flows_20240101_120000_<short id>`
    pub fn file_stem(&self) -> String {
        let id = self.id.simple().to_string();
        format!(
            "flows_{}_{}",
            self.received_at.format("%Y%m%d_%H%M%S"),
            &id[..8]
        )
    }
}
