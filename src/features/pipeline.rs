//! Batch pipeline: packets → flow table → per-flow features → recency sort → temporal counts → rows.

use super::{FeatureCalculator, FlowFeatures, TemporalAggregator};
use crate::config::FeaturesConfig;
use crate::error::{EngineError, Result};
use crate::export::FeatureRow;
use crate::flow::{FlowAccumulator, FlowTable};
use crate::packet::PacketObservation;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Counters for one processed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub packets: usize,
    pub dropped: usize,
    pub flows: usize,
    pub parallel: bool,
}

/// Owns nothing between batches except configuration and the worker pool.
pub struct FlowEngine {
    config: FeaturesConfig,
    calculator: FeatureCalculator,
    aggregator: TemporalAggregator,
    pool: Option<rayon::ThreadPool>,
}

impl FlowEngine {
    pub fn new(config: FeaturesConfig) -> Result<Self> {
        config.validate()?;
        let pool = if config.workers == 1 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("flowfeat-{}", i))
                .build()
                .map_err(|e| EngineError::WorkerPool(e.to_string()))?;
            Some(pool)
        };
        Ok(Self {
            aggregator: TemporalAggregator::new(config.window_flows),
            calculator: FeatureCalculator,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Run one capture batch to completion. Packet order does not matter.
    pub fn process_batch(
        &self,
        packets: Vec<PacketObservation>,
    ) -> Result<(Vec<FeatureRow>, BatchReport)> {
        let total = packets.len();
        let table = FlowTable::from_packets(packets);
        let mut report = BatchReport {
            packets: total,
            dropped: table.dropped(),
            flows: table.len(),
            parallel: false,
        };
        debug!(
            packets = report.packets,
            dropped = report.dropped,
            flows = report.flows,
            "grouped batch"
        );

        let flows = table.into_flows();
        report.parallel = self.use_pool(flows.len());
        let mut features = self.derive(&flows, report.parallel)?;
        drop(flows);

        // Stable: flows ending at the same instant keep key order.
        features.sort_by(|a, b| a.last_ts.total_cmp(&b.last_ts));

        let aggregates = self.aggregator.aggregate(&features);
        let rows = features
            .iter()
            .zip(aggregates)
            .map(|(f, agg)| FeatureRow::assemble(f, agg))
            .collect();
        Ok((rows, report))
    }

    /// Convenience wrapper when the counters are not needed.
    pub fn rows(&self, packets: Vec<PacketObservation>) -> Result<Vec<FeatureRow>> {
        self.process_batch(packets).map(|(rows, _)| rows)
    }

    fn use_pool(&self, flows: usize) -> bool {
        self.pool.is_some() && flows >= self.config.parallel_threshold
    }

    /// Per-flow derivation; output order matches `flows` on both paths.
    fn derive(&self, flows: &[FlowAccumulator], parallel: bool) -> Result<Vec<FlowFeatures>> {
        let calc = self.calculator;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match (&self.pool, parallel) {
            (Some(pool), true) => {
                pool.install(|| flows.par_iter().map(|f| calc.compute(f)).collect::<Vec<_>>())
            }
            _ => flows.iter().map(|f| calc.compute(f)).collect::<Vec<_>>(),
        }));
        outcome.map_err(|payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            EngineError::Derivation(msg)
        })
    }
}
