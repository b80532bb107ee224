//! Connection counts over the trailing window of recently finished flows.

use super::FlowFeatures;
use serde::{Deserialize, Serialize};

/// Flows per window, current flow included
pub const DEFAULT_WINDOW_FLOWS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAggregates {
    /// Same state, source TTL and destination TTL
    pub ct_state_ttl: u32,
    /// Same source address and service
    pub ct_srv_src: u32,
    /// Same destination address
    pub ct_dst_ltm: u32,
    /// Same source address
    pub ct_src_ltm: u32,
    /// Same destination address and source port
    pub ct_dst_sport_ltm: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalAggregator {
    window: usize,
}

impl Default for TemporalAggregator {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW_FLOWS,
        }
    }
}

impl TemporalAggregator {
    /// `window` is clamped to at least 1 (the flow itself).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// `flows` must already be sorted by last-observed time. Output is index-aligned.
    pub fn aggregate(&self, flows: &[FlowFeatures]) -> Vec<FlowAggregates> {
        (0..flows.len()).map(|i| self.aggregate_at(flows, i)).collect()
    }

    /// Counts for `flows[i]` over `flows[i + 1 - window ..= i]` (clipped at 0).
    pub fn aggregate_at(&self, flows: &[FlowFeatures], i: usize) -> FlowAggregates {
        let current = &flows[i];
        let start = (i + 1).saturating_sub(self.window);
        let mut agg = FlowAggregates::default();
        for other in &flows[start..=i] {
            let same_src = other.src_ip() == current.src_ip();
            let same_dst = other.dst_ip() == current.dst_ip();
            if same_src && other.service == current.service {
                agg.ct_srv_src += 1;
            }
            if other.state == current.state
                && other.sttl == current.sttl
                && other.dttl == current.dttl
            {
                agg.ct_state_ttl += 1;
            }
            if same_dst {
                agg.ct_dst_ltm += 1;
                if other.sport() == current.sport() {
                    agg.ct_dst_sport_ltm += 1;
                }
            }
            if same_src {
                agg.ct_src_ltm += 1;
            }
        }
        agg
    }
}
