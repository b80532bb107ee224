//! Per-batch grouping of packets into bidirectional flows.

use super::FlowKey;
use crate::packet::PacketObservation;
use std::collections::BTreeMap;

/// A packet folded into a flow, with its direction relative to the key.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPacket {
    pub ts: f64,
    pub forward: bool,
    pub packet: PacketObservation,
}

/// All packets of one flow within one batch. Never empty once built by `FlowTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowAccumulator {
    key: FlowKey,
    packets: Vec<FlowPacket>,
}

impl FlowAccumulator {
    pub fn new(key: FlowKey, first: FlowPacket) -> Self {
        Self {
            key,
            packets: vec![first],
        }
    }

    pub fn push(&mut self, packet: FlowPacket) {
        self.packets.push(packet);
    }

    /// Stable sort by timestamp; packets with equal timestamps keep arrival order.
    pub fn sort(&mut self) {
        self.packets.sort_by(|a, b| a.ts.total_cmp(&b.ts));
    }

    pub fn key(&self) -> &FlowKey {
        &self.key
    }

    pub fn packets(&self) -> &[FlowPacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn first_ts(&self) -> f64 {
        self.packets.first().map(|p| p.ts).unwrap_or(0.0)
    }

    pub fn last_ts(&self) -> f64 {
        self.packets.last().map(|p| p.ts).unwrap_or(0.0)
    }

    pub fn forward(&self) -> impl Iterator<Item = &FlowPacket> {
        self.packets.iter().filter(|p| p.forward)
    }

    pub fn backward(&self) -> impl Iterator<Item = &FlowPacket> {
        self.packets.iter().filter(|p| !p.forward)
    }
}

/// Flows of one capture batch, keyed canonically. Ordered map so iteration is reproducible.
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: BTreeMap<FlowKey, FlowAccumulator>,
    dropped: usize,
}

impl FlowTable {
    /// Group a batch in arrival order, then sort every flow by timestamp.
    pub fn from_packets(packets: impl IntoIterator<Item = PacketObservation>) -> Self {
        let mut table = FlowTable::default();
        for pkt in packets {
            table.insert(pkt);
        }
        table.sort();
        table
    }

    /// Add one packet; returns false when the packet was dropped as a non-flow packet.
    pub fn insert(&mut self, packet: PacketObservation) -> bool {
        let Some((key, forward)) = FlowKey::resolve(&packet) else {
            self.dropped += 1;
            return false;
        };
        let entry = FlowPacket {
            ts: packet.ts,
            forward,
            packet,
        };
        match self.flows.get_mut(&key) {
            Some(acc) => acc.push(entry),
            None => {
                self.flows.insert(key, FlowAccumulator::new(key, entry));
            }
        }
        true
    }

    pub fn sort(&mut self) {
        for acc in self.flows.values_mut() {
            acc.sort();
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Packets rejected by the key resolver
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowAccumulator> {
        self.flows.values()
    }

    pub fn into_flows(self) -> Vec<FlowAccumulator> {
        self.flows.into_values().collect()
    }
}
