//! Per-flow statistical features and cross-flow temporal aggregates.

mod calculator;
mod pipeline;
mod temporal;
mod timing;

pub use calculator::{service_for_ports, FeatureCalculator};
pub use pipeline::{BatchReport, FlowEngine};
pub use temporal::{FlowAggregates, TemporalAggregator, DEFAULT_WINDOW_FLOWS};
pub use timing::{HandshakeTiming, IatStats};

use crate::flow::{FlowKey, Protocol};
use crate::packet::TcpFlags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Coarse connection state label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    #[serde(rename = "FIN")]
    Fin,
    #[serde(rename = "CON")]
    Con,
    #[serde(rename = "RST")]
    Rst,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "no")]
    No,
}

impl FlowState {
    /// Classify the union of every TCP flag seen in a flow. FIN wins over an
    /// established SYN+ACK, which wins over RST.
    pub fn from_tcp_flags(seen: TcpFlags) -> Self {
        if seen.contains(TcpFlags::FIN) {
            FlowState::Fin
        } else if seen.contains(TcpFlags::SYN | TcpFlags::ACK) {
            FlowState::Con
        } else if seen.contains(TcpFlags::RST) {
            FlowState::Rst
        } else {
            FlowState::Int
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Fin => "FIN",
            FlowState::Con => "CON",
            FlowState::Rst => "RST",
            FlowState::Int => "INT",
            FlowState::No => "no",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything derived from a single flow, before cross-flow aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowFeatures {
    pub key: FlowKey,
    /// Timestamp of the flow's last packet; orders flows for the temporal window
    pub last_ts: f64,
    pub state: FlowState,
    pub dur: f64,
    pub sbytes: u64,
    pub dbytes: u64,
    pub sttl: u8,
    pub dttl: u8,
    pub service: &'static str,
    pub sload: f64,
    pub dload: f64,
    pub spkts: u64,
    pub swin: u16,
    pub stcpb: u32,
    pub dtcpb: u32,
    pub smeansz: f64,
    pub dmeansz: f64,
    pub trans_depth: u32,
    pub res_bdy_len: u64,
    pub sjit: f64,
    pub djit: f64,
    pub sintpkt: f64,
    pub dintpkt: f64,
    pub tcprtt: f64,
    pub synack: f64,
    pub ackdat: f64,
    pub is_sm_ips_ports: u8,
}

impl FlowFeatures {
    pub fn src_ip(&self) -> IpAddr {
        self.key.ip_a
    }

    pub fn dst_ip(&self) -> IpAddr {
        self.key.ip_b
    }

    pub fn sport(&self) -> u16 {
        self.key.port_a
    }

    pub fn dport(&self) -> u16 {
        self.key.port_b
    }

    pub fn proto(&self) -> Protocol {
        self.key.protocol
    }
}
