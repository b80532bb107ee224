//! Final feature rows: fixed field set and order shared with downstream classifiers.

mod sink;

pub use sink::{OutputFormat, RowSink};

use crate::features::{FlowAggregates, FlowFeatures, FlowState};
use crate::flow::Protocol;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Bumped whenever `FIELD_NAMES` changes
pub const SCHEMA_VERSION: u32 = 1;

pub const FIELD_NAMES: [&str; 33] = [
    "src_ip",
    "dst_ip",
    "proto",
    "state",
    "dur",
    "sbytes",
    "dbytes",
    "sttl",
    "dttl",
    "service",
    "sload",
    "dload",
    "spkts",
    "swin",
    "stcpb",
    "dtcpb",
    "smeansz",
    "dmeansz",
    "trans_depth",
    "res_bdy_len",
    "sjit",
    "djit",
    "sintpkt",
    "dintpkt",
    "tcprtt",
    "synack",
    "ackdat",
    "is_sm_ips_ports",
    "ct_state_ttl",
    "ct_srv_src",
    "ct_dst_ltm",
    "ct_src_ltm",
    "ct_dst_sport_ltm",
];

/// One exported flow. Field declaration order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub proto: Protocol,
    pub state: FlowState,
    pub dur: f64,
    pub sbytes: u64,
    pub dbytes: u64,
    pub sttl: u8,
    pub dttl: u8,
    pub service: String,
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
    pub ct_state_ttl: u32,
    pub ct_srv_src: u32,
    pub ct_dst_ltm: u32,
    pub ct_src_ltm: u32,
    pub ct_dst_sport_ltm: u32,
}

impl FeatureRow {
    pub fn assemble(flow: &FlowFeatures, agg: FlowAggregates) -> Self {
        Self {
            src_ip: flow.src_ip(),
            dst_ip: flow.dst_ip(),
            proto: flow.proto(),
            state: flow.state,
            dur: flow.dur,
            sbytes: flow.sbytes,
            dbytes: flow.dbytes,
            sttl: flow.sttl,
            dttl: flow.dttl,
            service: flow.service.to_string(),
            sload: flow.sload,
            dload: flow.dload,
            spkts: flow.spkts,
            swin: flow.swin,
            stcpb: flow.stcpb,
            dtcpb: flow.dtcpb,
            smeansz: flow.smeansz,
            dmeansz: flow.dmeansz,
            trans_depth: flow.trans_depth,
            res_bdy_len: flow.res_bdy_len,
            sjit: flow.sjit,
            djit: flow.djit,
            sintpkt: flow.sintpkt,
            dintpkt: flow.dintpkt,
            tcprtt: flow.tcprtt,
            synack: flow.synack,
            ackdat: flow.ackdat,
            is_sm_ips_ports: flow.is_sm_ips_ports,
            ct_state_ttl: agg.ct_state_ttl,
            ct_srv_src: agg.ct_srv_src,
            ct_dst_ltm: agg.ct_dst_ltm,
            ct_src_ltm: agg.ct_src_ltm,
            ct_dst_sport_ltm: agg.ct_dst_sport_ltm,
        }
    }
}
