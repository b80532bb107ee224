//! Flow accumulator → per-flow feature record.

use super::{FlowFeatures, FlowState, HandshakeTiming, IatStats};
use crate::flow::{FlowAccumulator, FlowPacket, Protocol};
use crate::packet::{TcpFlags, TcpSegment};

/// Lower bound for flow duration, keeps rates finite for single-packet flows
pub const MIN_DURATION_SECS: f64 = 1e-6;

const SERVICES: &[(u16, &str)] = &[
    (80, "http"),
    (443, "https"),
    (53, "dns"),
    (22, "ssh"),
    (21, "ftp"),
    (25, "smtp"),
    (110, "pop3"),
    (6667, "irc"),
    (161, "snmp"),
    (1812, "radius"),
    (20, "ftp-data"),
];

/// Service name for a port pair: the lower port decides. Unknown ports map to "-".
pub fn service_for_ports(sport: u16, dport: u16) -> &'static str {
    let port = if sport == dport { sport } else { sport.min(dport) };
    SERVICES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("-")
}

/// Stateless; every call is a pure function of the accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCalculator;

impl FeatureCalculator {
    /// Derive the per-flow features. The accumulator must already be time-sorted.
    pub fn compute(&self, flow: &FlowAccumulator) -> FlowFeatures {
        let key = *flow.key();
        let packets = flow.packets();
        let first_ts = flow.first_ts();
        let last_ts = flow.last_ts();
        let dur = (last_ts - first_ts).max(MIN_DURATION_SECS);

        let spkts = flow.forward().count() as u64;
        let sbytes: u64 = flow.forward().map(|p| p.packet.len as u64).sum();
        let dbytes: u64 = flow.backward().map(|p| p.packet.len as u64).sum();

        let rate = |bytes: u64| if dur > 0.0 { bytes as f64 * 8.0 / dur } else { 0.0 };

        let src_times: Vec<f64> = flow.forward().map(|p| p.ts).collect();
        let dst_times: Vec<f64> = flow.backward().map(|p| p.ts).collect();
        let src_iat = IatStats::from_timestamps(&src_times);
        let dst_iat = IatStats::from_timestamps(&dst_times);

        let (swin, stcpb, dtcpb, handshake) = if key.protocol == Protocol::Tcp {
            (
                tcp_segments(packets, true).map(|t| t.window).max().unwrap_or(0),
                tcp_segments(packets, true).next().map(|t| t.seq).unwrap_or(0),
                tcp_segments(packets, false).next().map(|t| t.seq).unwrap_or(0),
                HandshakeTiming::scan(packets),
            )
        } else {
            (0, 0, 0, HandshakeTiming::default())
        };

        let sttl = flow.forward().filter_map(|p| p.packet.ttl()).max().unwrap_or(0);
        let dttl = flow.backward().filter_map(|p| p.packet.ttl()).max().unwrap_or(0);

        let smeansz = if spkts > 0 {
            sbytes as f64 / spkts as f64
        } else {
            0.0
        };
        // Denominator counts forward packets too; kept for compatibility with trained models.
        let dmeansz = if !dst_times.is_empty() {
            dbytes as f64 / (spkts + dst_times.len() as u64) as f64
        } else {
            0.0
        };

        let service = service_for_ports(key.port_a, key.port_b);
        let state = state_of(key.protocol, packets);

        let res_bdy_len = if service == "http" {
            flow.backward()
                .filter(|p| p.packet.http_response)
                .map(|p| p.packet.payload_len.unwrap_or(0) as u64)
                .sum()
        } else {
            0
        };

        let is_sm_ips_ports = u8::from(key.ip_a == key.ip_b && key.port_a == key.port_b);

        FlowFeatures {
            key,
            last_ts,
            state,
            dur,
            sbytes,
            dbytes,
            sttl,
            dttl,
            service,
            sload: rate(sbytes),
            dload: rate(dbytes),
            spkts,
            swin,
            stcpb,
            dtcpb,
            smeansz,
            dmeansz,
            trans_depth: 0,
            res_bdy_len,
            sjit: src_iat.jitter_ms,
            djit: dst_iat.jitter_ms,
            sintpkt: src_iat.mean_ms,
            dintpkt: dst_iat.mean_ms,
            tcprtt: handshake.rtt(),
            synack: handshake.synack,
            ackdat: handshake.ackdat,
            is_sm_ips_ports,
        }
    }
}

fn tcp_segments(packets: &[FlowPacket], forward: bool) -> impl Iterator<Item = &TcpSegment> + '_ {
    packets
        .iter()
        .filter(move |p| p.forward == forward)
        .filter_map(|p| p.packet.tcp())
}

fn state_of(protocol: Protocol, packets: &[FlowPacket]) -> FlowState {
    match protocol {
        Protocol::Tcp => {
            let seen = packets
                .iter()
                .filter_map(|p| p.packet.tcp())
                .fold(TcpFlags::empty(), |acc, tcp| acc | tcp.flags);
            FlowState::from_tcp_flags(seen)
        }
        Protocol::Udp => {
            let fwd = packets.iter().any(|p| p.forward);
            let bwd = packets.iter().any(|p| !p.forward);
            if fwd && bwd {
                FlowState::Con
            } else {
                FlowState::Int
            }
        }
        Protocol::Icmp => FlowState::No,
    }
}
