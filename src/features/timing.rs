//! Inter-arrival statistics and the TCP handshake timing heuristic.

use crate::flow::FlowPacket;

/// Mean and sample standard deviation of inter-arrival times, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IatStats {
    pub mean_ms: f64,
    pub jitter_ms: f64,
}

impl IatStats {
    /// `timestamps` must be sorted ascending. Fewer than two timestamps give zeros;
    /// jitter needs at least two gaps (three timestamps).
    pub fn from_timestamps(timestamps: &[f64]) -> Self {
        if timestamps.len() < 2 {
            return Self::default();
        }
        let iats: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        let n = iats.len() as f64;
        let mean = iats.iter().sum::<f64>() / n;
        let variance = if iats.len() > 1 {
            iats.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        Self {
            mean_ms: mean * 1000.0,
            jitter_ms: variance.sqrt() * 1000.0,
        }
    }
}

/// Handshake timings in seconds; zero where the matching packets were not seen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandshakeTiming {
    pub synack: f64,
    pub ackdat: f64,
}

impl HandshakeTiming {
    /// Best-effort scan over time-ordered packets. Takes the first forward SYN (no ACK),
    /// the first backward SYN+ACK, then the first forward ACK (no SYN) once a SYN+ACK has
    /// been seen, and stops there. Retransmissions and reused keys are not disambiguated.
    pub fn scan(packets: &[FlowPacket]) -> Self {
        let mut syn_time: Option<f64> = None;
        let mut synack_time: Option<f64> = None;
        let mut ack_time: Option<f64> = None;

        for p in packets {
            let Some(tcp) = p.packet.tcp() else {
                continue;
            };
            let flags = tcp.flags;
            if p.forward && flags.syn() && !flags.ack() {
                syn_time.get_or_insert(p.ts);
            } else if !p.forward && flags.syn() && flags.ack() {
                synack_time.get_or_insert(p.ts);
            } else if p.forward && flags.ack() && !flags.syn() && synack_time.is_some() {
                ack_time = Some(p.ts);
                break;
            }
        }

        let synack = match (syn_time, synack_time) {
            (Some(syn), Some(synack)) => synack - syn,
            _ => 0.0,
        };
        let ackdat = match (synack_time, ack_time) {
            (Some(synack), Some(ack)) => ack - synack,
            _ => 0.0,
        };
        Self { synack, ackdat }
    }

    pub fn rtt(&self) -> f64 {
        self.synack + self.ackdat
    }
}
