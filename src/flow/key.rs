//! Direction-independent flow identity.

use crate::packet::{PacketObservation, IPPROTO_ICMP, IPPROTO_TCP, IPPROTO_UDP};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            IPPROTO_TCP => Some(Protocol::Tcp),
            IPPROTO_UDP => Some(Protocol::Udp),
            IPPROTO_ICMP => Some(Protocol::Icmp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical 5-tuple. Side A is the endpoint whose `(address text, port)` sorts first,
/// and is reported as the flow's source. The derived `Ord` only orders keys in maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub ip_a: IpAddr,
    pub port_a: u16,
    pub ip_b: IpAddr,
    pub port_b: u16,
    pub protocol: Protocol,
}

impl FlowKey {
    /// Resolve a packet to its flow key and direction.
    ///
    /// Returns `None` for packets that cannot belong to a flow: no IP layer, a protocol
    /// other than TCP/UDP/ICMP, or TCP/UDP without the matching transport header.
    /// `is_forward` holds when the packet's own `(src, sport)` sorts strictly before
    /// `(dst, dport)`, comparing addresses in their printed form (so `10.0.0.10` sorts
    /// before `10.0.0.9`). A packet addressed to its own endpoint is backward.
    pub fn resolve(pkt: &PacketObservation) -> Option<(FlowKey, bool)> {
        let ip = pkt.ip.as_ref()?;
        let protocol = Protocol::from_number(ip.protocol)?;
        let (sport, dport) = match protocol {
            Protocol::Tcp => {
                let tcp = pkt.tcp()?;
                (tcp.src_port, tcp.dst_port)
            }
            Protocol::Udp => {
                let udp = pkt.udp()?;
                (udp.src_port, udp.dst_port)
            }
            Protocol::Icmp => (0, 0),
        };

        let is_forward = (ip.src.to_string(), sport) < (ip.dst.to_string(), dport);
        let src = (ip.src, sport);
        let dst = (ip.dst, dport);
        let ((ip_a, port_a), (ip_b, port_b)) = if is_forward { (src, dst) } else { (dst, src) };
        Some((
            FlowKey {
                ip_a,
                port_a,
                ip_b,
                port_b,
                protocol,
            },
            is_forward,
        ))
    }

    pub fn src(&self) -> (IpAddr, u16) {
        (self.ip_a, self.port_a)
    }

    pub fn dst(&self) -> (IpAddr, u16) {
        (self.ip_b, self.port_b)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} <-> {}:{}",
            self.protocol, self.ip_a, self.port_a, self.ip_b, self.port_b
        )
    }
}
