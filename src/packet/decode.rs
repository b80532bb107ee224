//! Raw frame decoding into `PacketObservation` (etherparse slices, no copies of payload).

use super::{IpLayer, PacketObservation, TcpFlags, TcpSegment, Transport, UdpDatagram};
use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use std::net::IpAddr;

const HTTP_RESPONSE_PREFIX: &[u8] = b"HTTP/";
const HTTP_HEADER_END: &[u8] = b"\r\n\r\n";

/// Decodes captured frames. Stateless; one decoder can be shared between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode an Ethernet II frame. Returns `None` only if the frame cannot be sliced at all;
    /// non-IP frames come back as observations without an IP layer.
    pub fn decode_ethernet(&self, ts: f64, frame: &[u8]) -> Option<PacketObservation> {
        match SlicedPacket::from_ethernet(frame) {
            Ok(sliced) => Some(observe(ts, frame.len(), &sliced)),
            Err(e) => {
                tracing::trace!(error = %e, len = frame.len(), "undecodable ethernet frame");
                None
            }
        }
    }

    /// Decode a frame that starts directly at the IP header (raw link type).
    pub fn decode_ip(&self, ts: f64, packet: &[u8]) -> Option<PacketObservation> {
        match SlicedPacket::from_ip(packet) {
            Ok(sliced) => Some(observe(ts, packet.len(), &sliced)),
            Err(e) => {
                tracing::trace!(error = %e, len = packet.len(), "undecodable ip packet");
                None
            }
        }
    }
}

fn observe(ts: f64, len: usize, sliced: &SlicedPacket<'_>) -> PacketObservation {
    let ip = match &sliced.net {
        Some(NetSlice::Ipv4(ipv4)) => {
            let header = ipv4.header();
            Some(IpLayer {
                src: IpAddr::from(header.source_addr()),
                dst: IpAddr::from(header.destination_addr()),
                protocol: header.protocol().0,
                ttl: header.ttl(),
            })
        }
        Some(NetSlice::Ipv6(ipv6)) => {
            let header = ipv6.header();
            Some(IpLayer {
                src: IpAddr::from(header.source_addr()),
                dst: IpAddr::from(header.destination_addr()),
                // transport protocol after any extension headers
                protocol: ipv6.payload().ip_number.0,
                ttl: header.hop_limit(),
            })
        }
        _ => None,
    };

    let (transport, payload): (Option<Transport>, &[u8]) = match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            let mut flags = TcpFlags::empty();
            for (set, flag) in [
                (tcp.fin(), TcpFlags::FIN),
                (tcp.syn(), TcpFlags::SYN),
                (tcp.rst(), TcpFlags::RST),
                (tcp.psh(), TcpFlags::PSH),
                (tcp.ack(), TcpFlags::ACK),
                (tcp.urg(), TcpFlags::URG),
                (tcp.ece(), TcpFlags::ECE),
                (tcp.cwr(), TcpFlags::CWR),
            ] {
                if set {
                    flags |= flag;
                }
            }
            let segment = TcpSegment {
                src_port: tcp.source_port(),
                dst_port: tcp.destination_port(),
                flags,
                seq: tcp.sequence_number(),
                window: tcp.window_size(),
            };
            (Some(Transport::Tcp(segment)), tcp.payload())
        }
        Some(TransportSlice::Udp(udp)) => {
            let datagram = UdpDatagram {
                src_port: udp.source_port(),
                dst_port: udp.destination_port(),
            };
            (Some(Transport::Udp(datagram)), udp.payload())
        }
        _ => (None, &[]),
    };

    let (payload_len, http_response) = match http_response_body(payload) {
        Some(body) => (Some(body.len() as u32), true),
        None if payload.is_empty() => (None, false),
        None => (Some(payload.len() as u32), false),
    };

    PacketObservation {
        ts,
        len: len as u32,
        ip,
        transport,
        payload_len,
        http_response,
    }
}

/// Body of an HTTP response carried in a single segment. Headers must be complete.
fn http_response_body(payload: &[u8]) -> Option<&[u8]> {
    if !payload.starts_with(HTTP_RESPONSE_PREFIX) {
        return None;
    }
    let end = payload
        .windows(HTTP_HEADER_END.len())
        .position(|w| w == HTTP_HEADER_END)?;
    Some(&payload[end + HTTP_HEADER_END.len()..])
}
