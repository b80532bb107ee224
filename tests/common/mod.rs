#![allow(dead_code)]

use flowfeat::packet::{
    IpLayer, PacketObservation, TcpFlags, TcpSegment, Transport, UdpDatagram, IPPROTO_ICMP,
    IPPROTO_TCP, IPPROTO_UDP,
};
use std::net::IpAddr;

pub const CLIENT: &str = "10.0.0.1";
pub const SERVER: &str = "10.0.0.2";

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn tcp(
    ts: f64,
    src: (&str, u16),
    dst: (&str, u16),
    flags: TcpFlags,
    seq: u32,
    window: u16,
) -> PacketObservation {
    PacketObservation {
        ts,
        len: 60,
        ip: Some(IpLayer {
            src: ip(src.0),
            dst: ip(dst.0),
            protocol: IPPROTO_TCP,
            ttl: 64,
        }),
        transport: Some(Transport::Tcp(TcpSegment {
            src_port: src.1,
            dst_port: dst.1,
            flags,
            seq,
            window,
        })),
        payload_len: None,
        http_response: false,
    }
}

pub fn udp(ts: f64, src: (&str, u16), dst: (&str, u16), len: u32) -> PacketObservation {
    PacketObservation {
        ts,
        len,
        ip: Some(IpLayer {
            src: ip(src.0),
            dst: ip(dst.0),
            protocol: IPPROTO_UDP,
            ttl: 64,
        }),
        transport: Some(Transport::Udp(UdpDatagram {
            src_port: src.1,
            dst_port: dst.1,
        })),
        payload_len: None,
        http_response: false,
    }
}

pub fn icmp(ts: f64, src: &str, dst: &str) -> PacketObservation {
    PacketObservation {
        ts,
        len: 98,
        ip: Some(IpLayer {
            src: ip(src),
            dst: ip(dst),
            protocol: IPPROTO_ICMP,
            ttl: 64,
        }),
        transport: None,
        payload_len: None,
        http_response: false,
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
