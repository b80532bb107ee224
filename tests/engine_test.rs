//! Flow keys, per-flow features and temporal counts on hand-built batches.

mod common;

use common::{approx, icmp, ip, tcp, udp, CLIENT, SERVER};
use flowfeat::config::FeaturesConfig;
use flowfeat::features::{FeatureCalculator, FlowEngine, FlowFeatures, FlowState};
use flowfeat::flow::{FlowKey, FlowTable, Protocol};
use flowfeat::packet::{IpLayer, PacketObservation, TcpFlags, IPPROTO_TCP};
use flowfeat::EngineError;

fn single_flow(packets: Vec<PacketObservation>) -> FlowFeatures {
    let table = FlowTable::from_packets(packets);
    assert_eq!(table.len(), 1);
    let flow = table.iter().next().unwrap();
    FeatureCalculator.compute(flow)
}

fn sequential_engine() -> FlowEngine {
    FlowEngine::new(FeaturesConfig {
        workers: 1,
        ..FeaturesConfig::default()
    })
    .unwrap()
}

#[test]
fn key_is_direction_independent() {
    let out = tcp(0.0, (CLIENT, 40000), (SERVER, 80), TcpFlags::SYN, 1, 1024);
    let back = tcp(0.1, (SERVER, 80), (CLIENT, 40000), TcpFlags::SYN | TcpFlags::ACK, 9, 512);

    let (k1, fwd1) = FlowKey::resolve(&out).unwrap();
    let (k2, fwd2) = FlowKey::resolve(&back).unwrap();
    assert!(fwd1);
    assert!(!fwd2);
    assert_eq!(k1, k2);
    assert_eq!(k1.src(), (ip(CLIENT), 40000));
    assert_eq!(k1.dst(), (ip(SERVER), 80));
    assert_eq!(k1.protocol, Protocol::Tcp);
}

#[test]
fn key_orders_by_ip_before_port() {
    // Lower address wins even with the higher port
    let pkt = udp(0.0, (SERVER, 53), (CLIENT, 60000), 80);
    let (key, forward) = FlowKey::resolve(&pkt).unwrap();
    assert!(!forward);
    assert_eq!(key.src(), (ip(CLIENT), 60000));

    let same_ip = udp(0.0, (CLIENT, 9000), (CLIENT, 53), 80);
    let (key, forward) = FlowKey::resolve(&same_ip).unwrap();
    assert!(!forward);
    assert_eq!(key.port_a, 53);
}

#[test]
fn key_compares_addresses_as_text() {
    // "10.0.0.10" < "10.0.0.9" character by character
    let query = udp(0.0, ("10.0.0.9", 5000), ("10.0.0.10", 53), 60);
    let (key, forward) = FlowKey::resolve(&query).unwrap();
    assert!(!forward);
    assert_eq!(key.src(), (ip("10.0.0.10"), 53));
    assert_eq!(key.dst(), (ip("10.0.0.9"), 5000));

    let reply = udp(0.1, ("10.0.0.10", 53), ("10.0.0.9", 5000), 90);
    let (back, forward) = FlowKey::resolve(&reply).unwrap();
    assert!(forward);
    assert_eq!(back, key);

    let row = &sequential_engine().rows(vec![query, reply]).unwrap()[0];
    assert_eq!(row.src_ip, ip("10.0.0.10"));
    assert_eq!(row.sbytes, 90);
    assert_eq!(row.dbytes, 60);
}

#[test]
fn non_flow_packets_are_dropped() {
    let no_ip = PacketObservation {
        ts: 0.0,
        len: 42,
        ip: None,
        transport: None,
        payload_len: None,
        http_response: false,
    };
    let tcp_without_header = PacketObservation {
        ip: Some(IpLayer {
            src: ip(CLIENT),
            dst: ip(SERVER),
            protocol: IPPROTO_TCP,
            ttl: 64,
        }),
        ..no_ip.clone()
    };
    let gre = PacketObservation {
        ip: Some(IpLayer {
            src: ip(CLIENT),
            dst: ip(SERVER),
            protocol: 47,
            ttl: 64,
        }),
        ..no_ip.clone()
    };
    let udp_with_tcp_proto = PacketObservation {
        ip: Some(IpLayer {
            protocol: IPPROTO_TCP,
            ..udp(0.0, (CLIENT, 1), (SERVER, 2), 60).ip.unwrap()
        }),
        ..udp(0.0, (CLIENT, 1), (SERVER, 2), 60)
    };

    for pkt in [&no_ip, &tcp_without_header, &gre, &udp_with_tcp_proto] {
        assert!(FlowKey::resolve(pkt).is_none());
    }

    let table = FlowTable::from_packets(vec![
        no_ip,
        tcp_without_header,
        gre,
        udp_with_tcp_proto,
        udp(0.0, (CLIENT, 1000), (SERVER, 53), 70),
    ]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.dropped(), 4);
}

#[test]
fn single_syn_is_int_with_zero_timings() {
    let f = single_flow(vec![tcp(5.0, (CLIENT, 40000), (SERVER, 22), TcpFlags::SYN, 7, 100)]);
    assert_eq!(f.state, FlowState::Int);
    assert_eq!(f.sjit, 0.0);
    assert_eq!(f.sintpkt, 0.0);
    assert_eq!(f.tcprtt, 0.0);
    assert_eq!(f.dur, 1e-6);
    assert_eq!(f.spkts, 1);
    assert_eq!(f.service, "ssh");
    assert_eq!(f.stcpb, 7);
    assert_eq!(f.dtcpb, 0);
    assert_eq!(f.dmeansz, 0.0);
}

#[test]
fn forward_inter_arrival_and_jitter() {
    let f = single_flow(vec![
        udp(0.0, (CLIENT, 5000), (SERVER, 161), 100),
        udp(0.1, (CLIENT, 5000), (SERVER, 161), 100),
        udp(0.2, (CLIENT, 5000), (SERVER, 161), 100),
    ]);
    assert!(approx(f.sintpkt, 100.0));
    assert!(f.sjit.abs() < 1e-6);
    assert_eq!(f.dintpkt, 0.0);
    assert_eq!(f.djit, 0.0);
    assert!(approx(f.dur, 0.2));
    assert_eq!(f.sbytes, 300);
    assert!(approx(f.sload, 300.0 * 8.0 / 0.2));
    assert_eq!(f.dload, 0.0);
    assert_eq!(f.service, "snmp");
}

#[test]
fn handshake_timings() {
    let f = single_flow(vec![
        tcp(0.0, (CLIENT, 40000), (SERVER, 80), TcpFlags::SYN, 100, 1024),
        tcp(0.05, (SERVER, 80), (CLIENT, 40000), TcpFlags::SYN | TcpFlags::ACK, 900, 2048),
        tcp(0.08, (CLIENT, 40000), (SERVER, 80), TcpFlags::ACK, 101, 4096),
    ]);
    assert!(approx(f.synack, 0.05));
    assert!(approx(f.ackdat, 0.03));
    assert!(approx(f.tcprtt, 0.08));
    assert_eq!(f.state, FlowState::Con);
    assert_eq!(f.swin, 4096);
    assert_eq!(f.stcpb, 100);
    assert_eq!(f.dtcpb, 900);
}

#[test]
fn handshake_takes_first_syn_and_stops_at_first_ack() {
    let f = single_flow(vec![
        tcp(0.0, (CLIENT, 40000), (SERVER, 80), TcpFlags::SYN, 1, 10),
        tcp(1.0, (CLIENT, 40000), (SERVER, 80), TcpFlags::SYN, 1, 10),
        tcp(1.5, (SERVER, 80), (CLIENT, 40000), TcpFlags::SYN | TcpFlags::ACK, 5, 10),
        tcp(1.7, (CLIENT, 40000), (SERVER, 80), TcpFlags::ACK, 2, 10),
        tcp(1.9, (CLIENT, 40000), (SERVER, 80), TcpFlags::ACK, 2, 10),
    ]);
    assert!(approx(f.synack, 1.5));
    assert!(approx(f.ackdat, 0.2));
}

#[test]
fn ack_before_synack_is_ignored() {
    let f = single_flow(vec![
        tcp(0.0, (CLIENT, 40000), (SERVER, 80), TcpFlags::ACK, 1, 10),
        tcp(0.1, (SERVER, 80), (CLIENT, 40000), TcpFlags::SYN | TcpFlags::ACK, 5, 10),
    ]);
    assert_eq!(f.synack, 0.0);
    assert_eq!(f.ackdat, 0.0);
    assert_eq!(f.tcprtt, 0.0);
}

#[test]
fn tcp_state_priority() {
    let fin = single_flow(vec![
        tcp(0.0, (CLIENT, 1), (SERVER, 2), TcpFlags::SYN, 0, 0),
        tcp(0.1, (SERVER, 2), (CLIENT, 1), TcpFlags::SYN | TcpFlags::ACK, 0, 0),
        tcp(0.2, (CLIENT, 1), (SERVER, 2), TcpFlags::FIN | TcpFlags::ACK, 0, 0),
    ]);
    assert_eq!(fin.state, FlowState::Fin);

    let rst_after_con = single_flow(vec![
        tcp(0.0, (CLIENT, 1), (SERVER, 2), TcpFlags::SYN, 0, 0),
        tcp(0.1, (SERVER, 2), (CLIENT, 1), TcpFlags::SYN | TcpFlags::ACK, 0, 0),
        tcp(0.2, (CLIENT, 1), (SERVER, 2), TcpFlags::RST, 0, 0),
    ]);
    assert_eq!(rst_after_con.state, FlowState::Con);

    let rst = single_flow(vec![
        tcp(0.0, (CLIENT, 1), (SERVER, 2), TcpFlags::SYN, 0, 0),
        tcp(0.1, (SERVER, 2), (CLIENT, 1), TcpFlags::RST, 0, 0),
    ]);
    assert_eq!(rst.state, FlowState::Rst);
}

#[test]
fn udp_state_needs_both_directions() {
    let one_way = single_flow(vec![
        udp(0.0, (CLIENT, 5353), (SERVER, 53), 70),
        udp(0.5, (CLIENT, 5353), (SERVER, 53), 70),
    ]);
    assert_eq!(one_way.state, FlowState::Int);

    let both = single_flow(vec![
        udp(0.0, (CLIENT, 5353), (SERVER, 53), 70),
        udp(0.01, (SERVER, 53), (CLIENT, 5353), 200),
    ]);
    assert_eq!(both.state, FlowState::Con);
    assert_eq!(both.service, "dns");
    assert_eq!(both.dbytes, 200);
}

#[test]
fn icmp_flows() {
    let f = single_flow(vec![
        icmp(0.0, CLIENT, SERVER),
        icmp(0.001, SERVER, CLIENT),
        icmp(1.0, CLIENT, SERVER),
    ]);
    assert_eq!(f.state, FlowState::No);
    assert_eq!(f.sport(), 0);
    assert_eq!(f.dport(), 0);
    assert_eq!(f.proto(), Protocol::Icmp);
    assert_eq!(f.swin, 0);
    assert_eq!(f.tcprtt, 0.0);
}

#[test]
fn packets_are_sorted_before_derivation() {
    let f = single_flow(vec![
        udp(3.0, (CLIENT, 5000), (SERVER, 9999), 10),
        udp(1.0, (CLIENT, 5000), (SERVER, 9999), 10),
        udp(2.0, (CLIENT, 5000), (SERVER, 9999), 10),
    ]);
    assert!(approx(f.dur, 2.0));
    assert!(approx(f.sintpkt, 1000.0));
    assert_eq!(f.last_ts, 3.0);
    assert_eq!(f.service, "-");
}

#[test]
fn mean_sizes_and_ttls() {
    let mut late = udp(0.2, (SERVER, 9000), (CLIENT, 5000), 100);
    late.ip.as_mut().unwrap().ttl = 128;
    let mut early = udp(0.0, (CLIENT, 5000), (SERVER, 9000), 60);
    early.ip.as_mut().unwrap().ttl = 32;
    let f = single_flow(vec![early, udp(0.1, (CLIENT, 5000), (SERVER, 9000), 60), late]);

    assert_eq!(f.spkts, 2);
    assert!(approx(f.smeansz, 60.0));
    // backward bytes over forward + backward packet count
    assert!(approx(f.dmeansz, 100.0 / 3.0));
    assert_eq!(f.sttl, 64);
    assert_eq!(f.dttl, 128);
}

#[test]
fn response_body_only_counted_for_http() {
    let response = |port: u16, ts: f64| {
        let mut p = tcp(ts, (SERVER, port), (CLIENT, 50000), TcpFlags::ACK, 0, 0);
        p.payload_len = Some(500);
        p.http_response = true;
        p
    };
    let mut request = tcp(0.0, (CLIENT, 50000), (SERVER, 80), TcpFlags::ACK, 0, 0);
    request.payload_len = Some(120);

    let http = single_flow(vec![request.clone(), response(80, 0.1), response(80, 0.2)]);
    assert_eq!(http.service, "http");
    assert_eq!(http.res_bdy_len, 1000);
    assert_eq!(http.trans_depth, 0);

    let mut other = request;
    if let Some(flowfeat::packet::Transport::Tcp(t)) = other.transport.as_mut() {
        t.dst_port = 8080;
    }
    let alt = single_flow(vec![other, response(8080, 0.1)]);
    assert_eq!(alt.service, "-");
    assert_eq!(alt.res_bdy_len, 0);
}

#[test]
fn same_endpoint_flow() {
    let f = single_flow(vec![
        udp(0.0, (CLIENT, 7000), (CLIENT, 7000), 50),
        udp(0.1, (CLIENT, 7000), (CLIENT, 7000), 50),
    ]);
    assert_eq!(f.is_sm_ips_ports, 1);
    // identical endpoints never sort strictly lower, so both count as backward
    assert_eq!(f.spkts, 0);
    assert_eq!(f.dbytes, 100);
}

#[test]
fn calculator_is_deterministic() {
    let table = FlowTable::from_packets(vec![
        tcp(0.0, (CLIENT, 40000), (SERVER, 443), TcpFlags::SYN, 1, 10),
        tcp(0.02, (SERVER, 443), (CLIENT, 40000), TcpFlags::SYN | TcpFlags::ACK, 2, 20),
        tcp(0.03, (CLIENT, 40000), (SERVER, 443), TcpFlags::ACK, 3, 30),
        tcp(0.5, (SERVER, 443), (CLIENT, 40000), TcpFlags::PSH | TcpFlags::ACK, 4, 40),
    ]);
    let flow = table.iter().next().unwrap();
    let a = FeatureCalculator.compute(flow);
    let b = FeatureCalculator.compute(flow);
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn temporal_window_is_bounded() {
    // 150 single-packet flows from the same source, ending at t = 0..149.
    // Flows 0..50 and the last flow share a destination nobody else uses.
    let mut packets = Vec::new();
    for i in 0..150u16 {
        let dst = if i < 50 || i == 149 { "10.9.9.9" } else { "10.5.5.5" };
        packets.push(udp(f64::from(i), (CLIENT, 10000 + i), (dst, 9000), 64));
    }
    let rows = sequential_engine().rows(packets).unwrap();
    assert_eq!(rows.len(), 150);

    let last = rows.last().unwrap();
    assert_eq!(last.src_ip, ip(CLIENT));
    assert_eq!(last.dst_ip, ip("10.9.9.9"));
    assert_eq!(last.ct_src_ltm, 100);
    assert_eq!(last.ct_dst_ltm, 1);
    assert_eq!(last.ct_dst_sport_ltm, 1);
    assert_eq!(last.ct_srv_src, 100);
    assert_eq!(last.ct_state_ttl, 100);

    // Early rows see only their predecessors
    assert_eq!(rows[0].ct_src_ltm, 1);
    assert_eq!(rows[49].ct_dst_ltm, 50);
    assert_eq!(rows[99].ct_src_ltm, 100);
}

#[test]
fn rows_are_ordered_by_last_packet() {
    let rows = sequential_engine()
        .rows(vec![
            udp(5.0, (CLIENT, 1), (SERVER, 53), 60),
            udp(1.0, (CLIENT, 2), (SERVER, 53), 60),
            udp(3.0, (CLIENT, 3), (SERVER, 53), 60),
            udp(0.5, (CLIENT, 3), (SERVER, 53), 60),
        ])
        .unwrap();
    let signature: Vec<u64> = rows
        .iter()
        .map(|r| r.sbytes / 60 * 100 + u64::from(r.ct_src_ltm))
        .collect();
    assert_eq!(rows.len(), 3);
    // flow on port 2 ends at 1.0, port 3 at 3.0, port 1 at 5.0
    assert_eq!(rows[0].sbytes, 60);
    assert_eq!(rows[1].sbytes, 120);
    assert_eq!(rows[2].sbytes, 60);
    assert_eq!(signature, vec![101, 202, 103]);
}

#[test]
fn parallel_matches_sequential() {
    let mut packets = Vec::new();
    for i in 0..400u16 {
        let t = f64::from(i) * 0.01;
        packets.push(tcp(t, (CLIENT, 20000 + i), (SERVER, 80), TcpFlags::SYN, u32::from(i), 100));
        packets.push(tcp(
            t + 0.002,
            (SERVER, 80),
            (CLIENT, 20000 + i),
            TcpFlags::SYN | TcpFlags::ACK,
            7,
            200,
        ));
        packets.push(tcp(t + 0.004, (CLIENT, 20000 + i), (SERVER, 80), TcpFlags::ACK, 8, 300));
    }
    packets.reverse();

    let parallel = FlowEngine::new(FeaturesConfig {
        workers: 4,
        parallel_threshold: 1,
        ..FeaturesConfig::default()
    })
    .unwrap();
    let (par_rows, par_report) = parallel.process_batch(packets.clone()).unwrap();
    let (seq_rows, seq_report) = sequential_engine().process_batch(packets).unwrap();

    assert!(par_report.parallel);
    assert!(!seq_report.parallel);
    assert_eq!(par_report.flows, 400);
    assert_eq!(par_rows, seq_rows);
}

#[test]
fn zero_window_is_rejected() {
    let err = FlowEngine::new(FeaturesConfig {
        window_flows: 0,
        ..FeaturesConfig::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn empty_batch_yields_no_rows() {
    let (rows, report) = sequential_engine().process_batch(Vec::new()).unwrap();
    assert!(rows.is_empty());
    assert_eq!(report.flows, 0);
}
