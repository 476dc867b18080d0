use std::collections::HashSet;
use std::time::Duration;

use topomon::models::dto::{EdgeDTO, NodeDTO};
use topomon::{PacketEvent, Topology};

const WINDOW: Duration = Duration::from_secs(30);

fn node(ip: &str, packets: u64) -> NodeDTO {
    NodeDTO {
        ip: ip.to_string(),
        packets,
    }
}

fn edge(source: &str, target: &str, weight: u64) -> EdgeDTO {
    EdgeDTO {
        source: source.to_string(),
        target: target.to_string(),
        weight,
    }
}

fn sorted_nodes(mut nodes: Vec<NodeDTO>) -> Vec<NodeDTO> {
    nodes.sort_by(|a, b| a.ip.cmp(&b.ip));
    nodes
}

#[test]
fn scenario_a_recent_packet_is_visible() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("10.0.0.1", "10.0.0.2", 100.0));

    let snap = topology.snapshot(110.0, WINDOW);
    assert_eq!(
        sorted_nodes(snap.nodes),
        vec![node("10.0.0.1", 1), node("10.0.0.2", 1)]
    );
    assert_eq!(snap.edges, vec![edge("10.0.0.1", "10.0.0.2", 1)]);
    assert_eq!(snap.timestamp, 110.0);
}

#[test]
fn scenario_b_old_packet_is_filtered() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("10.0.0.1", "10.0.0.2", 100.0));

    let snap = topology.snapshot(140.0, WINDOW);
    assert!(snap.nodes.is_empty());
    assert!(snap.edges.is_empty());
    assert_eq!(snap.timestamp, 140.0);
}

#[test]
fn scenario_c_repeated_pair_stats() {
    let topology = Topology::new();
    for i in 0..5 {
        topology.ingest(PacketEvent::new("10.0.0.1", "10.0.0.2", 100.0 + i as f64));
    }

    let stats = topology.stats(105.0, WINDOW);
    assert_eq!(stats.total_nodes, 2);
    assert_eq!(stats.total_packets, 10);
    assert_eq!(stats.active_connections, 1);
}

#[test]
fn scenario_d_self_loop() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "A", 1.0));

    assert_eq!(topology.node("A").unwrap().packet_count, 2);
    assert_eq!(topology.edge("A", "A").unwrap().count, 1);

    let snap = topology.snapshot(2.0, WINDOW);
    assert_eq!(snap.nodes, vec![node("A", 2)]);
    assert_eq!(snap.edges, vec![edge("A", "A", 1)]);
}

#[test]
fn packet_count_matches_references() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("h", "x", 1.0));
    topology.ingest(PacketEvent::new("y", "h", 2.0));
    topology.ingest(PacketEvent::new("h", "h", 3.0));
    topology.ingest(PacketEvent::new("x", "y", 4.0));

    // one as source, one as destination, two from the self-loop
    assert_eq!(topology.node("h").unwrap().packet_count, 4);
    assert_eq!(topology.node("x").unwrap().packet_count, 2);
    assert_eq!(topology.stats(4.0, WINDOW).total_packets, 8);
}

#[test]
fn edges_are_directional() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 1.0));
    topology.ingest(PacketEvent::new("A", "B", 2.0));
    assert!(topology.edge("B", "A").is_none());

    topology.ingest(PacketEvent::new("B", "A", 3.0));
    assert_eq!(topology.edge("A", "B").unwrap().count, 2);
    assert_eq!(topology.edge("B", "A").unwrap().count, 1);

    let snap = topology.snapshot(3.0, WINDOW);
    let pairs: HashSet<_> = snap
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str(), e.weight))
        .collect();
    assert_eq!(pairs, HashSet::from([("A", "B", 2), ("B", "A", 1)]));
}

#[test]
fn hosts_exist_only_after_reference() {
    let topology = Topology::new();
    assert!(topology.node("10.1.1.1").is_none());
    assert_eq!(topology.stats(0.0, WINDOW).total_nodes, 0);

    topology.ingest(PacketEvent::new("10.2.2.2", "10.3.3.3", 0.0));
    assert!(topology.node("10.1.1.1").is_none());
    assert_eq!(topology.stats(0.0, WINDOW).total_nodes, 2);
}

#[test]
fn stale_host_keeps_its_history() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 100.0));
    topology.ingest(PacketEvent::new("A", "B", 101.0));

    let snap = topology.snapshot(10_000.0, WINDOW);
    assert!(snap.nodes.is_empty());

    topology.ingest(PacketEvent::new("A", "C", 10_000.0));
    let a = topology.node("A").unwrap();
    assert_eq!(a.first_seen, 100.0);
    assert_eq!(a.last_seen, 10_000.0);
    assert_eq!(a.packet_count, 3);

    let snap = topology.snapshot(10_001.0, WINDOW);
    assert_eq!(
        sorted_nodes(snap.nodes),
        vec![node("A", 3), node("C", 1)]
    );
    assert_eq!(snap.edges, vec![edge("A", "C", 1)]);
}

#[test]
fn boundary_is_stale() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 100.0));

    let snap = topology.snapshot(130.0, WINDOW);
    assert!(snap.nodes.is_empty());
    assert!(snap.edges.is_empty());
    assert_eq!(topology.stats(130.0, WINDOW).active_connections, 0);

    let snap = topology.snapshot(129.5, WINDOW);
    assert_eq!(snap.nodes.len(), 2);
    assert_eq!(topology.stats(129.5, WINDOW).active_connections, 1);
}

#[test]
fn stats_totals_ignore_window() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 0.0));
    topology.ingest(PacketEvent::new("C", "D", 100.0));

    let stats = topology.stats(110.0, WINDOW);
    assert_eq!(stats.total_nodes, 4);
    assert_eq!(stats.total_packets, 4);
    assert_eq!(stats.active_connections, 1);
}

#[test]
fn snapshot_is_an_independent_copy() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 0.0));

    let mut snap = topology.snapshot(1.0, WINDOW);
    snap.nodes.clear();
    snap.edges[0].weight = 99;

    let again = topology.snapshot(1.0, WINDOW);
    assert_eq!(again.nodes.len(), 2);
    assert_eq!(again.edges[0].weight, 1);
}

#[test]
fn per_call_window_override() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("A", "B", 0.0));

    assert!(topology.snapshot(45.0, WINDOW).nodes.is_empty());
    assert_eq!(topology.snapshot(45.0, Duration::from_secs(60)).nodes.len(), 2);
}

#[test]
fn snapshot_serializes_with_dashboard_field_names() {
    let topology = Topology::new();
    topology.ingest(PacketEvent::new("10.0.0.1", "10.0.0.2", 100.0));

    let json = serde_json::to_value(topology.snapshot(110.0, WINDOW)).unwrap();
    assert_eq!(json["timestamp"], 110.0);
    assert_eq!(
        json["edges"][0],
        serde_json::json!({"source": "10.0.0.1", "target": "10.0.0.2", "weight": 1})
    );
    assert!(json["nodes"][0].get("ip").is_some());
    assert_eq!(json["nodes"][0]["packets"], 1);

    let stats = serde_json::to_value(topology.stats(110.0, WINDOW)).unwrap();
    assert_eq!(
        stats,
        serde_json::json!({"total_nodes": 2, "active_connections": 1, "total_packets": 2})
    );
}
