//! The topology aggregate: hosts and directed host pairs folded from packet events.
//!
//! Both maps live behind one `RwLock`. An ingest touches two nodes and one edge
//! under the write lock, so readers never see a node bumped without its edge.
//! Staleness is a query-time filter; nothing is removed except by [`Topology::reap`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;

use crate::models::domain::{EdgeRecord, NodeRecord, PacketEvent, ReapReport};
use crate::models::dto::{EdgeDTO, NodeDTO, TopologySnapshot, TopologyStats};

/// Default staleness window for snapshots and stats.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(30);

type EdgeKey = (String, String);

#[derive(Debug, Default)]
struct TopologyState {
    nodes: HashMap<String, NodeRecord>,
    edges: HashMap<EdgeKey, EdgeRecord>,
}

impl TopologyState {
    fn touch_node(&mut self, ip: &str, timestamp: f64) {
        match self.nodes.get_mut(ip) {
            Some(node) => node.touch(timestamp),
            None => {
                let mut node = NodeRecord::new(timestamp);
                node.touch(timestamp);
                self.nodes.insert(ip.to_owned(), node);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Topology {
    state: RwLock<TopologyState>,
}

fn is_active(now: f64, timestamp: f64, window: Duration) -> bool {
    now - timestamp < window.as_secs_f64()
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation under the write lock is infallible, so a poisoned lock
    // still guards a consistent aggregate.
    fn read(&self) -> RwLockReadGuard<'_, TopologyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TopologyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folds one packet into the aggregate.
    ///
    /// Timestamps are last-write-wins: an out-of-order event moves `last_seen`
    /// and `last_active` backwards rather than being rejected.
    pub fn ingest(&self, event: PacketEvent) {
        let PacketEvent {
            source,
            destination,
            timestamp,
        } = event;

        let mut state = self.write();
        state.touch_node(&source, timestamp);
        state.touch_node(&destination, timestamp);
        state
            .edges
            .entry((source, destination))
            .or_insert_with(|| EdgeRecord::new(timestamp))
            .record(timestamp);
    }

    /// Point-in-time view of every node and edge active at `now`.
    ///
    /// An entity is active when `now - timestamp < staleness_window`; one sitting
    /// exactly on the boundary is stale. Entry order is unspecified.
    pub fn snapshot(&self, now: f64, staleness_window: Duration) -> TopologySnapshot {
        let state = self.read();

        let nodes = state
            .nodes
            .iter()
            .filter(|(_, node)| is_active(now, node.last_seen, staleness_window))
            .map(|(ip, node)| NodeDTO {
                ip: ip.clone(),
                packets: node.packet_count,
            })
            .collect();

        let edges = state
            .edges
            .iter()
            .filter(|(_, edge)| is_active(now, edge.last_active, staleness_window))
            .map(|((source, target), edge)| EdgeDTO {
                source: source.clone(),
                target: target.clone(),
                weight: edge.count,
            })
            .collect();

        TopologySnapshot {
            nodes,
            edges,
            timestamp: now,
        }
    }

    /// Cumulative node and packet totals plus the number of active edges.
    pub fn stats(&self, now: f64, staleness_window: Duration) -> TopologyStats {
        let state = self.read();
        TopologyStats {
            total_nodes: state.nodes.len(),
            active_connections: state
                .edges
                .values()
                .filter(|edge| is_active(now, edge.last_active, staleness_window))
                .count(),
            total_packets: state.nodes.values().map(|node| node.packet_count).sum(),
        }
    }

    pub fn node(&self, ip: &str) -> Option<NodeRecord> {
        self.read().nodes.get(ip).copied()
    }

    pub fn edge(&self, source: &str, destination: &str) -> Option<EdgeRecord> {
        self.read()
            .edges
            .get(&(source.to_owned(), destination.to_owned()))
            .copied()
    }

    /// Number of (nodes, edges) currently held, stale ones included.
    pub fn size(&self) -> (usize, usize) {
        let state = self.read();
        (state.nodes.len(), state.edges.len())
    }

    /// Drops every node and edge whose last activity is at least `retention` old.
    ///
    /// Nodes and edges are judged on their own timestamps; an edge may outlive
    /// one of its endpoints.
    pub fn reap(&self, now: f64, retention: Duration) -> ReapReport {
        let mut state = self.write();
        let (nodes_before, edges_before) = (state.nodes.len(), state.edges.len());

        state
            .nodes
            .retain(|_, node| is_active(now, node.last_seen, retention));
        state
            .edges
            .retain(|_, edge| is_active(now, edge.last_active, retention));

        ReapReport {
            nodes_removed: nodes_before - state.nodes.len(),
            edges_removed: edges_before - state.edges.len(),
        }
    }
}

/// Wall clock as fractional epoch seconds.
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
