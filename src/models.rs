pub mod domain {
    /// One observed packet, reduced to the addresses the topology cares about.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PacketEvent {
        pub source: String,
        pub destination: String,
        /// Epoch seconds, fractional allowed.
        pub timestamp: f64,
    }

    impl PacketEvent {
        pub fn new(source: impl Into<String>, destination: impl Into<String>, timestamp: f64) -> Self {
            PacketEvent {
                source: source.into(),
                destination: destination.into(),
                timestamp,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct NodeRecord {
        pub first_seen: f64,
        pub last_seen: f64,
        pub packet_count: u64,
    }

    impl NodeRecord {
        pub(crate) fn new(timestamp: f64) -> Self {
            NodeRecord {
                first_seen: timestamp,
                last_seen: timestamp,
                packet_count: 0,
            }
        }

        pub(crate) fn touch(&mut self, timestamp: f64) {
            self.last_seen = timestamp;
            self.packet_count += 1;
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct EdgeRecord {
        pub count: u64,
        pub last_active: f64,
    }

    impl EdgeRecord {
        pub(crate) fn new(timestamp: f64) -> Self {
            EdgeRecord {
                count: 0,
                last_active: timestamp,
            }
        }

        pub(crate) fn record(&mut self, timestamp: f64) {
            self.count += 1;
            self.last_active = timestamp;
        }
    }

    /// What a reaping pass removed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReapReport {
        pub nodes_removed: usize,
        pub edges_removed: usize,
    }
}

pub mod dto {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
    pub struct NodeDTO {
        pub ip: String,
        pub packets: u64,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
    pub struct EdgeDTO {
        pub source: String,
        pub target: String,
        pub weight: u64,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
    pub struct TopologySnapshot {
        pub nodes: Vec<NodeDTO>,
        pub edges: Vec<EdgeDTO>,
        pub timestamp: f64,
    }

    #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
    pub struct TopologyStats {
        pub total_nodes: usize,
        pub active_connections: usize,
        pub total_packets: u64,
    }

    #[derive(Debug, Serialize, Deserialize, Clone)]
    pub struct HealthDTO {
        pub status: String,
        pub timestamp: f64,
    }
}
