//! topomon: folds a stream of observed packet headers into a live host graph
//! and serves windowed snapshots of it to a polling dashboard.

pub mod config;
pub mod ingest;
pub mod logging;
pub mod maintenance;
pub mod models;
pub mod parser;
pub mod server;
pub mod sniff;
pub mod topology;

pub use models::domain::PacketEvent;
pub use models::dto::{TopologySnapshot, TopologyStats};
pub use topology::Topology;
