//! Periodic reaping and size checks, off the ingest and query paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::models::domain::ReapReport;
use crate::topology::{epoch_now, Topology};

#[derive(Debug, Clone)]
pub struct MaintenancePolicy {
    pub period: Duration,
    /// `None` keeps every entry forever.
    pub retention: Option<Duration>,
    pub size_warn_threshold: usize,
}

/// Keeps track of whether the size warning is currently raised, so operators
/// get one warning per crossing instead of one per tick.
#[derive(Debug, Default)]
pub struct SizeWatch {
    warned: bool,
}

impl SizeWatch {
    /// Returns true when `entries` has just crossed above `threshold`.
    pub fn observe(&mut self, entries: usize, threshold: usize) -> bool {
        let over = entries > threshold;
        let crossed = over && !self.warned;
        self.warned = over;
        crossed
    }
}

/// One maintenance pass: reap if a retention horizon is set, then check size.
pub fn run_pass(
    topology: &Topology,
    policy: &MaintenancePolicy,
    watch: &mut SizeWatch,
    now: f64,
) -> Option<ReapReport> {
    let report = policy.retention.map(|retention| topology.reap(now, retention));
    if let Some(report) = report {
        if report.nodes_removed > 0 || report.edges_removed > 0 {
            tracing::info!(
                nodes_removed = report.nodes_removed,
                edges_removed = report.edges_removed,
                "reaped expired topology entries"
            );
        }
    }

    let (nodes, edges) = topology.size();
    tracing::debug!(nodes, edges, "topology size");
    if watch.observe(nodes + edges, policy.size_warn_threshold) {
        if policy.retention.is_some() {
            tracing::warn!(nodes, edges, "topology size above warning threshold despite reaping");
        } else {
            tracing::warn!(
                nodes,
                edges,
                "topology size above warning threshold; set a retention horizon to bound memory"
            );
        }
    }
    report
}

pub async fn run_maintenance(topology: Arc<Topology>, policy: MaintenancePolicy, running: Arc<AtomicBool>) {
    let mut interval = time::interval(policy.period);
    // The first tick fires immediately; skip it so the first pass happens one period in.
    interval.tick().await;
    let mut watch = SizeWatch::default();

    while running.load(Ordering::SeqCst) {
        interval.tick().await;
        run_pass(&topology, &policy, &mut watch, epoch_now());
    }
}
