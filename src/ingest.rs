//! Channel-to-topology ingest worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::models::domain::PacketEvent;
use crate::topology::Topology;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const PROGRESS_EVERY: u64 = 10_000;

/// Folds events from the capture channel into `topology` in arrival order.
///
/// Runs until every sender is dropped or `running` clears, and returns the
/// number of events ingested.
pub fn run_ingest(rx: Receiver<PacketEvent>, topology: &Topology, running: &AtomicBool) -> u64 {
    let mut ingested = 0u64;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                topology.ingest(event);
                ingested += 1;
                if ingested % PROGRESS_EVERY == 0 {
                    tracing::debug!(ingested, "ingest progress");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("packet source disconnected, no further events will arrive");
                break;
            }
        }
    }

    tracing::info!(ingested, "ingest worker stopped");
    ingested
}
