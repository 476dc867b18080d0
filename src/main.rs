use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{unbounded, Sender};

use topomon::config::{Config, SourceKind};
use topomon::maintenance::{run_maintenance, MaintenancePolicy};
use topomon::server::{build_server, AppState};
use topomon::{ingest, logging, sniff, PacketEvent, Topology};

fn spawn_source(
    config: &Config,
    tx: Sender<PacketEvent>,
    running: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    let source = config.source;
    let interface = config.interface.clone();
    let tcpdump_path = config.tcpdump_path.clone();

    thread::Builder::new().name("capture".into()).spawn(move || {
        let result = match source {
            SourceKind::Tcpdump => sniff::start_tcpdump(&tcpdump_path, &interface, tx, running),
            SourceKind::Stdin => sniff::start_stdin(tx, running),
            #[cfg(feature = "live-capture")]
            SourceKind::Pcap => sniff::start_sniffing(Some(&interface), tx, running),
            #[cfg(not(feature = "live-capture"))]
            SourceKind::Pcap => {
                drop((tx, running));
                tracing::error!("pcap source unavailable in this build");
                return;
            }
        };
        match result {
            Ok(forwarded) => tracing::info!(forwarded, "packet source finished"),
            Err(e) => tracing::error!("Packet capture error: {}", e),
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging()?;

    let config = Config::parse();
    config.validate()?;

    let topology = Arc::new(Topology::new());
    let running = Arc::new(AtomicBool::new(true));
    let stale_threshold = config.staleness_window();
    let retention = config.retention_window();

    if retention.is_none() {
        tracing::warn!("no retention horizon configured; hosts and connections are never forgotten and memory grows with every new address");
    }

    let (tx, rx) = unbounded();
    let capture_thread = spawn_source(&config, tx, running.clone())?;

    let ingest_thread = {
        let topology = topology.clone();
        let running = running.clone();
        thread::Builder::new()
            .name("ingest".into())
            .spawn(move || ingest::run_ingest(rx, &topology, &running))?
    };

    tokio::spawn(run_maintenance(
        topology.clone(),
        MaintenancePolicy {
            period: config.maintenance_period(),
            retention,
            size_warn_threshold: config.size_warn_threshold,
        },
        running.clone(),
    ));

    let server = build_server(
        AppState {
            topology: topology.clone(),
            stale_threshold,
        },
        &config.host,
        config.port,
    )?;

    let handle = server.handle();
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("shutdown requested");
        running_clone.store(false, Ordering::SeqCst);
        futures::executor::block_on(handle.stop(true));
    })?;

    server.await?;

    running.store(false, Ordering::SeqCst);
    if ingest_thread.join().is_err() {
        tracing::error!("ingest thread panicked");
    }
    // A source blocked on a quiet pipe only notices shutdown on its next line.
    if capture_thread.is_finished() && capture_thread.join().is_err() {
        tracing::error!("capture thread panicked");
    }

    let stats = topology.stats(topomon::topology::epoch_now(), stale_threshold);
    tracing::info!(
        total_nodes = stats.total_nodes,
        total_packets = stats.total_packets,
        "topomon stopped"
    );
    Ok(())
}
