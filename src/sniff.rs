//! Packet event sources: tcpdump, stdin and (with `live-capture`) libpcap.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use etherparse::{NetSlice, SlicedPacket};
use thiserror::Error;

use crate::models::domain::PacketEvent;
use crate::parser;
use crate::topology::epoch_now;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start capture command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("capture stream read failed: {0}")]
    Io(#[from] io::Error),
    #[error("capture command produced no stdout")]
    MissingStdout,
    #[error("capture command `{command}` exited with {status}: {stderr}")]
    Exited {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[cfg(feature = "live-capture")]
    #[error("pcap error: {0}")]
    Pcap(#[from] pcap::Error),
}

/// Pulls the source and destination addresses out of an Ethernet II frame.
///
/// Returns `None` for anything that is not IPv4/IPv6 (ARP, VLAN-less junk,
/// truncated headers).
pub fn decode_frame(data: &[u8]) -> Option<(String, String)> {
    let packet = SlicedPacket::from_ethernet(data).ok()?;
    match packet.net? {
        NetSlice::Ipv4(ipv4) => {
            let header = ipv4.header();
            Some((header.source_addr().to_string(), header.destination_addr().to_string()))
        }
        NetSlice::Ipv6(ipv6) => {
            let header = ipv6.header();
            Some((header.source_addr().to_string(), header.destination_addr().to_string()))
        }
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn forward(sender: &Sender<PacketEvent>, event: PacketEvent) -> bool {
    match sender.send(event) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("ingest channel closed, dropping capture: {}", e);
            false
        }
    }
}

/// Why a line stream stopped being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Eof,
    Stopped,
    ChannelClosed,
}

fn pump_lines<R: BufRead>(
    mut reader: R,
    sender: &Sender<PacketEvent>,
    running: &AtomicBool,
) -> Result<(u64, StreamEnd), CaptureError> {
    let mut buf = Vec::new();
    let mut forwarded = 0u64;
    let mut skipped = 0u64;

    let end = loop {
        if !running.load(Ordering::SeqCst) {
            break StreamEnd::Stopped;
        }
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break StreamEnd::Eof;
        }
        let line = String::from_utf8_lossy(&buf);
        match parser::parse_line(&line, epoch_now()) {
            Some(event) => {
                if !forward(sender, event) {
                    break StreamEnd::ChannelClosed;
                }
                forwarded += 1;
            }
            None => {
                skipped += 1;
                tracing::trace!(line = %line.trim_end(), "unrecognised capture line");
            }
        }
    };

    tracing::debug!(forwarded, skipped, ?end, "line source finished");
    Ok((forwarded, end))
}

/// Parses every line of `reader` and forwards the events it recognises.
///
/// Bytes are decoded lossily so a stray non-UTF-8 line cannot stop the stream.
/// Returns the number of events forwarded once the stream ends, the channel
/// closes or `running` clears.
pub fn read_lines<R: BufRead>(
    reader: R,
    sender: &Sender<PacketEvent>,
    running: &AtomicBool,
) -> Result<u64, CaptureError> {
    pump_lines(reader, sender, running).map(|(forwarded, _)| forwarded)
}

const STDERR_TAIL: usize = 5;

/// Logs every stderr line of the capture command and keeps the last few for error reports.
fn drain_stderr<R: Read + Send + 'static>(stderr: R) -> io::Result<thread::JoinHandle<Vec<String>>> {
    thread::Builder::new()
        .name("capture-stderr".into())
        .spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    continue;
                }
                tracing::warn!(target: "tcpdump", "{}", line);
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into()
        })
}

/// Reads capture lines piped into this process.
pub fn start_stdin(sender: Sender<PacketEvent>, running: Arc<AtomicBool>) -> Result<u64, CaptureError> {
    tracing::info!("reading packet lines from stdin");
    let stdin = io::stdin();
    read_lines(stdin.lock(), &sender, &running)
}

/// Runs `tcpdump -i <interface> -n -l ip` and feeds its output through the line parser.
pub fn start_tcpdump(
    tcpdump_path: &str,
    interface: &str,
    sender: Sender<PacketEvent>,
    running: Arc<AtomicBool>,
) -> Result<u64, CaptureError> {
    let mut child = Command::new(tcpdump_path)
        .args(["-i", interface, "-n", "-l", "ip"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CaptureError::Spawn {
            command: tcpdump_path.to_string(),
            source,
        })?;
    tracing::info!(interface, pid = child.id(), "tcpdump started");

    let stderr_reader = match child.stderr.take() {
        Some(stderr) => Some(drain_stderr(stderr)?),
        None => None,
    };
    let stdout = child.stdout.take().ok_or(CaptureError::MissingStdout)?;
    let pumped = pump_lines(BufReader::new(stdout), &sender, &running);

    // On EOF tcpdump has closed stdout on its own; anything else means we are
    // abandoning a live process.
    let exited_on_its_own = matches!(pumped, Ok((_, StreamEnd::Eof)));
    if !exited_on_its_own {
        if let Err(e) = child.kill() {
            tracing::debug!("tcpdump already gone: {}", e);
        }
    }
    let status = child.wait();
    let stderr_tail = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    let forwarded = pumped?.0;
    match status {
        Ok(status) if exited_on_its_own && !status.success() => {
            tracing::error!(%status, "tcpdump failed");
            Err(CaptureError::Exited {
                command: tcpdump_path.to_string(),
                status,
                stderr: stderr_tail.join("; "),
            })
        }
        Ok(status) => {
            tracing::info!(%status, "tcpdump exited");
            Ok(forwarded)
        }
        Err(e) => {
            tracing::warn!("failed to reap tcpdump: {}", e);
            Ok(forwarded)
        }
    }
}

#[cfg(feature = "live-capture")]
pub fn start_sniffing(
    interface: Option<&str>,
    sender: Sender<PacketEvent>,
    running: Arc<AtomicBool>,
) -> Result<u64, CaptureError> {
    let mut cap = live::create_capture(interface)?;
    live::configure_capture(&mut cap)?;
    live::process_packets(&mut cap, &sender, &running)
}

#[cfg(feature = "live-capture")]
mod live {
    use super::*;
    use pcap::{Active, Capture, Device};

    pub(super) fn create_capture(interface: Option<&str>) -> Result<Capture<Active>, CaptureError> {
        let device = match interface {
            Some(name) => Device::from(name),
            None => Device::lookup()?
                .ok_or_else(|| pcap::Error::PcapError("no capture device available".into()))?,
        };
        tracing::info!(device = %device.name, "opening live capture");

        let cap = Capture::from_device(device)?
            .promisc(false)
            .snaplen(128) // headers only
            .timeout(500)
            .immediate_mode(true)
            .open()?;
        Ok(cap)
    }

    pub(super) fn configure_capture(cap: &mut Capture<Active>) -> Result<(), CaptureError> {
        cap.filter("ip or ip6", true)?;
        Ok(())
    }

    pub(super) fn process_packets(
        cap: &mut Capture<Active>,
        sender: &Sender<PacketEvent>,
        running: &AtomicBool,
    ) -> Result<u64, CaptureError> {
        let mut forwarded = 0u64;
        while running.load(Ordering::SeqCst) {
            let packet = match cap.next_packet() {
                Ok(packet) => packet,
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => return Err(e.into()),
            };
            let Some((source, destination)) = decode_frame(packet.data) else {
                continue;
            };
            let ts = packet.header.ts;
            let timestamp = ts.tv_sec as f64 + ts.tv_usec as f64 / 1_000_000.0;
            if !forward(sender, PacketEvent::new(source, destination, timestamp)) {
                break;
            }
            forwarded += 1;
        }
        Ok(forwarded)
    }
}
