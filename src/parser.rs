//! Turns raw capture-tool output lines into packet events.
//!
//! Two formats are understood:
//!
//! ```text
//! tcpdump -n -l:  12:00:00.000000 IP 10.0.0.1.443 > 10.0.0.2.51234: Flags [P.], ...
//! router debug:   DEBUG: dst=... src=... type=IPv4 IPv4: 80.6.5.4 -> 50.9.8.7
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::models::domain::PacketEvent;

// Ports are required, so portless lines (ICMP and friends) are skipped.
static TCPDUMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"IP (\d+\.\d+\.\d+\.\d+)\.\d+ > (\d+\.\d+\.\d+\.\d+)\.\d+:")
        .expect("tcpdump pattern compiles")
});

static DEBUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"IPv4: (\d+\.\d+\.\d+\.\d+) -> (\d+\.\d+\.\d+\.\d+)")
        .expect("debug pattern compiles")
});

const DEBUG_PREFIX: &str = "DEBUG:";

fn capture_pair(re: &Regex, line: &str, timestamp: f64) -> Option<PacketEvent> {
    let caps = re.captures(line)?;
    Some(PacketEvent::new(&caps[1], &caps[2], timestamp))
}

pub fn parse_tcpdump_line(line: &str, timestamp: f64) -> Option<PacketEvent> {
    capture_pair(&TCPDUMP_RE, line, timestamp)
}

pub fn parse_debug_line(line: &str, timestamp: f64) -> Option<PacketEvent> {
    if !line.starts_with(DEBUG_PREFIX) {
        return None;
    }
    capture_pair(&DEBUG_RE, line, timestamp)
}

/// Tries the tcpdump format first, then the router debug format.
pub fn parse_line(line: &str, timestamp: f64) -> Option<PacketEvent> {
    let line = line.trim();
    parse_tcpdump_line(line, timestamp).or_else(|| parse_debug_line(line, timestamp))
}
