//! Command-line and environment configuration.
//!
//! Every flag can also come from the environment (or a `.env` file loaded at
//! startup), which keeps the `CAPTURE_INTERFACE` / `PORT` knobs the dashboard
//! deployment already sets.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::topology::DEFAULT_STALE_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Spawn tcpdump and parse its text output.
    Tcpdump,
    /// Parse capture lines piped into stdin.
    Stdin,
    /// Capture frames directly with libpcap (`live-capture` feature).
    Pcap,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "topomon", version, about = "Live network topology monitor")]
pub struct Config {
    /// Where packet events come from.
    #[arg(long, value_enum, env = "CAPTURE_SOURCE", default_value_t = SourceKind::Tcpdump)]
    pub source: SourceKind,

    /// Interface to capture on.
    #[arg(short, long, env = "CAPTURE_INTERFACE", default_value = "tun0")]
    pub interface: String,

    #[arg(long, env = "TCPDUMP_PATH", default_value = "tcpdump")]
    pub tcpdump_path: String,

    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Seconds of silence after which a host or connection drops out of snapshots.
    #[arg(long, env = "STALE_THRESHOLD", default_value_t = DEFAULT_STALE_THRESHOLD.as_secs_f64())]
    pub stale_threshold: f64,

    /// Seconds of silence after which a host or connection is forgotten.
    /// Unset keeps everything for the life of the process.
    #[arg(long, env = "RETENTION_SECS")]
    pub retention: Option<f64>,

    /// Seconds between maintenance passes.
    #[arg(long, env = "MAINTENANCE_INTERVAL", default_value_t = 60)]
    pub maintenance_interval: u64,

    /// Warn once the topology holds more than this many nodes plus edges.
    #[arg(long, env = "SIZE_WARN_THRESHOLD", default_value_t = 100_000)]
    pub size_warn_threshold: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("stale threshold must be a positive number of seconds, got {0}")]
    InvalidStaleThreshold(f64),
    #[error("retention must be a positive number of seconds, got {0}")]
    InvalidRetention(f64),
    #[error("retention ({retention}s) is shorter than the stale threshold ({stale}s)")]
    RetentionBelowStaleThreshold { retention: f64, stale: f64 },
    #[error("maintenance interval must be at least one second")]
    ZeroMaintenanceInterval,
    #[error("pcap source requested but topomon was built without the `live-capture` feature")]
    PcapUnavailable,
}

/// Converts a seconds value to a window, rejecting zero, negative and non-finite values.
pub fn window_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        window_from_secs(self.stale_threshold)
            .ok_or(ConfigError::InvalidStaleThreshold(self.stale_threshold))?;

        if let Some(retention) = self.retention {
            window_from_secs(retention).ok_or(ConfigError::InvalidRetention(retention))?;
            if retention < self.stale_threshold {
                return Err(ConfigError::RetentionBelowStaleThreshold {
                    retention,
                    stale: self.stale_threshold,
                });
            }
        }

        if self.maintenance_interval == 0 {
            return Err(ConfigError::ZeroMaintenanceInterval);
        }

        if self.source == SourceKind::Pcap && !cfg!(feature = "live-capture") {
            return Err(ConfigError::PcapUnavailable);
        }

        Ok(())
    }

    pub fn staleness_window(&self) -> Duration {
        window_from_secs(self.stale_threshold).unwrap_or(DEFAULT_STALE_THRESHOLD)
    }

    pub fn retention_window(&self) -> Option<Duration> {
        self.retention.and_then(window_from_secs)
    }

    pub fn maintenance_period(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval.max(1))
    }
}
