//! Command line and environment configuration

use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Append completed laps to an NDJSON file
    #[default]
    Ndjson,
    /// Keep laps in memory only
    Memory,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "pitwall", version, about = "F1 UDP telemetry decoder and live session dashboard")]
pub struct Config {
    /// Address to bind both listeners to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// UDP port the game sends telemetry to
    #[arg(long, env = "UDP_PORT", default_value_t = 20777)]
    pub udp_port: u16,

    /// Port for the HTTP API
    #[arg(long, env = "HTTP_PORT", default_value_t = 3000)]
    pub http_port: u16,

    /// Lap store backend
    #[arg(long, value_enum, default_value_t)]
    pub store: StoreKind,

    /// Path of the NDJSON lap store [default: <data dir>/pitwall/laps.ndjson]
    #[arg(long, env = "PITWALL_STORE")]
    pub store_path: Option<PathBuf>,

    /// Driver name for recorded laps until one is set through the API
    #[arg(long, env = "PITWALL_DRIVER")]
    pub driver: Option<String>,

    /// Session id for recorded laps until one is set through the API
    #[arg(long, env = "PITWALL_SESSION")]
    pub session_id: Option<String>,

    /// Feed synthetic packets instead of listening on UDP
    #[arg(long, default_value_t = false)]
    pub demo: bool,

    /// Snapshot publish and liveness check interval, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Capacity of the completed-lap queue
    #[arg(long, default_value_t = crate::emitter::LAP_QUEUE_CAPACITY)]
    pub lap_queue: usize,

    /// Seconds to wait for pending lap saves on shutdown
    #[arg(long, default_value_t = 5)]
    pub shutdown_grace_secs: u64,
}

impl Config {
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.udp_port)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.http_port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pitwall")
                .join("laps.ndjson")
        })
    }
}
