use std::{fs::read_to_string, net::SocketAddr, time::Duration};

use clap::Parser;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Server {
    /// signaling websocket/http bind address.
    #[serde(default = "Server::listen")]
    pub listen: SocketAddr,

    /// `Access-Control-Allow-Origin` value for the REST surface.
    #[serde(default = "Server::allow_origin")]
    pub allow_origin: String,

    /// membership cap per room; 0 means unlimited.
    #[serde(default = "Server::room_capacity")]
    pub room_capacity: usize,
}

impl Server {
    fn listen() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn allow_origin() -> String {
        "*".to_string()
    }

    fn room_capacity() -> usize {
        0
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: Self::listen(),
            allow_origin: Self::allow_origin(),
            room_capacity: Self::room_capacity(),
        }
    }
}

/// Connection liveness tuning: a bounded write deadline plus an
/// application-layer ping/pong heartbeat.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Heartbeat {
    #[serde(default = "Heartbeat::write_timeout_secs")]
    pub write_timeout_secs: u64,
    #[serde(default = "Heartbeat::ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "Heartbeat::pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

impl Heartbeat {
    fn write_timeout_secs() -> u64 {
        10
    }

    fn ping_interval_secs() -> u64 {
        30
    }

    fn pong_timeout_secs() -> u64 {
        60
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            write_timeout_secs: Self::write_timeout_secs(),
            ping_interval_secs: Self::ping_interval_secs(),
            pong_timeout_secs: Self::pong_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Janitor {
    #[serde(default = "Janitor::sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "Janitor::peer_stale_timeout_secs")]
    pub peer_stale_timeout_secs: u64,
    #[serde(default = "Janitor::empty_room_ttl_secs")]
    pub empty_room_ttl_secs: u64,
}

impl Janitor {
    fn sweep_interval_secs() -> u64 {
        30
    }

    fn peer_stale_timeout_secs() -> u64 {
        90
    }

    fn empty_room_ttl_secs() -> u64 {
        300
    }

    pub fn to_runtime_config(&self) -> crate::janitor::JanitorConfig {
        crate::janitor::JanitorConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            peer_stale_timeout: Duration::from_secs(self.peer_stale_timeout_secs),
            empty_room_ttl: Duration::from_secs(self.empty_room_ttl_secs),
        }
    }
}

impl Default for Janitor {
    fn default() -> Self {
        Self {
            sweep_interval_secs: Self::sweep_interval_secs(),
            peer_stale_timeout_secs: Self::peer_stale_timeout_secs(),
            empty_room_ttl_secs: Self::empty_room_ttl_secs(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub heartbeat: Heartbeat,
    #[serde(default)]
    pub janitor: Janitor,
    #[serde(default)]
    pub log: Log,
}

#[derive(Parser)]
#[command(about = "Room/peer signaling router for NAT traversal envelopes.")]
struct Cli {
    /// path to a TOML configuration file.
    #[arg(long)]
    config: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let cfg_str = Cli::parse()
            .config
            .map(read_to_string)
            .transpose()?
            .unwrap_or_default();

        Ok(toml::from_str(&cfg_str)?)
    }
}
