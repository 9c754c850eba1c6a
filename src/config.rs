use std::{fs::read_to_string, time::Duration};

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Stun {
    /// primary STUN server for discovery and classification.
    #[serde(default = "Stun::primary_server")]
    pub primary_server: String,

    /// secondary STUN server, queried by the classifier to detect
    /// symmetric NATs.
    #[serde(default = "Stun::secondary_server")]
    pub secondary_server: String,

    #[serde(default = "Stun::timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "Stun::retry_attempts")]
    pub retry_attempts: u32,
}

impl Stun {
    fn primary_server() -> String {
        "stun.l.google.com:19302".to_string()
    }

    fn secondary_server() -> String {
        "stun1.l.google.com:19302".to_string()
    }

    fn timeout_secs() -> u64 {
        5
    }

    fn retry_attempts() -> u32 {
        3
    }
}

impl Stun {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Stun {
    fn default() -> Self {
        Self {
            primary_server: Self::primary_server(),
            secondary_server: Self::secondary_server(),
            timeout_secs: Self::timeout_secs(),
            retry_attempts: Self::retry_attempts(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Punch {
    #[serde(default = "Punch::overall_deadline_secs")]
    pub overall_deadline_secs: u64,
    #[serde(default = "Punch::probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "Punch::max_probes")]
    pub max_probes: u32,
    #[serde(default = "Punch::retry_attempts")]
    pub retry_attempts: u32,
}

impl Punch {
    fn overall_deadline_secs() -> u64 {
        30
    }

    fn probe_interval_ms() -> u64 {
        200
    }

    fn max_probes() -> u32 {
        50
    }

    fn retry_attempts() -> u32 {
        1
    }

    pub fn to_engine_config(&self) -> punch::PunchConfig {
        punch::PunchConfig {
            overall_deadline: Duration::from_secs(self.overall_deadline_secs),
            probe_interval: Duration::from_millis(self.probe_interval_ms),
            max_probes: self.max_probes,
        }
    }
}

impl Default for Punch {
    fn default() -> Self {
        Self {
            overall_deadline_secs: Self::overall_deadline_secs(),
            probe_interval_ms: Self::probe_interval_ms(),
            max_probes: Self::max_probes(),
            retry_attempts: Self::retry_attempts(),
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
    pub stun: Stun,
    #[serde(default)]
    pub punch: Punch,
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Reads `path` as TOML if given, falling back to defaults otherwise.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let cfg_str = match path {
            Some(path) => read_to_string(path)?,
            None => String::new(),
        };

        Ok(toml::from_str(&cfg_str)?)
    }
}
