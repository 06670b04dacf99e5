use crate::application::connection_manager::ConnectionSettings;
use crate::application::history_store::DEFAULT_HISTORY_CAPACITY;
use crate::application::stream_framer::DEFAULT_MAX_LINE_BYTES;
use crate::domain::telemetry::TelemetryDecoder;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GroundStationConfig {
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinkSettings {
    /// Serial device path (`/dev/ttyUSB0`, `COM3`) or `tcp://host:port` for a
    /// serial-over-TCP bridge.
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Poll interval of the blocking serial reader.
    #[serde(default = "default_read_poll_ms")]
    pub read_poll_ms: u64,
    #[serde(default)]
    pub auto_connect: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_true")]
    pub legacy_thrust_units: bool,
    pub inactivity_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandSettings {
    #[serde(default = "default_true")]
    pub line_terminator: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_poll_ms() -> u64 {
    100
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_poll_ms: default_read_poll_ms(),
            auto_connect: false,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_line_bytes: default_max_line_bytes(),
            legacy_thrust_units: true,
            inactivity_timeout_secs: None,
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            line_terminator: true,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl GroundStationConfig {
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            max_line_bytes: self.telemetry.max_line_bytes,
            inactivity_timeout: self
                .telemetry
                .inactivity_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            decoder: TelemetryDecoder::new(self.telemetry.legacy_thrust_units),
            command_line_terminator: self.commands.line_terminator,
        }
    }
}

/// Load `config/groundstation.*` if present, then `GROUNDSTATION__SECTION__KEY`
/// environment overrides.
pub fn load_groundstation_config() -> anyhow::Result<GroundStationConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/groundstation").required(false))
        .add_source(
            config::Environment::with_prefix("GROUNDSTATION")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
