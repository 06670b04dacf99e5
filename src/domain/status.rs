// Operator-facing status lines
use super::command::Command;
use super::telemetry::{format_optional, Reading};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    Connecting,
    Online(Option<Reading>),
    Disconnected,
    NotConnected,
    NoData { silent_secs: u64 },
    CommandSent(Command),
    LaunchSequenceStarted,
    DataSaved,
    Error(String),
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Connecting => write!(f, "STATUS: CONNECTING..."),
            StatusLine::Online(None) => write!(f, "STATUS: ONLINE"),
            StatusLine::Online(Some(reading)) => write!(
                f,
                "STATUS: ONLINE | THRUST: {} N | TEMP: {} °C | HUMI: {} %",
                or_dashes(format_optional(reading.thrust, 2)),
                or_dashes(format_optional(reading.temperature, 1)),
                or_dashes(format_optional(reading.humidity, 1)),
            ),
            StatusLine::Disconnected => write!(f, "STATUS: DISCONNECTED"),
            StatusLine::NotConnected => write!(f, "STATUS: ERROR - Not connected. Connect first."),
            StatusLine::NoData { silent_secs } => {
                write!(f, "STATUS: NO DATA - link silent for {}s", silent_secs)
            }
            StatusLine::CommandSent(command) => {
                write!(f, "COMMAND SENT: {}", command.code() as char)
            }
            StatusLine::LaunchSequenceStarted => write!(f, "LAUNCH SEQUENCE STARTED!"),
            StatusLine::DataSaved => write!(f, "DATA SAVED as CSV."),
            StatusLine::Error(cause) => write!(f, "STATUS: ERROR - {}", cause),
        }
    }
}

fn or_dashes(value: String) -> String {
    if value.is_empty() { "--".to_string() } else { value }
}
