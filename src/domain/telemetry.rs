// Telemetry data domain models and line decoding
use chrono::{DateTime, Local};
use serde::Serialize;

/// Wall-clock format for chart labels and export rows, e.g. `3:04:05 PM`.
pub const TIME_LABEL_FORMAT: &str = "%-I:%M:%S %p";

/// One decoded telemetry sample. Fields the vehicle did not send stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub thrust: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: DateTime<Local>,
}

impl Reading {
    pub fn time_label(&self) -> String {
        self.timestamp.format(TIME_LABEL_FORMAT).to_string()
    }

    /// Export row: thrust to 2 decimals, temperature and humidity to 1, empty when unknown.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.time_label(),
            format_optional(self.thrust, 2),
            format_optional(self.temperature, 1),
            format_optional(self.humidity, 1),
        )
    }
}

pub(crate) fn format_optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustSample {
    pub timestamp: DateTime<Local>,
    pub thrust: f64,
}

impl ThrustSample {
    pub fn new(timestamp: DateTime<Local>, thrust: f64) -> Self {
        Self { timestamp, thrust }
    }
}

/// Chart view of the rolling window: parallel label and value vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn from_samples(samples: &[ThrustSample]) -> Self {
        let (labels, values) = samples
            .iter()
            .map(|s| (s.timestamp.format(TIME_LABEL_FORMAT).to_string(), s.thrust))
            .unzip();
        Self { labels, values }
    }
}

/// Parses `Key:Value[,Key:Value]*` lines into readings.
///
/// Recognized keys are `Thrust`, `Temp` and `Humi`. Unknown keys are skipped and a
/// value that does not parse only drops its own field. A line with no usable
/// field decodes to `None`.
#[derive(Debug, Clone)]
pub struct TelemetryDecoder {
    legacy_thrust_units: bool,
}

impl Default for TelemetryDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TelemetryDecoder {
    /// `legacy_thrust_units` accepts the older `Thrust: 12.3 N` form by stripping the unit.
    pub fn new(legacy_thrust_units: bool) -> Self {
        Self {
            legacy_thrust_units,
        }
    }

    pub fn decode(&self, line: &str) -> Option<Reading> {
        self.decode_at(line, Local::now())
    }

    pub fn decode_at(&self, line: &str, now: DateTime<Local>) -> Option<Reading> {
        let mut thrust = None;
        let mut temperature = None;
        let mut humidity = None;

        for component in line.split(',') {
            let Some((key, raw)) = component.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let slot = match key {
                "Thrust" => &mut thrust,
                "Temp" => &mut temperature,
                "Humi" => &mut humidity,
                _ => continue,
            };

            let mut raw = raw.trim();
            if key == "Thrust" && self.legacy_thrust_units {
                raw = raw.strip_suffix('N').map(str::trim_end).unwrap_or(raw);
            }

            if let Some(value) = parse_value(raw) {
                *slot = Some(value);
            }
        }

        if thrust.is_none() && temperature.is_none() && humidity.is_none() {
            return None;
        }

        Some(Reading {
            thrust,
            temperature,
            humidity,
            timestamp: now,
        })
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
pub(crate) fn fixed_time(hour: u32, minute: u32, second: u32) -> DateTime<Local> {
    use chrono::TimeZone;
    Local
        .with_ymd_and_hms(2025, 3, 14, hour, minute, second)
        .single()
        .expect("unambiguous local time")
}
