// History store - Rolling chart window and per-session export log
use crate::domain::telemetry::{ChartSeries, Reading, ThrustSample};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Points kept for the live thrust chart.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

pub const CSV_HEADER: &str = "Time,Thrust (N),Temperature (°C),Humidity (%)";

#[derive(Debug, Default)]
struct HistoryInner {
    window: VecDeque<ThrustSample>,
    log: Vec<Reading>,
}

/// Owns the bounded thrust window and the unbounded session log.
///
/// Readers always get copies; the chart never sees a window mid-update.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    inner: RwLock<HistoryInner>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(HistoryInner {
                window: VecDeque::with_capacity(capacity),
                log: Vec::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Log every reading; only thrust-bearing ones reach the chart window.
    pub fn record(&self, reading: Reading) {
        let mut inner = self.write();
        if let Some(thrust) = reading.thrust {
            if inner.window.len() == self.capacity {
                inner.window.pop_front();
            }
            inner.window.push_back(ThrustSample::new(reading.timestamp, thrust));
        }
        inner.log.push(reading);
    }

    pub fn snapshot(&self) -> Vec<ThrustSample> {
        self.read().window.iter().copied().collect()
    }

    pub fn chart_series(&self) -> ChartSeries {
        ChartSeries::from_samples(&self.snapshot())
    }

    pub fn latest(&self) -> Option<Reading> {
        self.read().log.last().cloned()
    }

    pub fn session_len(&self) -> usize {
        self.read().log.len()
    }

    /// Session log as CSV, header first, rows in arrival order.
    pub fn export_records(&self) -> String {
        let inner = self.read();
        let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + inner.log.len() * 32);
        csv.push_str(CSV_HEADER);
        csv.push('\n');
        for reading in &inner.log {
            csv.push_str(&reading.to_csv_row());
            csv.push('\n');
        }
        csv
    }

    /// Clear both collections. Called once when a new connection opens.
    pub fn reset(&self) {
        let mut inner = self.write();
        inner.window.clear();
        inner.log.clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Download name for an export, e.g. `DhumketuX_Test_Data_2025-03-14T15-04-05-123Z.csv`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("DhumketuX_Test_Data_{}.csv", stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixed_time;
    use chrono::TimeZone;

    fn reading(thrust: Option<f64>, temperature: Option<f64>, humidity: Option<f64>) -> Reading {
        Reading {
            thrust,
            temperature,
            humidity,
            timestamp: fixed_time(14, 30, 0),
        }
    }

    #[test]
    fn test_window_keeps_last_hundred() {
        let store = HistoryStore::default();
        for i in 0..105 {
            store.record(reading(Some(i as f64), None, None));
        }

        let window = store.snapshot();
        assert_eq!(window.len(), 100);
        let thrusts: Vec<f64> = window.iter().map(|s| s.thrust).collect();
        let expected: Vec<f64> = (5..105).map(|i| i as f64).collect();
        assert_eq!(thrusts, expected);
        assert_eq!(store.session_len(), 105);
    }

    #[test]
    fn test_reading_without_thrust_only_logged() {
        let store = HistoryStore::default();
        store.record(reading(None, Some(22.1), Some(55.0)));

        assert!(store.snapshot().is_empty());
        assert_eq!(store.session_len(), 1);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = HistoryStore::new(3);
        store.record(reading(Some(1.0), None, None));
        let before = store.snapshot();
        store.record(reading(Some(2.0), None, None));

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_export_empty_log_is_header_only() {
        let store = HistoryStore::default();
        assert_eq!(store.export_records(), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_export_rows_match_format() {
        let store = HistoryStore::default();
        store.record(reading(Some(12.34), Some(22.1), Some(55.0)));
        store.record(reading(None, Some(21.96), None));
        store.record(reading(Some(3.0), None, Some(40.26)));

        let csv = store.export_records();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                CSV_HEADER,
                "2:30:00 PM,12.34,22.1,55.0",
                "2:30:00 PM,,22.0,",
                "2:30:00 PM,3.00,,40.3",
            ]
        );
    }

    #[test]
    fn test_export_line_count() {
        let store = HistoryStore::default();
        for i in 0..37 {
            store.record(reading(Some(i as f64), Some(20.0), None));
        }
        assert_eq!(store.export_records().lines().count(), 38);
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = HistoryStore::default();
        store.record(reading(Some(1.0), Some(2.0), Some(3.0)));
        store.reset();

        assert!(store.snapshot().is_empty());
        assert_eq!(store.session_len(), 0);
        assert!(store.latest().is_none());
    }

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 15, 4, 5).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(
            export_file_name(now),
            "DhumketuX_Test_Data_2025-03-14T15-04-05-123Z.csv"
        );
    }
}
