//! Fire session records and running statistics

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "Active"),
            SessionStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Running statistics over the readings accepted into a session.
///
/// The min/max fields cover the whole accepted history and never shrink,
/// even after the bounded reading window evicts old samples. The averages
/// cover the retained window only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub avg_temperature: f64,
    pub min_smoke: f64,
    pub max_smoke: f64,
    pub avg_smoke: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    pub avg_humidity: f64,
}

impl SessionStats {
    fn seed(reading: &Reading) -> Self {
        Self {
            min_temperature: reading.temperature,
            max_temperature: reading.temperature,
            avg_temperature: reading.temperature,
            min_smoke: reading.smoke,
            max_smoke: reading.smoke,
            avg_smoke: reading.smoke,
            min_humidity: reading.humidity,
            max_humidity: reading.humidity,
            avg_humidity: reading.humidity,
        }
    }
}

/// An aggregation window over a contiguous run of fire readings from one
/// device. Mutable while active, archival once completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireSession {
    pub id: String,
    pub device_id: String,
    pub started_epoch_ms: u64,
    pub ended_epoch_ms: Option<u64>,
    pub status: SessionStatus,
    pub stats: SessionStats,
    /// Retained readings, newest first
    pub readings: VecDeque<Reading>,
}

impl FireSession {
    /// Open a new session from the reading that triggered fire detection
    pub fn open(reading: Reading) -> Self {
        Self {
            id: format!("{}-{}", reading.device_id, reading.timestamp_epoch_ms),
            device_id: reading.device_id.clone(),
            started_epoch_ms: reading.timestamp_epoch_ms,
            ended_epoch_ms: None,
            status: SessionStatus::Active,
            stats: SessionStats::seed(&reading),
            readings: VecDeque::from([reading]),
        }
    }

    /// The most recently merged reading, if any
    pub fn last_merged(&self) -> Option<&Reading> {
        self.readings.front()
    }

    /// Merge an accepted reading: prepend, truncate to the retained window,
    /// extend the running extrema, recompute averages over the window.
    pub fn merge(&mut self, reading: Reading, window: usize) {
        self.stats.min_temperature = self.stats.min_temperature.min(reading.temperature);
        self.stats.max_temperature = self.stats.max_temperature.max(reading.temperature);
        self.stats.min_smoke = self.stats.min_smoke.min(reading.smoke);
        self.stats.max_smoke = self.stats.max_smoke.max(reading.smoke);
        self.stats.min_humidity = self.stats.min_humidity.min(reading.humidity);
        self.stats.max_humidity = self.stats.max_humidity.max(reading.humidity);

        self.readings.push_front(reading);
        self.readings.truncate(window);

        let count = self.readings.len() as f64;
        self.stats.avg_temperature =
            self.readings.iter().map(|r| r.temperature).sum::<f64>() / count;
        self.stats.avg_smoke = self.readings.iter().map(|r| r.smoke).sum::<f64>() / count;
        self.stats.avg_humidity = self.readings.iter().map(|r| r.humidity).sum::<f64>() / count;
    }

    /// Close the session with the first non-fire reading. The closing
    /// reading is merged regardless of the admission throttle.
    pub fn close(&mut self, reading: Reading, window: usize) {
        let ended = reading.timestamp_epoch_ms;
        self.merge(reading, window);
        self.ended_epoch_ms = Some(ended);
        self.status = SessionStatus::Completed;
    }
}
