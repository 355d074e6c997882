//! Sensor reading types and wire-format normalization

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status label derived from a reading's fire flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Fire,
    Normal,
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingStatus::Fire => write!(f, "Fire"),
            ReadingStatus::Normal => write!(f, "Normal"),
        }
    }
}

/// One normalized sensor sample. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub smoke: f64,
    pub fire: bool,
    pub timestamp_epoch_ms: u64,
    pub status: ReadingStatus,
}

impl Reading {
    /// Identity of the underlying observation. Two readings with equal keys
    /// are the same sample and the second one is discarded.
    pub fn dedup_key(&self) -> (u64, u64, u64, u64) {
        (
            self.timestamp_epoch_ms,
            self.temperature.to_bits(),
            self.humidity.to_bits(),
            self.smoke.to_bits(),
        )
    }
}

/// Raw wire record for a reading. Field names vary across firmware
/// revisions, so every field is optional and carries the known aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReading {
    #[serde(default, alias = "_id", alias = "recordId")]
    pub id: Option<String>,
    #[serde(default, alias = "deviceId", alias = "device")]
    pub device_id: Option<String>,
    #[serde(default, alias = "deviceName")]
    pub name: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "hum")]
    pub humidity: Option<f64>,
    #[serde(default, alias = "temp")]
    pub temperature: Option<f64>,
    #[serde(default, alias = "smokeLevel", alias = "smoke_level")]
    pub smoke: Option<f64>,
    #[serde(default, alias = "isFire", alias = "isfire", alias = "is_fire")]
    pub fire: Option<bool>,
    #[serde(default, alias = "time", alias = "ts")]
    pub timestamp: Option<u64>,
}

impl RawReading {
    /// Normalize a wire record. Missing or malformed fields are defaulted
    /// instead of rejecting the sample: numerics become 0.0, a missing
    /// device id falls back to a placeholder derived from the record id,
    /// and a missing timestamp falls back to the poll time.
    pub fn normalize(self, polled_at_ms: u64) -> Reading {
        let device_id = self
            .device_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.id.as_ref().map(|id| format!("device-{id}")))
            .unwrap_or_else(|| "device-unknown".to_string());
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| device_id.clone());
        let fire = self.fire.unwrap_or(false);
        let status = if fire {
            ReadingStatus::Fire
        } else {
            ReadingStatus::Normal
        };

        Reading {
            device_id,
            name,
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            humidity: self.humidity.unwrap_or(0.0),
            temperature: self.temperature.unwrap_or(0.0),
            smoke: self.smoke.unwrap_or(0.0),
            fire,
            timestamp_epoch_ms: self.timestamp.unwrap_or(polled_at_ms),
            status,
        }
    }
}

/// One device in the fetch-all roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub name: String,
    pub latest: Option<Reading>,
}

/// Raw wire record for a device summary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDevice {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "deviceId", alias = "device")]
    pub device_id: Option<String>,
    #[serde(default, alias = "deviceName")]
    pub name: Option<String>,
    #[serde(default, alias = "latest", alias = "lastReading", alias = "last_reading")]
    pub reading: Option<RawReading>,
}

impl RawDevice {
    pub fn normalize(self, polled_at_ms: u64) -> DeviceSummary {
        let device_id = self
            .device_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.id.as_ref().map(|id| format!("device-{id}")))
            .unwrap_or_else(|| "device-unknown".to_string());
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| device_id.clone());
        let latest = self.reading.map(|r| {
            let mut reading = r.normalize(polled_at_ms);
            // per-device endpoints often omit the id on nested readings
            if reading.device_id == "device-unknown" {
                reading.device_id = device_id.clone();
            }
            reading
        });

        DeviceSummary {
            device_id,
            name,
            latest,
        }
    }
}
