//! Telemetry backend client

use std::sync::Arc;

use crate::config::SourceConfig;
use crate::io::HttpClient;
use crate::reading::{DeviceSummary, RawDevice, RawReading, Reading};

/// Client for the fire-alert telemetry backend
pub struct TelemetrySource {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TelemetrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TelemetrySource {
    pub fn new(config: &SourceConfig, http: Arc<dyn HttpClient>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created TelemetrySource at {}", base_url);
        Self { base_url, http }
    }

    /// Fetch the device roster
    pub async fn fetch_devices(&self, polled_at_ms: u64) -> crate::Result<Vec<DeviceSummary>> {
        let url = format!("{}/devices", self.base_url);
        let body = self.get_ok(&url).await?;
        let raw: Vec<RawDevice> = serde_json::from_str(&body)
            .map_err(|e| crate::FirewatchError::Http(format!("Parsing {}: {}", url, e)))?;
        Ok(raw.into_iter().map(|d| d.normalize(polled_at_ms)).collect())
    }

    /// Fetch the latest reading for one device
    pub async fn fetch_latest(&self, device_id: &str, polled_at_ms: u64) -> crate::Result<Reading> {
        let url = format!("{}/devices/{}/latest", self.base_url, device_id);
        let body = self.get_ok(&url).await?;
        let raw: RawReading = serde_json::from_str(&body)
            .map_err(|e| crate::FirewatchError::Http(format!("Parsing {}: {}", url, e)))?;

        let mut reading = raw.normalize(polled_at_ms);
        if reading.device_id == "device-unknown" {
            reading.device_id = device_id.to_string();
        }
        Ok(reading)
    }

    async fn get_ok(&self, url: &str) -> crate::Result<String> {
        let response = self.http.get(url).await?;
        if response.status != 200 {
            return Err(crate::FirewatchError::Http(format!(
                "GET {} returned status {}",
                url, response.status
            )));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn test_config() -> SourceConfig {
        SourceConfig {
            base_url: "http://localhost:9000/api/".to_string(),
            ..SourceConfig::default()
        }
    }

    fn ok(body: &str) -> crate::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn fetch_devices_normalizes_roster() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url == "http://localhost:9000/api/devices")
            .returning(|_| {
                Box::pin(async {
                    ok(r#"[
                        {"deviceId": "d-1", "deviceName": "Ridge North"},
                        {"_id": "77", "latest": {"temp": 31.5, "isfire": false, "ts": 50}}
                    ]"#)
                })
            });

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let devices = source.fetch_devices(1000).await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device_id, "d-1");
        assert_eq!(devices[0].name, "Ridge North");
        assert_eq!(devices[1].device_id, "device-77");
        assert_eq!(devices[1].latest.as_ref().unwrap().temperature, 31.5);
    }

    #[tokio::test]
    async fn fetch_latest_tolerates_schema_variants() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url == "http://localhost:9000/api/devices/d-1/latest")
            .returning(|_| {
                Box::pin(async { ok(r#"{"temperature": 44.0, "isFire": true, "hum": 28.0}"#) })
            });

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let reading = source.fetch_latest("d-1", 7777).await.unwrap();

        assert_eq!(reading.device_id, "d-1");
        assert_eq!(reading.temperature, 44.0);
        assert_eq!(reading.humidity, 28.0);
        assert!(reading.fire);
        // missing timestamp falls back to the poll time
        assert_eq!(reading.timestamp_epoch_ms, 7777);
    }

    #[tokio::test]
    async fn fetch_latest_defaults_malformed_fields() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .returning(|_| Box::pin(async { ok(r#"{"isfire": true}"#) }));

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let reading = source.fetch_latest("d-9", 100).await.unwrap();

        assert_eq!(reading.device_id, "d-9");
        assert_eq!(reading.temperature, 0.0);
        assert_eq!(reading.smoke, 0.0);
        assert_eq!(reading.humidity, 0.0);
        assert!(reading.fire);
    }

    #[tokio::test]
    async fn non_200_is_an_http_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 500,
                    body: "Internal Server Error".to_string(),
                })
            })
        });

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let err = source.fetch_latest("d-1", 0).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Err(crate::FirewatchError::Http(
                    "connection refused".to_string(),
                ))
            })
        });

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let err = source.fetch_devices(0).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn invalid_json_is_an_http_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .returning(|_| Box::pin(async { ok("not json") }));

        let source = TelemetrySource::new(&test_config(), Arc::new(mock));
        let err = source.fetch_devices(0).await.unwrap_err();
        assert!(err.to_string().contains("Parsing"));
    }
}
