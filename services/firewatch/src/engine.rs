//! Poll loops driving the session aggregator
//!
//! Two independent timers: one refreshes the device roster, one fetches the
//! latest reading for the monitored device and feeds it to the aggregator.
//! Neither loop retries a failed fetch; the failure is recorded in shared
//! state and the next tick tries again.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::aggregator::Outcome;
use crate::client::TelemetrySource;
use crate::config::Config;
use crate::state::StateHandle;
use crate::store::ArchiveStore;

/// The engine owns the poll loops and the archive persistence
pub struct Engine {
    source: Arc<TelemetrySource>,
    store: Arc<dyn ArchiveStore>,
    state: StateHandle,
    cancel: CancellationToken,
    device_poll: Duration,
    reading_poll: Duration,
}

impl Engine {
    pub fn new(
        source: Arc<TelemetrySource>,
        store: Arc<dyn ArchiveStore>,
        config: &Config,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            store,
            state,
            cancel,
            device_poll: Duration::from_secs(config.source.device_poll_seconds),
            reading_poll: Duration::from_secs(config.source.reading_poll_seconds),
        }
    }

    /// Load the persisted archive into the aggregator. A corrupt or
    /// unreadable document is logged and the service starts empty.
    pub async fn restore_archive(&self) {
        match self.store.load().await {
            Ok(sessions) => {
                tracing::info!("Restored {} archived sessions", sessions.len());
                self.state.write().await.aggregator.restore_archive(sessions);
            }
            Err(e) => {
                tracing::warn!("Failed to load session archive, starting empty: {}", e);
            }
        }
    }

    /// Start both poll loops. Returns when the cancellation token triggers.
    pub async fn run(&self) {
        let device_handle = {
            let source = Arc::clone(&self.source);
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            let interval = self.device_poll;
            tokio::spawn(async move {
                loop {
                    poll_devices_once(&source, &state).await;
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = cancel.cancelled() => {
                            tracing::debug!("Device poll loop cancelled");
                            break;
                        }
                    }
                }
            })
        };

        let reading_handle = {
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            let interval = self.reading_poll;
            tokio::spawn(async move {
                loop {
                    poll_reading_once(&source, &store, &state).await;
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = cancel.cancelled() => {
                            tracing::debug!("Reading poll loop cancelled");
                            break;
                        }
                    }
                }
            })
        };

        self.cancel.cancelled().await;
        let _ = device_handle.await;
        let _ = reading_handle.await;
    }
}

/// Refresh the device roster. Selects the first device when nothing is
/// monitored yet.
pub async fn poll_devices_once(source: &TelemetrySource, state: &StateHandle) {
    let now_ms = current_epoch_ms();
    match source.fetch_devices(now_ms).await {
        Ok(devices) => {
            tracing::debug!("Device roster: {} devices", devices.len());
            let mut state = state.write().await;
            if state.monitored.is_none() {
                if let Some(first) = devices.first() {
                    tracing::info!("Monitoring device '{}'", first.device_id);
                    state.select_device(&first.device_id);
                }
            }
            state.devices = devices;
            state.clear_error();
        }
        Err(e) => {
            tracing::debug!("Device roster fetch failed: {}", e);
            state.write().await.record_error(e.to_string());
        }
    }
}

/// Fetch the latest reading for the monitored device and feed it to the
/// aggregator, persisting the archive when a session closes.
pub async fn poll_reading_once(
    source: &TelemetrySource,
    store: &Arc<dyn ArchiveStore>,
    state: &StateHandle,
) {
    let Some(device_id) = state.read().await.monitored.clone() else {
        tracing::debug!("No device monitored yet, skipping reading poll");
        return;
    };

    let now_ms = current_epoch_ms();
    match source.fetch_latest(&device_id, now_ms).await {
        Ok(reading) => {
            let archived = {
                let mut state = state.write().await;
                state.clear_error();
                let outcome = state.aggregator.observe(reading);
                tracing::debug!("Observed reading for '{}': {:?}", device_id, outcome);
                if outcome == Outcome::Closed {
                    Some(state.aggregator.archived().iter().cloned().collect::<Vec<_>>())
                } else {
                    None
                }
            };

            if let Some(sessions) = archived {
                if let Err(e) = store.save(&sessions).await {
                    tracing::warn!("Failed to persist session archive: {}", e);
                }
            }
        }
        Err(e) => {
            tracing::debug!("Reading fetch for '{}' failed: {}", device_id, e);
            state.write().await.record_error(e.to_string());
        }
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
