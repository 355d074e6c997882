//! Shared state for the poll loops and dashboard

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::aggregator::Aggregator;
use crate::config::AggregatorConfig;
use crate::reading::DeviceSummary;

/// State shared between the engine and the dashboard
#[derive(Debug)]
pub struct SharedState {
    pub aggregator: Aggregator,
    pub devices: Vec<DeviceSummary>,
    /// Device currently being monitored by the reading loop
    pub monitored: Option<String>,
    /// Most recent fetch failure, cleared on the next successful poll
    pub last_error: Option<String>,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(config: &AggregatorConfig, monitored: Option<String>) -> Self {
        Self {
            aggregator: Aggregator::new(config.clone()),
            devices: Vec::new(),
            monitored,
            last_error: None,
            started_at: Instant::now(),
        }
    }

    /// Switch monitoring to a device. The short-term reading history for
    /// that device starts fresh; sessions are untouched.
    pub fn select_device(&mut self, device_id: &str) {
        self.aggregator.reset_history(device_id);
        self.monitored = Some(device_id.to_string());
    }

    pub fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(config: &AggregatorConfig, monitored: Option<String>) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(config, monitored)))
}
