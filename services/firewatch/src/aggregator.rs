//! Session aggregation state machine
//!
//! Consumes a chronological stream of readings per device and maintains
//! the active sessions, the completed-session archive, and a short rolling
//! history of raw readings. All transitions happen synchronously inside
//! [`Aggregator::observe`]; the caller owns the instance and drives it from
//! whatever poller it runs.

use std::collections::{HashMap, VecDeque};

use crate::config::AggregatorConfig;
use crate::reading::Reading;
use crate::session::FireSession;

/// Effect of observing one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The same observation was already in the short-term history
    Duplicate,
    /// No session open and nothing burning
    Idle,
    /// A new session was opened
    Opened,
    /// The reading was merged into the active session
    Updated,
    /// The admission rule rejected the update; the session is untouched
    Throttled,
    /// The active session was closed and archived. The archive changed and
    /// must be persisted by the caller.
    Closed,
}

/// Aggregation state for all devices
#[derive(Debug)]
pub struct Aggregator {
    config: AggregatorConfig,
    active: HashMap<String, FireSession>,
    archive: VecDeque<FireSession>,
    history: HashMap<String, VecDeque<Reading>>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            active: HashMap::new(),
            archive: VecDeque::new(),
            history: HashMap::new(),
        }
    }

    /// Seed the archive from the persisted store at startup
    pub fn restore_archive(&mut self, sessions: Vec<FireSession>) {
        self.archive = sessions
            .into_iter()
            .take(self.config.archive_cap)
            .collect();
    }

    /// Observe one reading and apply the session transition logic
    pub fn observe(&mut self, reading: Reading) -> Outcome {
        let device_id = reading.device_id.clone();

        let history = self.history.entry(device_id.clone()).or_default();
        let key = reading.dedup_key();
        if history.iter().any(|r| r.dedup_key() == key) {
            return Outcome::Duplicate;
        }
        history.push_front(reading.clone());
        history.truncate(self.config.history_cap);

        if reading.fire {
            match self.active.get_mut(&device_id) {
                None => {
                    self.active.insert(device_id, FireSession::open(reading));
                    Outcome::Opened
                }
                Some(session) => {
                    if admits(session.last_merged(), &reading, &self.config) {
                        session.merge(reading, self.config.session_readings_cap);
                        Outcome::Updated
                    } else {
                        Outcome::Throttled
                    }
                }
            }
        } else if let Some(mut session) = self.active.remove(&device_id) {
            // the closing reading bypasses the admission throttle
            session.close(reading, self.config.session_readings_cap);
            self.archive.push_front(session);
            self.archive.truncate(self.config.archive_cap);
            Outcome::Closed
        } else {
            Outcome::Idle
        }
    }

    /// Drop the short-term history for a device. Called when monitoring of
    /// that device is (re)started; active sessions and the archive are
    /// unaffected.
    pub fn reset_history(&mut self, device_id: &str) {
        self.history.remove(device_id);
    }

    /// Remove a session from the archive, returning whether it was present
    pub fn delete_archived(&mut self, session_id: &str) -> bool {
        let before = self.archive.len();
        self.archive.retain(|s| s.id != session_id);
        self.archive.len() != before
    }

    pub fn active_session(&self, device_id: &str) -> Option<&FireSession> {
        self.active.get(device_id)
    }

    /// Completed sessions, newest first
    pub fn archived(&self) -> &VecDeque<FireSession> {
        &self.archive
    }

    pub fn find_archived(&self, session_id: &str) -> Option<&FireSession> {
        self.archive.iter().find(|s| s.id == session_id)
    }

    /// Short-term raw reading history for a device, newest first
    pub fn history(&self, device_id: &str) -> Option<&VecDeque<Reading>> {
        self.history.get(device_id)
    }

    /// The most recently observed reading for a device, throttled or not
    pub fn current_reading(&self, device_id: &str) -> Option<&Reading> {
        self.history.get(device_id).and_then(|h| h.front())
    }
}

/// Update-admission rule for an already active session: merge when enough
/// time has passed since the last merged reading, or when the candidate
/// moved far enough on any sensor axis.
fn admits(last: Option<&Reading>, candidate: &Reading, config: &AggregatorConfig) -> bool {
    let Some(last) = last else {
        return true;
    };
    let elapsed = candidate
        .timestamp_epoch_ms
        .saturating_sub(last.timestamp_epoch_ms);
    elapsed >= config.throttle_ms
        || (candidate.temperature - last.temperature).abs() > config.temperature_delta
        || (candidate.smoke - last.smoke).abs() > config.smoke_delta
        || (candidate.humidity - last.humidity).abs() > config.humidity_delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::RawReading;
    use crate::session::SessionStatus;

    fn reading(device: &str, fire: bool, temp: f64, ts: u64) -> Reading {
        full_reading(device, fire, temp, 10.0, 30.0, ts)
    }

    fn full_reading(
        device: &str,
        fire: bool,
        temp: f64,
        smoke: f64,
        humidity: f64,
        ts: u64,
    ) -> Reading {
        RawReading {
            device_id: Some(device.to_string()),
            temperature: Some(temp),
            smoke: Some(smoke),
            humidity: Some(humidity),
            fire: Some(fire),
            timestamp: Some(ts),
            ..RawReading::default()
        }
        .normalize(ts)
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(AggregatorConfig::default())
    }

    #[test]
    fn fire_reading_opens_session() {
        let mut agg = aggregator();
        assert_eq!(agg.observe(reading("d-1", true, 45.0, 1000)), Outcome::Opened);

        let session = agg.active_session("d-1").unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.started_epoch_ms, 1000);
    }

    #[test]
    fn non_fire_reading_without_session_is_idle() {
        let mut agg = aggregator();
        assert_eq!(agg.observe(reading("d-1", false, 20.0, 1000)), Outcome::Idle);
        assert!(agg.active_session("d-1").is_none());
        assert!(agg.archived().is_empty());
    }

    #[test]
    fn duplicate_reading_is_discarded() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        assert_eq!(
            agg.observe(reading("d-1", true, 45.0, 1000)),
            Outcome::Duplicate
        );
        assert_eq!(agg.history("d-1").unwrap().len(), 1);
        assert_eq!(agg.active_session("d-1").unwrap().readings.len(), 1);
    }

    #[test]
    fn throttled_update_touches_history_but_not_session() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        // 1s later, within every delta
        assert_eq!(
            agg.observe(reading("d-1", true, 45.5, 2000)),
            Outcome::Throttled
        );

        assert_eq!(agg.history("d-1").unwrap().len(), 2);
        assert_eq!(agg.current_reading("d-1").unwrap().temperature, 45.5);
        let session = agg.active_session("d-1").unwrap();
        assert_eq!(session.readings.len(), 1);
        assert_eq!(session.stats.max_temperature, 45.0);
    }

    #[test]
    fn elapsed_time_admits_update() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        assert_eq!(
            agg.observe(reading("d-1", true, 45.5, 6000)),
            Outcome::Updated
        );
        assert_eq!(agg.active_session("d-1").unwrap().readings.len(), 2);
    }

    #[test]
    fn temperature_jump_bypasses_throttle() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        assert_eq!(
            agg.observe(reading("d-1", true, 47.0, 1500)),
            Outcome::Updated
        );
    }

    #[test]
    fn smoke_jump_bypasses_throttle() {
        let mut agg = aggregator();
        agg.observe(full_reading("d-1", true, 45.0, 10.0, 30.0, 1000));
        assert_eq!(
            agg.observe(full_reading("d-1", true, 45.0, 16.0, 30.0, 1500)),
            Outcome::Updated
        );
    }

    #[test]
    fn humidity_jump_bypasses_throttle() {
        let mut agg = aggregator();
        agg.observe(full_reading("d-1", true, 45.0, 10.0, 30.0, 1000));
        assert_eq!(
            agg.observe(full_reading("d-1", true, 45.0, 10.0, 33.0, 1500)),
            Outcome::Updated
        );
    }

    #[test]
    fn delta_at_threshold_is_throttled() {
        let mut agg = aggregator();
        agg.observe(full_reading("d-1", true, 45.0, 10.0, 30.0, 1000));
        // exactly 1.0 / 5.0 / 2.0 away on each axis, inside the time window
        assert_eq!(
            agg.observe(full_reading("d-1", true, 46.0, 15.0, 32.0, 1500)),
            Outcome::Throttled
        );
    }

    #[test]
    fn non_fire_reading_closes_session() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        assert_eq!(
            agg.observe(reading("d-1", false, 22.0, 9000)),
            Outcome::Closed
        );

        assert!(agg.active_session("d-1").is_none());
        let archived = agg.archived();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].status, SessionStatus::Completed);
        assert_eq!(archived[0].ended_epoch_ms, Some(9000));
    }

    /// Open, throttled middle reading, close: the throttled reading must
    /// never reach the session's stats.
    #[test]
    fn throttled_reading_is_never_merged() {
        let mut agg = aggregator();
        assert_eq!(agg.observe(reading("d-1", false, 20.0, 0)), Outcome::Idle);
        assert_eq!(agg.observe(reading("d-1", true, 45.0, 1000)), Outcome::Opened);
        // within 5000ms and temp delta <= 1: observed but not merged
        assert_eq!(
            agg.observe(reading("d-1", true, 45.9, 3000)),
            Outcome::Throttled
        );
        assert_eq!(
            agg.observe(reading("d-1", false, 22.0, 4000)),
            Outcome::Closed
        );

        let session = &agg.archived()[0];
        assert_eq!(session.readings.len(), 2);
        assert_eq!(session.stats.max_temperature, 45.0);
        assert_eq!(session.stats.min_temperature, 22.0);
    }

    #[test]
    fn archive_is_capped() {
        let mut agg = aggregator();
        for i in 0..15u64 {
            let base = i * 100_000;
            agg.observe(reading("d-1", true, 45.0 + i as f64, base));
            agg.observe(reading("d-1", false, 20.0 + i as f64, base + 10_000));
        }
        assert_eq!(agg.archived().len(), 10);
        // newest first
        assert_eq!(agg.archived()[0].started_epoch_ms, 14 * 100_000);
    }

    #[test]
    fn history_is_capped() {
        let mut agg = aggregator();
        for i in 0..40u64 {
            agg.observe(reading("d-1", false, 20.0 + i as f64, i * 1000));
        }
        assert_eq!(agg.history("d-1").unwrap().len(), 20);
    }

    #[test]
    fn session_reading_list_is_capped() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 0));
        for i in 1..80u64 {
            agg.observe(reading("d-1", true, 45.0 + (i % 10) as f64, i * 6000));
        }
        assert!(agg.active_session("d-1").unwrap().readings.len() <= 50);
    }

    #[test]
    fn devices_have_independent_sessions() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        agg.observe(reading("d-2", true, 50.0, 1000));
        agg.observe(reading("d-1", false, 20.0, 9000));

        assert!(agg.active_session("d-1").is_none());
        assert!(agg.active_session("d-2").is_some());
        assert_eq!(agg.archived().len(), 1);
        assert_eq!(agg.archived()[0].device_id, "d-1");
    }

    #[test]
    fn reset_history_starts_fresh_without_resurrecting_sessions() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        agg.observe(reading("d-1", false, 22.0, 9000));
        assert_eq!(agg.archived().len(), 1);

        agg.reset_history("d-1");
        assert!(agg.history("d-1").is_none());
        assert!(agg.active_session("d-1").is_none());
        assert_eq!(agg.archived().len(), 1);

        // a reading identical to an earlier one is no longer a duplicate
        assert_eq!(agg.observe(reading("d-1", true, 45.0, 1000)), Outcome::Opened);
    }

    #[test]
    fn delete_archived_removes_by_id() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        agg.observe(reading("d-1", false, 22.0, 9000));
        let id = agg.archived()[0].id.clone();

        assert!(agg.delete_archived(&id));
        assert!(agg.archived().is_empty());
        assert!(!agg.delete_archived(&id));
    }

    #[test]
    fn restore_archive_respects_cap() {
        let mut agg = aggregator();
        let mut sessions = Vec::new();
        for i in 0..15u64 {
            let mut s = FireSession::open(reading("d-1", true, 45.0, i * 1000));
            s.close(reading("d-1", false, 20.0, i * 1000 + 500), 50);
            sessions.push(s);
        }
        agg.restore_archive(sessions);
        assert_eq!(agg.archived().len(), 10);
    }

    #[test]
    fn find_archived_by_id() {
        let mut agg = aggregator();
        agg.observe(reading("d-1", true, 45.0, 1000));
        agg.observe(reading("d-1", false, 22.0, 9000));

        assert!(agg.find_archived("d-1-1000").is_some());
        assert!(agg.find_archived("d-1-9999").is_none());
    }
}
