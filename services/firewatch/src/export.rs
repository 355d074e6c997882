//! CSV export of a session's readings

use chrono::{SecondsFormat, TimeZone, Utc};

use crate::session::FireSession;

/// Render a session's retained readings as CSV, oldest first
pub fn session_csv(session: &FireSession) -> String {
    let mut out = String::from("timestamp,temperature,humidity,smoke,status\n");
    for reading in session.readings.iter().rev() {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            format_epoch_ms(reading.timestamp_epoch_ms),
            reading.temperature,
            reading.humidity,
            reading.smoke,
            reading.status,
        ));
    }
    out
}

/// Download filename for a session export
pub fn export_filename(session: &FireSession) -> String {
    format!("fire-session-{}.csv", session.id)
}

fn format_epoch_ms(epoch_ms: u64) -> String {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| epoch_ms.to_string())
}
