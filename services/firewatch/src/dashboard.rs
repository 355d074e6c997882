//! Web dashboard: live monitoring view, session reports, CSV export

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::export;
use crate::state::StateHandle;
use crate::store::ArchiveStore;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub store: Arc<dyn ArchiveStore>,
}

/// Build the dashboard axum router
pub fn build_router(state: StateHandle, store: Arc<dyn ArchiveStore>) -> Router {
    let dashboard_state = DashboardState { state, store };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/devices", get(devices_handler))
        .route("/api/live", get(live_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/monitor/{device_id}", put(monitor_handler))
        .route("/api/sessions/{id}", delete(delete_session_handler))
        .route("/api/sessions/{id}/export", get(export_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(dashboard_state)
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let monitored = state.monitored.clone().unwrap_or_else(|| "none".to_string());
    let current_row = state
        .monitored
        .as_deref()
        .and_then(|id| state.aggregator.current_reading(id))
        .map(|r| {
            let (color, bg) = if r.fire {
                ("#721c24", "#f8d7da")
            } else {
                ("#155724", "#d4edda")
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                    <td style="padding: 0.5rem;">
                        <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>
                    </td>
                </tr>"#,
                r.name, r.temperature, r.humidity, r.smoke, color, bg, r.status
            )
        })
        .unwrap_or_else(|| {
            r#"<tr><td colspan="5" style="padding: 0.5rem;">No readings yet</td></tr>"#.to_string()
        });

    let session_rows: String = state
        .aggregator
        .archived()
        .iter()
        .map(|s| {
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{:.1} / {:.1} / {:.1}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;"><a href="/api/sessions/{}/export">CSV</a></td>
                </tr>"#,
                s.id,
                s.device_id,
                s.stats.min_temperature,
                s.stats.avg_temperature,
                s.stats.max_temperature,
                s.readings.len(),
                s.id
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Firewatch Dashboard</title>
    <script>
        function refreshData() {{
            fetch('/api/live')
                .then(r => r.json())
                .then(data => {{
                    const tbody = document.getElementById('live-body');
                    if (!data.current) {{
                        tbody.innerHTML = '<tr><td colspan="5" style="padding: 0.5rem;">No readings yet</td></tr>';
                        return;
                    }}
                    const r = data.current;
                    const [color, bg] = r.fire ? ['#721c24', '#f8d7da'] : ['#155724', '#d4edda'];
                    tbody.innerHTML = `<tr style="border-bottom: 1px solid #dee2e6;">
                        <td style="padding: 0.5rem;">${{r.name}}</td>
                        <td style="padding: 0.5rem;">${{r.temperature.toFixed(1)}}</td>
                        <td style="padding: 0.5rem;">${{r.humidity.toFixed(1)}}</td>
                        <td style="padding: 0.5rem;">${{r.smoke.toFixed(1)}}</td>
                        <td style="padding: 0.5rem;">
                            <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: ${{color}}; background-color: ${{bg}};">${{r.fire ? 'Fire' : 'Normal'}}</span>
                        </td>
                    </tr>`;
                }});
            fetch('/api/sessions')
                .then(r => r.json())
                .then(data => {{
                    const tbody = document.getElementById('session-body');
                    tbody.innerHTML = data.map(s => `<tr style="border-bottom: 1px solid #dee2e6;">
                        <td style="padding: 0.5rem;">${{s.id}}</td>
                        <td style="padding: 0.5rem;">${{s.device_id}}</td>
                        <td style="padding: 0.5rem;">${{s.stats.min_temperature.toFixed(1)}} / ${{s.stats.avg_temperature.toFixed(1)}} / ${{s.stats.max_temperature.toFixed(1)}}</td>
                        <td style="padding: 0.5rem;">${{s.readings.length}}</td>
                        <td style="padding: 0.5rem;"><a href="/api/sessions/${{s.id}}/export">CSV</a></td>
                    </tr>`).join('');
                }});
        }}
        setInterval(refreshData, 5000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Firewatch Dashboard</h1>
    <section>
        <h2>Live Monitoring ({monitored})</h2>
        <table style="width: 100%; border-collapse: collapse;">
            <thead>
                <tr style="border-bottom: 2px solid #dee2e6;">
                    <th style="padding: 0.5rem; text-align: left;">Device</th>
                    <th style="padding: 0.5rem; text-align: left;">Temperature</th>
                    <th style="padding: 0.5rem; text-align: left;">Humidity</th>
                    <th style="padding: 0.5rem; text-align: left;">Smoke</th>
                    <th style="padding: 0.5rem; text-align: left;">Status</th>
                </tr>
            </thead>
            <tbody id="live-body">{current_row}</tbody>
        </table>
    </section>
    <section>
        <h2>Fire Session Reports</h2>
        <table style="width: 100%; border-collapse: collapse;">
            <thead>
                <tr style="border-bottom: 2px solid #dee2e6;">
                    <th style="padding: 0.5rem; text-align: left;">Session</th>
                    <th style="padding: 0.5rem; text-align: left;">Device</th>
                    <th style="padding: 0.5rem; text-align: left;">Temp min/avg/max</th>
                    <th style="padding: 0.5rem; text-align: left;">Readings</th>
                    <th style="padding: 0.5rem; text-align: left;">Export</th>
                </tr>
            </thead>
            <tbody id="session-body">{session_rows}</tbody>
        </table>
    </section>
</body>
</html>"#,
        monitored = monitored,
        current_row = current_row,
        session_rows = session_rows,
    );

    Html(html)
}

async fn devices_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    axum::Json(state.devices.clone())
}

async fn live_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let (current, history, active_session) = match state.monitored.as_deref() {
        Some(id) => (
            state.aggregator.current_reading(id).cloned(),
            state
                .aggregator
                .history(id)
                .map(|h| h.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default(),
            state.aggregator.active_session(id).cloned(),
        ),
        None => (None, Vec::new(), None),
    };

    axum::Json(serde_json::json!({
        "monitored": state.monitored,
        "current": current,
        "history": history,
        "active_session": active_session,
        "last_error": state.last_error,
    }))
}

async fn sessions_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    let sessions: Vec<_> = state.aggregator.archived().iter().cloned().collect();
    axum::Json(sessions)
}

async fn monitor_handler(
    State(dashboard): State<DashboardState>,
    Path(device_id): Path<String>,
) -> impl IntoResponse {
    tracing::info!("Switching monitoring to '{}'", device_id);
    dashboard.state.write().await.select_device(&device_id);
    StatusCode::NO_CONTENT
}

async fn delete_session_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let sessions = {
        let mut state = dashboard.state.write().await;
        if !state.aggregator.delete_archived(&id) {
            return StatusCode::NOT_FOUND;
        }
        state
            .aggregator
            .archived()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
    };

    if let Err(e) = dashboard.store.save(&sessions).await {
        tracing::warn!("Failed to persist archive after deleting '{}': {}", id, e);
    }
    StatusCode::NO_CONTENT
}

async fn export_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    match state.aggregator.find_archived(&id) {
        Some(session) => {
            let csv = export::session_csv(session);
            let disposition =
                format!("attachment; filename=\"{}\"", export::export_filename(session));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
