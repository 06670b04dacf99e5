// HTTP request handlers for the operator console
use crate::application::history_store::export_file_name;
use crate::application::link_error::LinkError;
use crate::application::session_stats::SessionStatsSnapshot;
use crate::application::status_sink::StatusSink;
use crate::domain::command::Command;
use crate::domain::link_state::LinkState;
use crate::domain::status::StatusLine;
use crate::domain::telemetry::{ChartSeries, Reading};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Serialize)]
pub struct ReadingView {
    pub time: String,
    pub thrust: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<&Reading> for ReadingView {
    fn from(reading: &Reading) -> Self {
        Self {
            time: reading.time_label(),
            thrust: reading.thrust,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: LinkState,
    pub endpoint: String,
    pub status: String,
    pub stats: SessionStatsSnapshot,
    pub latest: Option<ReadingView>,
    pub session_records: usize,
    pub history_capacity: usize,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Link state, latest status line and session counters
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let history = state.manager.history();
    Json(StatusResponse {
        state: state.manager.state(),
        endpoint: state.manager.describe_transport(),
        status: state.status.current(),
        stats: state.manager.stats(),
        latest: history.latest().as_ref().map(ReadingView::from),
        session_records: history.session_len(),
        history_capacity: history.capacity(),
    })
}

/// Rolling thrust window for the live chart
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<ChartSeries> {
    Json(state.manager.history().chart_series())
}

pub async fn connect(State(state): State<Arc<AppState>>) -> Response {
    match state.manager.connect().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => link_error_response(e),
    }
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> StatusCode {
    state.manager.disconnect().await;
    StatusCode::NO_CONTENT
}

/// Send `arm`, `safe`, `test` or `launch` to the pad
pub async fn send_command(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let command = match name.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match state.manager.send(command).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => link_error_response(e),
    }
}

/// Session log as a CSV download
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Response {
    let history = state.manager.history();
    let csv = history.export_records();
    let file_name = export_file_name(chrono::Utc::now());
    let disposition = format!("attachment; filename=\"{}\"", file_name);

    tracing::info!(%file_name, records = history.session_len(), "session log exported");
    state.status.publish_line(StatusLine::DataSaved);

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

/// Server-sent events: `status` for each new status line, `link` for each
/// link state change.
pub async fn status_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let lines = WatchStream::new(state.status.subscribe())
        .map(|status| Event::default().event("status").data(status));
    let links = WatchStream::new(state.manager.subscribe())
        .map(|link| Event::default().event("link").data(link.to_string()));
    Sse::new(futures::stream::select(lines, links).map(Ok)).keep_alive(KeepAlive::default())
}

fn link_error_response(err: LinkError) -> Response {
    let status = match &err {
        LinkError::NotConnected | LinkError::AlreadyConnected(_) | LinkError::ConnectAborted => {
            StatusCode::CONFLICT
        }
        LinkError::TransportUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connection_manager::{ConnectionManager, ConnectionSettings};
    use crate::application::history_store::{HistoryStore, CSV_HEADER};
    use crate::application::testing::{eventually, MockTransport, RecordingSink};
    use crate::infrastructure::status_board::StatusBoard;
    use bytes::Bytes;

    fn app_state(transport: Arc<MockTransport>) -> Arc<AppState> {
        let status = Arc::new(StatusBoard::new());
        let manager = Arc::new(ConnectionManager::new(
            transport,
            Arc::new(HistoryStore::default()),
            status.clone(),
            ConnectionSettings::default(),
        ));
        Arc::new(AppState { manager, status })
    }

    #[tokio::test]
    async fn test_command_while_disconnected_is_conflict() {
        let state = app_state(Arc::new(MockTransport::default()));

        let response = send_command(Path("launch".to_string()), State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(state.status.current().contains("Not connected"));
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_request() {
        let state = app_state(Arc::new(MockTransport::default()));
        let response = send_command(Path("abort".to_string()), State(state)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_connect_send_and_status() {
        let transport = Arc::new(MockTransport::default());
        let (feed, sink): (_, RecordingSink) = transport.add_session();
        let state = app_state(transport);

        assert_eq!(connect(State(state.clone())).await.status(), StatusCode::NO_CONTENT);
        let response = send_command(Path("ARM".to_string()), State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(sink.writes(), vec![b"A\n".to_vec()]);

        feed.send(Ok(Bytes::from_static(b"Thrust:5.5,Temp:20.0,Humi:41.0\n")))
            .unwrap();
        let history = state.manager.history().clone();
        eventually(|| history.session_len() == 1).await;

        let Json(status) = get_status(State(state.clone())).await;
        assert_eq!(status.state, LinkState::Connected);
        assert_eq!(status.session_records, 1);
        assert_eq!(status.latest.unwrap().thrust, Some(5.5));
        assert_eq!(status.stats.commands_sent, 1);

        let Json(series) = get_history(State(state.clone())).await;
        assert_eq!(series.values, vec![5.5]);

        let response = connect(State(state)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_connect_failure_is_service_unavailable() {
        let state = app_state(Arc::new(MockTransport::failing("no such device")));
        let response = connect(State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.status.current().contains("no such device"));
    }

    #[tokio::test]
    async fn test_export_headers() {
        let state = app_state(Arc::new(MockTransport::default()));
        let response = export_csv(State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.status.current(), "DATA SAVED as CSV.");
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"DhumketuX_Test_Data_"));
        assert!(disposition.ends_with(".csv\""));
        assert!(CSV_HEADER.starts_with("Time,"));
    }
}
