//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info};

use super::responses::{ErrorResponse, HealthResponse};
use crate::{
    protocol::{Command, CommandResponse},
    state::{AppState, SessionType},
};

/// Run a command and map the reply onto an HTTP status
async fn dispatch(state: &AppState, command: Command) -> Response {
    let name = command.name();
    match state.dispatch(command).await {
        Ok(response @ CommandResponse::Rejected { .. }) => {
            info!("{} rejected", name);
            (StatusCode::CONFLICT, Json(response)).into_response()
        }
        Ok(response) => {
            debug!("{} acknowledged", name);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to deliver {}: {}", name, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::unavailable(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Handle POST /command - Canonical command endpoint
pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<Command>,
) -> Response {
    dispatch(&state, command).await
}

/// Handle POST /start
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Response {
    dispatch(&state, Command::Start).await
}

/// Handle POST /pause
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Response {
    dispatch(&state, Command::Pause).await
}

/// Handle POST /reset
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Response {
    dispatch(&state, Command::Reset).await
}

/// Handle POST /switch/:target
pub async fn switch_handler(
    State(state): State<Arc<AppState>>,
    Path(target): Path<SessionType>,
) -> Response {
    dispatch(&state, Command::SwitchSession { target }).await
}

/// Handle GET /state
pub async fn state_handler(State(state): State<Arc<AppState>>) -> Response {
    dispatch(&state, Command::GetState).await
}

/// Handle GET /events - Broadcast stream as Server-Sent Events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Display attached to event stream");
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => Some(Ok(Event::default()
                .event(event.event_name())
                .data(event.to_sse_data()))),
            Err(e) => {
                // Slow reader skipped some updates; the next one is a full snapshot
                debug!("Event stream lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (last_command, last_command_time) = state.get_last_command();
    Json(HealthResponse::ok(
        state.get_uptime(),
        last_command,
        last_command_time,
    ))
}
