//! HTTP route handlers.

use crate::config::HubConfig;
use crate::connection::{serve_connection, websocket::split_socket};
use crate::registry::SessionRegistry;
use crate::session::SessionId;
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) config: Arc<HubConfig>,
}

/// Body returned when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub game_id: SessionId,
}

/// `GET|POST /game`
pub(crate) async fn create_game(State(state): State<AppState>) -> Json<CreatedSession> {
    let (id, _handle) = state.registry.create_session();
    Json(CreatedSession { game_id: id })
}

/// `GET /game/:id`
///
/// Upgrades to a game connection. Unknown sessions are answered `404`,
/// disallowed origins `403` and plain HTTP requests `426`.
pub(crate) async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let session = match state.registry.get_session(&id) {
        Ok(session) => session,
        Err(e) => {
            debug!("Join rejected: {}", e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    if !state.config.origin_allowed(origin) {
        warn!("🚫 Refused connection to session {} from origin {:?}", id, origin);
        return StatusCode::FORBIDDEN.into_response();
    }

    let Some(ws) = ws else {
        return StatusCode::UPGRADE_REQUIRED.into_response();
    };

    let connection_config = state.config.connection_config();
    ws.max_message_size(connection_config.max_message_size)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = split_socket(socket);
            // Outcome is logged by the adapter.
            let _ = serve_connection(sink, stream, session, connection_config).await;
        })
}

/// `DELETE /game/:id`
pub(crate) async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    state.registry.delete_session(&id);
    StatusCode::NO_CONTENT
}
