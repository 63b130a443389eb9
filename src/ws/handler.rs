//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::SessionToken;
use crate::error::StorefrontError;

/// Query string of the upgrade request.
///
/// Browsers cannot set headers on a WebSocket handshake, so the bearer
/// token travels as `?token=`.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    /// Session bearer token.
    pub token: String,
}

/// `GET /ws?token=...` — Upgrade HTTP connection to WebSocket.
///
/// # Errors
///
/// Returns [`StorefrontError::Unauthorized`] before upgrading when the
/// token does not name an open session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, StorefrontError> {
    let token = SessionToken::from_string(query.token);
    let session = state.identity.authenticate(&token).await?;
    let event_rx = state.event_bus.subscribe();

    Ok(ws.on_upgrade(move |socket| run_connection(socket, event_rx, session)))
}
