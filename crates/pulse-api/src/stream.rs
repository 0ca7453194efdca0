use axum::{
    extract::{
        Path, Query, State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use tracing::debug;

use pulse_gateway::Session;
use pulse_gateway::registry::normalize_username;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;
use crate::middleware::{bearer_token, ensure_same_user};

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

/// Upgrade to a live direct-message stream for `username`.
///
/// Every check runs before the upgrade, so a rejected client gets a plain
/// HTTP error and nothing is subscribed.
pub async fn stream_direct_messages(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    if normalize_username(&username).is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }

    let token = bearer_token(&headers)
        .or_else(|| query.token.as_deref().map(str::trim).filter(|t| !t.is_empty()))
        .ok_or(ApiError::Unauthorized)?;
    let claims = decode_token(&state.jwt_secret, token).ok_or(ApiError::Unauthorized)?;
    ensure_same_user(&claims, &username)?;

    let ws = ws.map_err(|e| {
        debug!(user = %username, "Rejected stream request: {}", e);
        ApiError::bad_request("websocket upgrade required")
    })?;

    let session = Session::new(
        state.hub.clone(),
        claims.username,
        state.session.clone(),
        state.shutdown.child_token(),
    );

    Ok(ws.on_upgrade(move |socket| async move {
        session.run(socket).await;
    }))
}
