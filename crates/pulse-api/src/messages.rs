use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use pulse_types::api::{Claims, DirectMessageCreated, PageQuery, PeersResponse, SendDirectMessageRequest};
use pulse_types::events::DirectMessage;
use pulse_types::models::{NotificationKind, NotificationRef};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::ensure_same_user;

const DEFAULT_PAGE: u32 = 100;
const MAX_PAGE: u32 = 200;

pub async fn send_direct_message(
    State(state): State<AppState>,
    Path((username, other)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendDirectMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_same_user(&claims, &username)?;
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("message content is required"));
    }

    // Durable write first; live and push delivery are best effort on top.
    let message = state
        .db
        .blocking(move |db| db.insert_direct_message(&username, &other, &req.content))
        .await?;

    state.hub.publish(&message);

    let reference = NotificationRef::new(message.recipient_id, message.sender_id, NotificationKind::DirectMessage);
    if let Err(e) = state.notifications.create(reference, "sent you a message").await {
        warn!(message_id = message.id, "Failed to record message notification: {}", e);
    }

    Ok((
        StatusCode::CREATED,
        Json(DirectMessageCreated {
            message: "Direct message sent".into(),
            direct_message: message,
        }),
    ))
}

pub async fn get_direct_messages(
    State(state): State<AppState>,
    Path((username, other)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<DirectMessage>>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let (start, count) = (page.start(), page.count(DEFAULT_PAGE, MAX_PAGE));
    let messages = state
        .db
        .blocking(move |db| db.get_direct_messages(&username, &other, start, count))
        .await?;

    Ok(Json(messages))
}

pub async fn get_chat_peers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<PeersResponse>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let peers = state.db.blocking(move |db| db.get_chat_peers(&username)).await?;
    Ok(Json(PeersResponse { peers }))
}
