use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::info;

use pulse_notify::is_valid_push_token;
use pulse_types::api::{Claims, MessageResponse, PageQuery, RegisterPushTokenRequest, UnreadCount};
use pulse_types::models::Notification;

use crate::auth::AppState;
use crate::error::ApiError;

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 200;

pub async fn get_notifications(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let (start, count) = (page.start(), page.count(DEFAULT_PAGE, MAX_PAGE));
    let notifications = state
        .db
        .blocking(move |db| db.get_notifications(claims.sub, start, count))
        .await?;
    Ok(Json(notifications))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UnreadCount>, ApiError> {
    let count = state
        .db
        .blocking(move |db| db.unread_notification_count(claims.sub))
        .await?;
    Ok(Json(UnreadCount { count }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .db
        .blocking(move |db| db.mark_notification_read(claims.sub, id))
        .await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .db
        .blocking(move |db| db.delete_notification(claims.sub, id))
        .await?;
    Ok(Json(MessageResponse::new("Notification deleted")))
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .db
        .blocking(move |db| db.clear_notifications(claims.sub))
        .await?;
    Ok(Json(MessageResponse::new(format!("Cleared {removed} notifications"))))
}

/// Register a device. The token format is checked here; tokens the provider
/// later reports as unregistered are removed by the push dispatcher.
pub async fn register_push_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RegisterPushTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = req.token.trim().to_string();
    let platform = req.platform.trim().to_lowercase();
    if token.is_empty() || platform.is_empty() {
        return Err(ApiError::bad_request("token and platform are required"));
    }
    if !is_valid_push_token(&token) {
        return Err(ApiError::bad_request("invalid push token"));
    }

    let user_id = claims.sub;
    state
        .db
        .blocking(move |db| db.upsert_push_token(user_id, &token, &platform))
        .await?;
    info!(user_id, "Registered push token");

    Ok(Json(MessageResponse::new("Push token registered")))
}
