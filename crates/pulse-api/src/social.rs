//! Actions that notify another user, and their reversals.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use pulse_types::api::{Claims, CreatePostRequest, MessageResponse, PostCreated};
use pulse_types::models::{NotificationKind, NotificationRef};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::ensure_same_user;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let id = state
        .db
        .blocking(move |db| db.create_post(user_id, &req.content))
        .await?;
    Ok((StatusCode::CREATED, Json(PostCreated { id })))
}

pub async fn like_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let user_id = claims.sub;
    let owner = state
        .db
        .blocking(move |db| db.like_post(user_id, post_id))
        .await?;

    notify(
        &state,
        NotificationRef::new(owner, user_id, NotificationKind::LikePost).with_post(post_id),
        "liked your post",
    )
    .await;

    Ok(Json(MessageResponse::new("Post liked")))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let user_id = claims.sub;
    let owner = state
        .db
        .blocking(move |db| db.unlike_post(user_id, post_id))
        .await?;

    retract(
        &state,
        NotificationRef::new(owner, user_id, NotificationKind::LikePost).with_post(post_id),
    )
    .await;

    Ok(Json(MessageResponse::new("Post unliked")))
}

pub async fn follow_user(
    State(state): State<AppState>,
    Path((username, other)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let user_id = claims.sub;
    let followed = state
        .db
        .blocking(move |db| db.follow_user(user_id, &other))
        .await?;

    notify(
        &state,
        NotificationRef::new(followed, user_id, NotificationKind::FollowUser),
        "followed you",
    )
    .await;

    Ok(Json(MessageResponse::new("Followed user")))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Path((username, other)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_same_user(&claims, &username)?;

    let user_id = claims.sub;
    let unfollowed = state
        .db
        .blocking(move |db| db.unfollow_user(user_id, &other))
        .await?;

    retract(
        &state,
        NotificationRef::new(unfollowed, user_id, NotificationKind::FollowUser),
    )
    .await;

    Ok(Json(MessageResponse::new("Unfollowed user")))
}

// The action itself already succeeded, so notification failures are logged
// and never change the response.

async fn notify(state: &AppState, reference: NotificationRef, text: &str) {
    let kind = reference.kind;
    if let Err(e) = state.notifications.create(reference, text).await {
        warn!(%kind, "Failed to create notification: {}", e);
    }
}

async fn retract(state: &AppState, reference: NotificationRef) {
    let kind = reference.kind;
    if let Err(e) = state.notifications.delete_by_reference(reference).await {
        warn!(%kind, "Failed to remove notification: {}", e);
    }
}
