pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod social;
pub mod stream;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};

use pulse_types::api::MessageResponse;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// Every HTTP route. CORS and tracing layers are left to the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Authenticates itself: browsers cannot set headers on a websocket
        // handshake, so the token may also arrive as a query parameter.
        .route("/messages/{username}/stream", get(stream::stream_direct_messages));

    let protected_routes = Router::new()
        .route(
            "/messages/{username}/with/{other}",
            get(messages::get_direct_messages).post(messages::send_direct_message),
        )
        .route("/messages/{username}/peers", get(messages::get_chat_peers))
        .route(
            "/notifications",
            get(notifications::get_notifications).delete(notifications::clear_notifications),
        )
        .route("/notifications/unread-count", get(notifications::get_unread_count))
        .route("/notifications/push-token", post(notifications::register_push_token))
        .route("/notifications/{id}", delete(notifications::delete_notification))
        .route("/notifications/{id}/read", post(notifications::mark_notification_read))
        .route("/posts", post(social::create_post))
        .route("/posts/{username}/likes/{post_id}", post(social::like_post))
        .route("/posts/{username}/unlikes/{post_id}", post(social::unlike_post))
        .route("/users/{username}/follow/{other}", post(social::follow_user))
        .route("/users/{username}/unfollow/{other}", post(social::unfollow_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}
