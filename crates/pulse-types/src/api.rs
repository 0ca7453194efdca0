use serde::{Deserialize, Serialize};

use crate::events::DirectMessage;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the stream upgrade endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendDirectMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectMessageCreated {
    pub message: String,
    pub direct_message: DirectMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

/// Offset pagination shared by list endpoints. Invalid values fall back to
/// the endpoint's defaults rather than failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub start: Option<String>,
    pub count: Option<String>,
}

impl PageQuery {
    pub fn start(&self) -> u32 {
        self.start
            .as_deref()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    }

    pub fn count(&self, default: u32, max: u32) -> u32 {
        self.count
            .as_deref()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .map(|v| v.min(max))
            .unwrap_or(default)
    }
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct RegisterPushTokenRequest {
    pub token: String,
    pub platform: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: i64,
}

// -- Social --

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostCreated {
    pub id: i64,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
