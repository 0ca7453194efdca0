use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a notification is about. Stored as its snake_case tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DirectMessage,
    FollowUser,
    LikePost,
    SavePost,
    CommentPost,
    LikeProject,
    SaveProject,
    CommentProject,
    LikeComment,
    CommentComment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage => "direct_message",
            Self::FollowUser => "follow_user",
            Self::LikePost => "like_post",
            Self::SavePost => "save_post",
            Self::CommentPost => "comment_post",
            Self::LikeProject => "like_project",
            Self::SaveProject => "save_project",
            Self::CommentProject => "comment_project",
            Self::LikeComment => "like_comment",
            Self::CommentComment => "comment_comment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notification kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "direct_message" => Self::DirectMessage,
            "follow_user" => Self::FollowUser,
            "like_post" => Self::LikePost,
            "save_post" => Self::SavePost,
            "comment_post" => Self::CommentPost,
            "like_project" => Self::LikeProject,
            "save_project" => Self::SaveProject,
            "comment_project" => Self::CommentProject,
            "like_comment" => Self::LikeComment,
            "comment_comment" => Self::CommentComment,
            other => return Err(UnknownKind(other.to_string())),
        })
    }
}

/// Identifies a notification by who, to whom, what and about which item.
///
/// Used both to create a notification and to find the one an action created
/// when that action is reversed. `None` references match only `NULL` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRef {
    pub recipient_id: i64,
    pub actor_id: i64,
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub project_id: Option<i64>,
    pub comment_id: Option<i64>,
}

impl NotificationRef {
    pub fn new(recipient_id: i64, actor_id: i64, kind: NotificationKind) -> Self {
        Self {
            recipient_id,
            actor_id,
            kind,
            post_id: None,
            project_id: None,
            comment_id: None,
        }
    }

    pub fn with_post(mut self, post_id: i64) -> Self {
        self.post_id = Some(post_id);
        self
    }

    /// Self-actions never notify.
    pub fn is_self_action(&self) -> bool {
        self.recipient_id == self.actor_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: i64,
    pub actor_name: String,
    pub actor_picture: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub project_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A device registration with the push provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
}
