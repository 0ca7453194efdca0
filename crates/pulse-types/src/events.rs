use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted direct message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub sender_name: String,
    pub recipient_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Events pushed to live stream connections, one per text frame.
///
/// Serialized as `{"type": "<variant>", "<variant>": {...}}` so clients can
/// switch on `type` and ignore variants they do not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    DirectMessage { direct_message: DirectMessage },
}

impl StreamEvent {
    pub fn direct_message(message: DirectMessage) -> Self {
        Self::DirectMessage {
            direct_message: message,
        }
    }

    /// The wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectMessage { .. } => "direct_message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn direct_message_event_wire_shape() {
        let event = StreamEvent::direct_message(DirectMessage {
            id: 7,
            sender_id: 1,
            recipient_id: 2,
            sender_name: "bob".into(),
            recipient_name: "alice".into(),
            content: "hi".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "direct_message");
        assert_eq!(json["direct_message"]["id"], 7);
        assert_eq!(json["direct_message"]["recipient_name"], "alice");
        assert_eq!(json["direct_message"]["content"], "hi");
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(event.kind(), "direct_message");
    }
}
