use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pulse_types::models::{Notification, NotificationKind};

use crate::Result;

pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

const TOKEN_PREFIXES: [&str; 2] = ["ExponentPushToken[", "ExpoPushToken["];

/// Registration-time format check. Tokens the provider later reports as dead
/// are handled by the dispatcher, not here.
pub fn is_valid_push_token(token: &str) -> bool {
    TOKEN_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}

/// Metadata the mobile client uses to route a tapped notification.
#[derive(Debug, Clone, Serialize)]
pub struct PushData {
    pub actor_id: i64,
    pub actor_name: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub project_id: Option<i64>,
    pub comment_id: Option<i64>,
}

impl From<&Notification> for PushData {
    fn from(n: &Notification) -> Self {
        Self {
            actor_id: n.actor_id,
            actor_name: n.actor_name.clone(),
            kind: n.kind,
            post_id: n.post_id,
            project_id: n.project_id,
            comment_id: n.comment_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: PushData,
}

#[derive(Debug, Default, Deserialize)]
struct TicketResponse {
    #[serde(default)]
    data: Option<Ticket>,
}

#[derive(Debug, Default, Deserialize)]
struct Ticket {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<TicketDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct TicketDetails {
    #[serde(default)]
    error: Option<String>,
}

/// What a push ticket in a provider response says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    /// No error ticket, or a body we could not read.
    Accepted,
    /// The device will never accept pushes again.
    Unregistered,
    /// Any other error ticket, with the provider's code or message.
    Rejected(String),
}

/// Classify a provider response body. Anything unparseable counts as
/// accepted; the HTTP status decides the rest.
pub fn ticket_status(body: &[u8]) -> TicketStatus {
    let Some(ticket) = serde_json::from_slice::<TicketResponse>(body)
        .ok()
        .and_then(|r| r.data)
    else {
        return TicketStatus::Accepted;
    };
    if ticket.status.as_deref() != Some("error") {
        return TicketStatus::Accepted;
    }

    let code = ticket
        .details
        .and_then(|d| d.error)
        .unwrap_or_default();
    let message = ticket.message.unwrap_or_default();

    if code.trim().eq_ignore_ascii_case("DeviceNotRegistered")
        || message
            .to_lowercase()
            .contains("not a registered push notification recipient")
    {
        return TicketStatus::Unregistered;
    }

    let reason = if code.trim().is_empty() { message } else { code };
    TicketStatus::Rejected(reason.trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The provider rejected the token permanently.
    Unregistered,
    /// Timeout, transport error or any other rejection. Never retried.
    Failed,
}

/// Thin client for the push provider's send endpoint.
#[derive(Clone)]
pub struct ExpoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ExpoClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub async fn send(&self, message: &PushMessage) -> DeliveryOutcome {
        let response = match self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Push delivery failed: {}", e);
                return DeliveryOutcome::Failed;
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!("Push provider rejected token with status {}", status);
        }

        // Unregistered devices can come back with either a 200 or an error
        // status, so the body is checked regardless.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read push provider response: {}", e);
                return DeliveryOutcome::Failed;
            }
        };

        match ticket_status(&body) {
            TicketStatus::Unregistered => DeliveryOutcome::Unregistered,
            TicketStatus::Rejected(reason) => {
                warn!("Push provider returned an error ticket: {}", reason);
                DeliveryOutcome::Failed
            }
            TicketStatus::Accepted if status.is_success() => DeliveryOutcome::Delivered,
            TicketStatus::Accepted => DeliveryOutcome::Failed,
        }
    }
}
