use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::hub::{Hub, Subscription};

/// Timing for a live stream connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Peer is considered dead if no pong arrives within this window.
    pub read_deadline: Duration,
    /// Upper bound on writing a single frame.
    pub write_deadline: Duration,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_deadline: Duration::from_secs(30),
            write_deadline: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(20),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame received or the stream ended.
    PeerClosed,
    /// Nothing heard from the peer within the read deadline.
    ReadTimeout,
    ReadError,
    WriteFailed,
    WriteTimeout,
    /// The hub closed our channel.
    Unsubscribed,
    /// Server shutdown or request cancellation.
    Cancelled,
    /// One of the loops panicked.
    Aborted,
}

/// One authenticated websocket bridged to the hub.
///
/// `run` subscribes, drives an inbound loop (liveness only) and an outbound
/// loop (events, heartbeats, cancellation) until either finishes. The
/// subscription lives inside the outbound loop, so it is released on every
/// exit path, panics included.
pub struct Session {
    hub: Hub,
    username: String,
    config: SessionConfig,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(hub: Hub, username: impl Into<String>, config: SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            hub,
            username: username.into(),
            config,
            cancel,
        }
    }

    pub async fn run(self, socket: WebSocket) -> SessionEnd {
        let subscription = self.hub.subscribe(&self.username);
        let conn_id = subscription.id();
        info!(user = %self.username, %conn_id, "Stream session active");

        let (sender, receiver) = socket.split();

        let mut send_task = tokio::spawn(write_loop(
            sender,
            subscription,
            self.config.clone(),
            self.cancel.clone(),
        ));
        let mut recv_task = tokio::spawn(read_loop(receiver, self.config.read_deadline));

        // Whichever side finishes first tears down the other. Awaiting the
        // aborted task makes sure its half of the socket (and, for the writer,
        // the subscription) is dropped before we report the session closed.
        let end = tokio::select! {
            result = &mut send_task => {
                recv_task.abort();
                let _ = recv_task.await;
                joined(result)
            }
            result = &mut recv_task => {
                send_task.abort();
                let _ = send_task.await;
                joined(result)
            }
        };

        info!(user = %self.username, %conn_id, reason = ?end, "Stream session closed");
        end
    }
}

fn joined(result: Result<SessionEnd, tokio::task::JoinError>) -> SessionEnd {
    result.unwrap_or_else(|e| {
        if e.is_panic() {
            error!("Stream session task panicked: {}", e);
        }
        SessionEnd::Aborted
    })
}

/// Reads only to notice the peer going away. Inbound payloads are ignored;
/// each pong pushes the deadline out again.
async fn read_loop(mut receiver: SplitStream<WebSocket>, read_deadline: Duration) -> SessionEnd {
    let mut deadline = Instant::now() + read_deadline;

    loop {
        match tokio::time::timeout_at(deadline, receiver.next()).await {
            Err(_) => return SessionEnd::ReadTimeout,
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return SessionEnd::PeerClosed,
            Ok(Some(Err(e))) => {
                debug!("Stream read error: {}", e);
                return SessionEnd::ReadError;
            }
            Ok(Some(Ok(Message::Pong(_)))) => {
                deadline = Instant::now() + read_deadline;
            }
            Ok(Some(Ok(_))) => {}
        }
    }
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut subscription: Subscription,
    config: SessionConfig,
    cancel: CancellationToken,
) -> SessionEnd {
    let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    let end = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break SessionEnd::Cancelled,

            event = subscription.recv() => {
                let Some(event) = event else {
                    break SessionEnd::Unsubscribed;
                };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to serialize {} event: {}", event.kind(), e);
                        continue;
                    }
                };
                if let Err(end) = send_frame(&mut sender, Message::Text(payload.into()), config.write_deadline).await {
                    break end;
                }
            }

            _ = heartbeat.tick() => {
                if let Err(end) = send_frame(&mut sender, Message::Ping(Bytes::new()), config.write_deadline).await {
                    break end;
                }
            }
        }
    };

    if !matches!(end, SessionEnd::WriteFailed | SessionEnd::WriteTimeout) {
        let _ = send_frame(&mut sender, Message::Close(None), config.write_deadline).await;
    }

    end
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    message: Message,
    write_deadline: Duration,
) -> Result<(), SessionEnd> {
    match tokio::time::timeout(write_deadline, sender.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!("Stream write failed: {}", e);
            Err(SessionEnd::WriteFailed)
        }
        Err(_) => Err(SessionEnd::WriteTimeout),
    }
}
