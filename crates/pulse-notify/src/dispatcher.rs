use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use pulse_db::Database;
use pulse_types::models::{Notification, PushToken};

use crate::Result;
use crate::expo::{DEFAULT_PUSH_URL, DeliveryOutcome, ExpoClient, PushData, PushMessage};

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    /// Per-request timeout. Requests are never retried.
    pub timeout: Duration,
    /// Upper bound on concurrent requests for one dispatch.
    pub max_workers: usize,
    pub title: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUSH_URL.to_string(),
            timeout: Duration::from_secs(4),
            max_workers: 6,
            title: "Pulse".to_string(),
        }
    }
}

/// What happened to each token of one dispatch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Tokens deleted because the provider no longer recognises them.
    pub removed: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Sends a notification to every device a user has registered.
#[derive(Clone)]
pub struct PushDispatcher {
    db: Arc<Database>,
    client: ExpoClient,
    max_workers: usize,
    title: Arc<str>,
}

impl PushDispatcher {
    pub fn new(db: Arc<Database>, config: PushConfig) -> Result<Self> {
        Ok(Self {
            client: ExpoClient::new(config.endpoint, config.timeout)?,
            db,
            max_workers: config.max_workers.max(1),
            title: config.title.into(),
        })
    }

    /// Push `notification` to all of `user_id`'s tokens and wait for every
    /// request to finish. A user without tokens costs one query and no
    /// network traffic.
    pub async fn dispatch(&self, user_id: i64, notification: &Notification, body: &str) -> Result<DispatchReport> {
        let tokens = self.db.blocking(move |db| db.get_push_tokens(user_id)).await?;
        if tokens.is_empty() {
            return Ok(DispatchReport::default());
        }

        let template = Arc::new(PushMessage {
            to: String::new(),
            title: self.title.to_string(),
            body: body.to_string(),
            data: PushData::from(notification),
        });

        let workers = self.max_workers.min(tokens.len());
        let queue: Arc<Mutex<VecDeque<PushToken>>> = Arc::new(Mutex::new(tokens.into()));

        let mut set = JoinSet::new();
        for _ in 0..workers {
            set.spawn(run_worker(
                Arc::clone(&queue),
                Arc::clone(&template),
                self.client.clone(),
                Arc::clone(&self.db),
            ));
        }

        let mut report = DispatchReport::default();
        while let Some(result) = set.join_next().await {
            match result {
                Ok(part) => report.merge(part),
                Err(e) => error!("Push worker failed: {}", e),
            }
        }

        Ok(report)
    }

    /// Detached dispatch: the caller never waits and errors are only logged.
    /// The handle is returned for tests; production callers drop it.
    pub fn spawn_dispatch(&self, user_id: i64, notification: Notification, body: String) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            match dispatcher.dispatch(user_id, &notification, &body).await {
                Ok(report) if report.attempted > 0 => {
                    debug!(
                        user_id,
                        notification_id = notification.id,
                        attempted = report.attempted,
                        delivered = report.delivered,
                        removed = report.removed,
                        failed = report.failed,
                        "Push dispatch finished"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(user_id, "Push dispatch failed: {}", e),
            }
        })
    }
}

async fn run_worker(
    queue: Arc<Mutex<VecDeque<PushToken>>>,
    template: Arc<PushMessage>,
    client: ExpoClient,
    db: Arc<Database>,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    loop {
        // Lock is released before any await.
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let Some(token) = next else {
            break;
        };
        if token.token.is_empty() {
            continue;
        }

        report.attempted += 1;
        let message = PushMessage {
            to: token.token.clone(),
            ..(*template).clone()
        };

        match client.send(&message).await {
            DeliveryOutcome::Delivered => report.delivered += 1,
            DeliveryOutcome::Failed => report.failed += 1,
            DeliveryOutcome::Unregistered => {
                let stale = token.token;
                match db.blocking(move |db| db.delete_push_token(&stale)).await {
                    Ok(true) => {
                        info!(user_id = token.user_id, "Removed unregistered push token");
                        report.removed += 1;
                    }
                    // Another dispatch got there first.
                    Ok(false) => {
                        debug!(user_id = token.user_id, "Unregistered push token already removed");
                    }
                    Err(e) => {
                        warn!(user_id = token.user_id, "Failed to remove unregistered push token: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }
    }

    report
}
