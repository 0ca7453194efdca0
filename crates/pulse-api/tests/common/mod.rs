//! Spins up the full router on a loopback port, backed by an in-memory
//! database and a stub push provider that records what it receives.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::post};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use pulse_api::{AppState, AppStateInner};
use pulse_db::Database;
use pulse_gateway::{Hub, SessionConfig};
use pulse_notify::{NotificationService, PushConfig, PushDispatcher};
use pulse_types::api::AuthResponse;

pub const PASSWORD: &str = "correct-horse";

#[derive(Clone, Default)]
pub struct PushStub {
    requests: Arc<Mutex<Vec<Value>>>,
}

impl PushStub {
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Waits until at least `n` requests have arrived.
    pub async fn wait_for(&self, n: usize) -> Vec<Value> {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let seen = self.requests();
                if seen.len() >= n {
                    return seen;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("push stub never received the expected requests")
    }
}

async fn record_push(State(stub): State<PushStub>, Json(body): Json<Value>) -> Json<Value> {
    stub.requests.lock().unwrap().push(body);
    Json(json!({"data": {"status": "ok", "id": "ticket"}}))
}

pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub push: PushStub,
    pub http: reqwest::Client,
}

pub async fn spawn() -> TestServer {
    let push = PushStub::default();
    let push_app = Router::new()
        .route("/push", post(record_push))
        .with_state(push.clone());
    let push_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let push_url = format!("http://{}/push", push_listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(push_listener, push_app).await.unwrap();
    });

    let db = Arc::new(Database::open_in_memory().unwrap());
    let dispatcher = PushDispatcher::new(
        Arc::clone(&db),
        PushConfig {
            endpoint: push_url,
            timeout: Duration::from_secs(2),
            ..PushConfig::default()
        },
    )
    .unwrap();

    let state: AppState = Arc::new(AppStateInner {
        db: Arc::clone(&db),
        jwt_secret: "integration-test-secret".into(),
        hub: Hub::new(),
        notifications: NotificationService::new(db, dispatcher),
        session: SessionConfig::default(),
        shutdown: CancellationToken::new(),
    });

    let app = pulse_api::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        state,
        push,
        http: reqwest::Client::new(),
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str) -> AuthResponse {
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({"username": username, "password": PASSWORD}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "register {username}");
        resp.json().await.unwrap()
    }

    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn wait_for_subscribers(&self, username: &str, n: usize) {
        tokio::time::timeout(Duration::from_secs(3), async {
            while self.state.hub.subscriber_count(username) != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber count never reached target");
    }
}
