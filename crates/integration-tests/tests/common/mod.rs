//! Shared harness: the full router over in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use api_adapters::AppState;
use auth_adapters::{Argon2IdentityProvider, JwtSessionIssuer};
use axum::body::{Body, BodyDataStream};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{AuthService, ComplaintService};
use storage_adapters::{
    LocalMediaStorage, MemoryComplaintRepository, MemoryCredentialStore, MemoryUserRepository,
};
use tokio::sync::watch;
use tower::ServiceExt;

pub const MAINTENANCE_KEY: &str = "boiler-room-42";
pub const PASSWORD: &str = "hunter22";

pub struct TestApp {
    pub router: Router,
    pub complaints: Arc<ComplaintService>,
    pub repo: Arc<MemoryComplaintRepository>,
}

pub fn app() -> TestApp {
    build(None)
}

/// Like [`app`], plus the sender that tells open event streams to close.
pub fn app_with_shutdown() -> (TestApp, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    (build(Some(rx)), tx)
}

fn build(shutdown: Option<watch::Receiver<bool>>) -> TestApp {
    let repo = Arc::new(MemoryComplaintRepository::new());
    let media_root = std::env::temp_dir().join(format!("campus-fix-it-{}", uuid::Uuid::new_v4()));
    let media = Arc::new(LocalMediaStorage::new(media_root, "/media"));
    let complaints = Arc::new(ComplaintService::new(repo.clone(), media));

    let identity = Arc::new(Argon2IdentityProvider::new(Arc::new(MemoryCredentialStore::new())));
    let sessions = Arc::new(JwtSessionIssuer::new(
        &SecretString::from("integration-signing-secret".to_string()),
        chrono::Duration::minutes(30),
    ));
    let auth = Arc::new(AuthService::new(
        identity,
        Arc::new(MemoryUserRepository::new()),
        sessions,
        SecretString::from(MAINTENANCE_KEY.to_string()),
    ));

    let mut state = AppState::new(complaints.clone(), auth);
    if let Some(shutdown) = shutdown {
        state = state.with_shutdown(shutdown);
    }
    let router = api_adapters::router(state);
    TestApp { router, complaints, repo }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    pub async fn signup(&self, email: &str, role: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({ "email": email, "password": PASSWORD, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        body
    }

    pub async fn login(&self, email: &str, key: Option<&str>) -> (StatusCode, Value) {
        let mut body = json!({ "email": email, "password": PASSWORD });
        if let Some(key) = key {
            body["maintenance_key"] = json!(key);
        }
        self.send(Method::POST, "/api/auth/login", None, Some(body)).await
    }

    /// Signs up and logs in, returning the bearer token.
    pub async fn session(&self, email: &str, role: &str) -> String {
        self.signup(email, role).await;
        let key = (role == "maintenance").then_some(MAINTENANCE_KEY);
        let (status, body) = self.login(email, key).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn submit(&self, token: &str, draft: Value) -> Value {
        let (status, body) = self.send(Method::POST, "/api/complaints", Some(token), Some(draft)).await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        body
    }

    /// Opens an event stream and checks the response headers.
    pub async fn open_stream(&self, uri: &str, token: &str) -> BodyDataStream {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
        response.into_body().into_data_stream()
    }
}

/// The next SSE frame as text, or `None` once the stream has ended.
pub async fn next_frame(stream: &mut BodyDataStream) -> Option<String> {
    let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("stream activity in time")?;
    Some(String::from_utf8_lossy(&chunk.unwrap()).into_owned())
}

/// The JSON payload of an SSE frame's `data:` lines.
pub fn frame_data(frame: &str) -> Value {
    let data: String = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    serde_json::from_str(&data).unwrap()
}
