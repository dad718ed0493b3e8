use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::FromRef,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::services::JwtKeys,
    memory::{MemoryBucket, MemoryStore},
    state::AppState,
};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub bucket: Arc<MemoryBucket>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let bucket = Arc::new(MemoryBucket::default());
        let state = AppState::fake_with(store.clone(), bucket.clone());
        Self {
            router: build_app(state.clone()),
            state,
            store,
            bucket,
        }
    }

    /// Access token for an arbitrary identity, registered or not.
    pub fn token_for(&self, user_id: Uuid, email: &str) -> String {
        JwtKeys::from_ref(&self.state)
            .sign_access(user_id, Some(email))
            .unwrap()
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    app.call(req).await
}

/// Sends `body` verbatim as `application/json`, well-formed or not.
pub async fn send_raw(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    app.call(req.body(Body::from(body.to_string())).unwrap()).await
}

pub struct Part {
    name: &'static str,
    file: Option<(&'static str, &'static str)>, // (filename, content type)
    data: Vec<u8>,
}

impl Part {
    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes().to_vec(),
        }
    }

    pub fn file(
        name: &'static str,
        filename: &'static str,
        content_type: &'static str,
        data: &[u8],
    ) -> Self {
        Self {
            name,
            file: Some((filename, content_type)),
            data: data.to_vec(),
        }
    }
}

pub async fn send_multipart(
    app: &TestApp,
    uri: &str,
    token: Option<&str>,
    parts: &[Part],
) -> (StatusCode, Value) {
    const BOUNDARY: &str = "skillpath-test-boundary";
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file {
            Some((filename, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    part.name, filename, content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    app.call(req.body(Body::from(body)).unwrap()).await
}

/// Registers with password `p`.
pub async fn register(app: &TestApp, email: &str, phone: &str) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/create/account",
        None,
        Some(json!({
            "email": email,
            "phone_number": phone,
            "password": "p",
            "first_name": "A",
            "last_name": "B",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

pub async fn register_and_login(app: &TestApp, email: &str, phone: &str) -> String {
    register(app, email, phone).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({ "email": email, "password": "p" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access"].as_str().unwrap().to_string()
}
