//! In-process HTTP client for router tests.
//!
//! Requests go straight through the axum router with `oneshot`, no socket.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

use server_core::server::{build_app, AppState};

/// Response with the body already collected.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl TestResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("response is not the expected JSON ({}): {}", e, self.body))
    }

    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }
}

#[derive(Clone)]
pub struct ApiClient {
    app: Router,
    user_id: Option<String>,
    roles: Vec<String>,
}

impl ApiClient {
    pub fn new(state: AppState) -> Self {
        Self {
            app: build_app(state),
            user_id: None,
            roles: Vec::new(),
        }
    }

    /// Same router, sending `x-user-id`.
    pub fn as_user(&self, user_id: &str) -> Self {
        Self {
            app: self.app.clone(),
            user_id: Some(user_id.to_string()),
            roles: Vec::new(),
        }
    }

    pub fn as_super_admin(&self, user_id: &str) -> Self {
        Self {
            app: self.app.clone(),
            user_id: Some(user_id.to_string()),
            roles: vec!["super_admin".to_string()],
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = &self.user_id {
            builder = builder.header("x-user-id", user_id);
        }
        if !self.roles.is_empty() {
            builder = builder.header("x-user-roles", self.roles.join(","));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        self.request(Method::POST, uri, None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }
}
