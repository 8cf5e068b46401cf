//! Router test harness: the full app over `MemoryStorage` plus a signed-in
//! admin session.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::session;
use crate::config::AppConfig;
use crate::db::models::SessionIdentity;
use crate::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    admin_cookie: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let state = AppState::in_memory(config);
        let token = session::start_session(
            state.storage.as_ref(),
            SessionIdentity::Admin {
                id: 1,
                username: "owner".into(),
                email: None,
            },
            Duration::hours(1),
        )
        .await
        .unwrap();

        Self {
            app: crate::create_app(state.clone()),
            state,
            admin_cookie: format!("{}={token}", session::SESSION_COOKIE),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Anonymous request.
    pub async fn public(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, body, None).await
    }

    /// Request carrying the admin session cookie.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let cookie = self.admin_cookie.clone();
        self.send(method, uri, body, Some(&cookie)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.public(Method::GET, uri, None).await
    }
}
