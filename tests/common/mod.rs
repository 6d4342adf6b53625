#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use portal::config;
use portal::csrf::{ManualClock, TokenGuard};
use portal::middleware::session::SessionClaims;
use portal::AppState;

pub const T0: i64 = 1_700_000_000_000;

pub const BASE_ENV: [(&str, &str); 2] = [
    ("CSRF_SECRET", "integration-csrf-secret-0123456789abcdef"),
    ("PORTAL_SESSION_SECRET", "integration-session-secret-0123456789ab"),
];

pub fn config_with(extra: &[(&str, &str)]) -> config::Config {
    let map: HashMap<String, String> = BASE_ENV
        .iter()
        .chain(extra.iter())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    config::from_lookup(|key| map.get(key).cloned()).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new(extra: &[(&str, &str)]) -> Self {
        let cfg = config_with(extra);
        let clock = Arc::new(ManualClock::new(T0));
        let guard = TokenGuard::with_clock(
            cfg.csrf_secret.as_bytes(),
            cfg.csrf_token_ttl,
            clock.clone(),
        )
        .unwrap();
        let state = Arc::new(AppState::with_guard(cfg, guard).unwrap());
        Self {
            router: portal::api::app(state.clone()),
            state,
            clock,
        }
    }

    pub fn session(&self, sub: &str, roles: &[&str], permissions: &[&str]) -> String {
        let mut claims = SessionClaims::new(sub, 600);
        claims.roles = roles.iter().map(|s| s.to_string()).collect();
        claims.permissions = permissions.iter().map(|s| s.to_string()).collect();
        self.state.sessions.mint(&claims).unwrap()
    }

    pub async fn get(&self, uri: &str, jwt: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(jwt) = jwt {
            req = req.header("authorization", format!("Bearer {}", jwt));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, jwt: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(jwt) = jwt {
            req = req.header("authorization", format!("Bearer {}", jwt));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn issue_token(&self, jwt: &str) -> String {
        let (status, body) = self.get("/api/csrf-token", Some(jwt)).await;
        assert_eq!(status, StatusCode::OK);
        body["csrfToken"].as_str().unwrap().to_string()
    }
}

pub fn contact_body(token: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "message": "Hello from the contact form",
    });
    if let Some(token) = token {
        body["csrfToken"] = Value::String(token.to_string());
    }
    body
}
