//! In-process test harness: a temp database, an admin token and the full
//! router driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use oohdesk::auth::TokenGenerator;
use oohdesk::config::IntegrationsConfig;
use oohdesk::integrations::Integrations;
use oohdesk::inventory::LowStockMonitor;
use oohdesk::server::{AppState, create_router};
use oohdesk::store::{SqliteStore, Store};
use oohdesk::types::Token;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const LOW_STOCK_THRESHOLD: i64 = 3;

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub router: Router,
    pub admin_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_integrations(&IntegrationsConfig::default())
    }

    pub fn with_integrations(config: &IntegrationsConfig) -> Self {
        Self::from_integrations(Integrations::from_config(config).expect("build integrations"))
    }

    pub fn from_integrations(integrations: Integrations) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("oohdesk.db")).expect("open store");
        store.initialize().expect("initialize store");

        let generator = TokenGenerator::new();
        let (admin_token, lookup, hash) = generator.generate().expect("generate token");
        store
            .create_token(&Token {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                is_admin: true,
                user_id: None,
                created_at: Utc::now(),
                expires_at: None,
                last_used_at: None,
            })
            .expect("store admin token");

        let state = Arc::new(AppState::new(
            Arc::new(store),
            temp_dir.path().to_path_buf(),
            Some("https://ops.example.com".to_string()),
            integrations,
            Arc::new(LowStockMonitor::new(LOW_STOCK_THRESHOLD)),
        ));
        let router = create_router(Arc::clone(&state));

        Self {
            temp_dir,
            state,
            router,
            admin_token,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, value)
    }

    /// Sends a GET and hands back the response unread, for streaming bodies.
    pub async fn open_stream(&self, uri: &str, token: &str) -> Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route request")
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("DELETE", uri, Some(token), None).await
    }

    /// Creates a company on `plan` and returns its id.
    pub async fn create_company(&self, name: &str, plan: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/admin/companies",
                &self.admin_token,
                json!({"name": name, "plan": plan}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create company: {body}");
        body["data"]["id"].as_str().expect("company id").to_string()
    }

    /// Creates a user with `roles` and returns `(user_id, token)`.
    pub async fn create_user(&self, company_id: &str, email: &str, roles: &[&str]) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/v1/admin/users",
                &self.admin_token,
                json!({
                    "company_id": company_id,
                    "email": email,
                    "display_name": email.split('@').next().unwrap_or(email),
                    "password": "correct-horse",
                    "roles": roles,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {body}");
        (
            body["data"]["user"]["id"].as_str().expect("user id").to_string(),
            body["data"]["token"].as_str().expect("user token").to_string(),
        )
    }

    /// A company with one admin user; returns `(company_id, admin_user_token)`.
    pub async fn company_with_admin(&self, name: &str) -> (String, String) {
        let company_id = self.create_company(name, "premium").await;
        let email = format!("admin@{}.example.com", name.to_ascii_lowercase().replace(' ', "-"));
        let (_, token) = self.create_user(&company_id, &email, &["admin"]).await;
        (company_id, token)
    }

    /// Creates a document through the user API and returns its id.
    pub async fn create_doc(&self, path: &str, token: &str, body: Value) -> String {
        let (status, resp) = self.post(&format!("/api/v1{path}"), token, body).await;
        assert_eq!(status, StatusCode::CREATED, "create {path}: {resp}");
        resp["data"]["id"].as_str().expect("document id").to_string()
    }
}

pub fn digital_site(name: &str) -> Value {
    json!({
        "name": name,
        "site_code": name.to_ascii_uppercase(),
        "content_type": "digital",
        "location": "EDSA Guadalupe",
        "price_per_month": 150000.0,
        "cms": {
            "start_time": "06:00:00",
            "end_time": "07:00:00",
            "spot_duration_secs": 15,
            "spots_per_loop": 4
        }
    })
}

pub fn static_site(name: &str) -> Value {
    json!({
        "name": name,
        "content_type": "static",
        "price_per_month": 80000.0
    })
}
