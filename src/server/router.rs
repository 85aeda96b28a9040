use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::auth::auth_router;
use super::org::org_router;
use super::public::public_router;
use super::user::user_router;
use crate::integrations::Integrations;
use crate::inventory::LowStockMonitor;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub data_dir: PathBuf,
    /// Public base URL for external access. Used for links sent to clients.
    pub public_base_url: Option<String>,
    pub integrations: Integrations,
    pub stock_monitor: Arc<LowStockMonitor>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        data_dir: PathBuf,
        public_base_url: Option<String>,
        integrations: Integrations,
        stock_monitor: Arc<LowStockMonitor>,
    ) -> Self {
        Self {
            store,
            data_dir,
            public_base_url,
            integrations,
            stock_monitor,
        }
    }

    /// Link to the public view of a document, absolute when a base URL is set.
    #[must_use]
    pub fn public_link(&self, kind: &str, id: &str) -> String {
        let base = self
            .public_base_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/');
        format!("{base}/public/{kind}/{id}")
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1/org", org_router())
        .nest("/api/v1", user_router())
        .nest("/public", public_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
