//! Thin admin surface: health, metrics and manual triggers for the
//! background flows.

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::engine::SyncEngine;
use crate::security::verify_api_key;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>, admin_api_key: Option<String>) -> Self {
        Self {
            engine,
            admin_api_key: admin_api_key.map(Arc::from),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if verify_api_key(self.admin_api_key.as_deref(), provided) {
            Ok(())
        } else {
            warn!("Rejected admin request with missing or invalid API key");
            Err(error_response(StatusCode::UNAUTHORIZED, "unauthorized"))
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/admin/reconcile/:content_type", post(reconcile))
        .route("/admin/languages/:code/backfill", post(backfill))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind on all interfaces and serve until `shutdown` resolves
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✓ Admin server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Admin server failed")
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> Response {
    Json(state.engine.metrics()).into_response()
}

async fn reconcile(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    info!("Manual reconciliation requested for {}", content_type);
    match state.engine.reconcile(&content_type).await {
        Ok(report) => Json(report).into_response(),
        Err(e) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn backfill(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    info!("Manual backfill requested for language {}", code);
    Json(state.engine.backfill_language(&code).await).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{InMemoryContentType, InMemoryLanguages};
    use crate::i18n::Language;
    use crate::registry::ContentTypeRegistry;
    use crate::translation::Actor;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> Router {
        let languages = InMemoryLanguages::new("ko");
        languages.upsert(Language::new(1, "ko", "Korean")).unwrap();
        languages.upsert(Language::new(2, "en", "English")).unwrap();
        let mut registry = ContentTypeRegistry::new(Arc::new(languages.clone()));
        registry
            .register(Arc::new(InMemoryContentType::new("bulletin", languages)), 60)
            .unwrap();

        let engine = Arc::new(SyncEngine::start(registry, Actor::system()));
        router(AppState::new(engine, api_key.map(str::to_string)))
    }

    async fn send(app: Router, method: &str, uri: &str, key: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    // ==================== Public Route Tests ====================

    #[tokio::test]
    async fn test_health() {
        let (status, _) = send(app(Some("k")), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_report() {
        let (status, body) = send(app(None), "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events_published"], 0);
    }

    // ==================== Admin Route Tests ====================

    #[tokio::test]
    async fn test_reconcile_known_type() {
        let (status, body) = send(app(None), "POST", "/admin/reconcile/bulletin", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content_type"], "bulletin");
        assert_eq!(body["items_scanned"], 0);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_type_is_404() {
        let (status, body) = send(app(None), "POST", "/admin/reconcile/story", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("story"));
    }

    #[tokio::test]
    async fn test_backfill_reports_summary() {
        let (status, body) = send(app(None), "POST", "/admin/languages/en/backfill", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language_code"], "en");
        assert_eq!(body["content_types"]["bulletin"]["created"], 0);
    }

    // ==================== Auth Tests ====================

    #[tokio::test]
    async fn test_admin_routes_require_key() {
        let (status, _) = send(app(Some("s3cret")), "POST", "/admin/reconcile/bulletin", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(app(Some("s3cret")), "POST", "/admin/languages/en/backfill", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_accept_valid_key() {
        let (status, _) =
            send(app(Some("s3cret")), "POST", "/admin/reconcile/bulletin", Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
