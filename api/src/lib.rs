//! HTTP surface: signature-verified webhook intake and liveness.
//!
//! Two routes: `POST /webhook` (202 on enqueue, 400 on missing event
//! header or bad signature, 503 on backpressure) and `GET /health`.
//! The server shuts down gracefully on ctrl-c; draining the dispatcher is
//! the caller's job once `start` returns.

pub mod core;
pub mod error_handler;
pub mod routes;
pub mod signature;

use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::signal;
use tracing::info;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};
use crate::routes::{health_route::health, webhook_route::github_webhook};

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(github_webhook))
        .route("/health", get(health))
        .fallback(handler_404)
        .with_state(state)
}

/// Binds and serves until shutdown is requested.
pub async fn start(state: Arc<AppState>) -> AppResult<()> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Graceful shutdown on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        // If even listening for Ctrl+C fails, just log to stderr.
        eprintln!("failed to listen for shutdown signal: {e}");
    }
}

/// Fallback handler for unmatched routes.
async fn handler_404() -> impl IntoResponse {
    AppError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app_state::AppConfig;
    use crate::signature::signature_for;
    use ai_llm_service::services::scripted_service::ScriptedService;
    use ai_llm_service::TextGenerator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pr_reviewer::hosting::memory::{MemoryHost, MemoryState};
    use pr_reviewer::hosting::HostClient;
    use pr_reviewer::review::ReviewService;
    use pr_workspace::Manager;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use webhook_processor::{AsyncConfig, AsyncProcessor, Processor, ScanService};

    const SECRET: &str = "s3cret";

    fn test_state(tmp: &TempDir, with_dispatcher: bool) -> Arc<AppState> {
        let config = Arc::new(AppConfig {
            port: 0,
            github_token: String::new(),
            webhook_secret: SECRET.to_string(),
            work_base_dir: tmp.path().display().to_string(),
            webhook_queue_size: 8,
            webhook_workers: 1,
            shutdown_timeout: Duration::from_secs(1),
        });

        let dispatcher = with_dispatcher.then(|| {
            let host = HostClient::in_memory(MemoryHost::new(MemoryState::default()));
            let generator = Arc::new(TextGenerator::scripted(ScriptedService::single(
                r#"{"violations":[]}"#,
            )));
            let processor = Processor::new(
                Arc::new(Manager::new(tmp.path())),
                ScanService::new(host.clone(), ""),
                ReviewService::new(host.clone(), generator),
                host,
            );
            Arc::new(AsyncProcessor::new(
                processor,
                AsyncConfig {
                    queue_size: 8,
                    workers: 1,
                },
            ))
        });

        Arc::new(AppState::new(config, dispatcher))
    }

    fn webhook_request(event: Option<&str>, signature: Option<&str>, body: &[u8]) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/webhook");
        if let Some(event) = event {
            builder = builder.header("X-GitHub-Event", event);
        }
        if let Some(signature) = signature {
            builder = builder.header("X-Hub-Signature-256", signature);
        }
        builder
            .header("X-GitHub-Delivery", "delivery-1")
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_always_ok() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, true));

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_ping_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, true));

        let body = br#"{"zen":"Speak like a human."}"#;
        let sig = signature_for(SECRET, body);
        let resp = app
            .oneshot(webhook_request(Some("ping"), Some(&sig), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        // Ping creates no workspace directories.
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn missing_event_header_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, true));

        let body = b"{}";
        let sig = signature_for(SECRET, body);
        let resp = app
            .oneshot(webhook_request(None, Some(&sig), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tampered_signature_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, true));

        let body = br#"{"zen":"Non-blocking is better than blocking."}"#;
        let mut sig = signature_for(SECRET, body).into_bytes();
        let idx = "sha256=".len();
        sig[idx] = if sig[idx] == b'a' { b'b' } else { b'a' };
        let sig = String::from_utf8(sig).unwrap();

        let resp = app
            .oneshot(webhook_request(Some("ping"), Some(&sig), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_dispatcher_is_server_error() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, false));

        let body = b"{}";
        let sig = signature_for(SECRET, body);
        let resp = app
            .oneshot(webhook_request(Some("ping"), Some(&sig), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, true));

        let resp = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
