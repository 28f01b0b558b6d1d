//! Application configuration and shared HTTP state.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use webhook_processor::AsyncProcessor;

/// Application configuration loaded from environment variables.
///
/// Every field has a sensible default; invalid numeric values silently fall
/// back rather than refusing to boot.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Git-hosting API token.
    pub github_token: String,
    /// Shared webhook secret; empty disables signature verification.
    pub webhook_secret: String,
    /// Base directory for per-PR workspaces.
    pub work_base_dir: String,
    /// Bounded queue depth for webhook jobs.
    pub webhook_queue_size: usize,
    /// Worker-pool size draining the queue.
    pub webhook_workers: usize,
    /// Budget for draining workers on shutdown.
    pub shutdown_timeout: Duration,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: parse_or(env::var("PORT").ok(), 8080),
            github_token: env::var("GITHUB_TOKEN").unwrap_or_default(),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            work_base_dir: env::var("PR_WORK_BASE_DIR")
                .unwrap_or_else(|_| "/tmp/prmate".to_string()),
            webhook_queue_size: parse_or(env::var("WEBHOOK_QUEUE_SIZE").ok(), 100),
            webhook_workers: parse_or(env::var("WEBHOOK_WORKERS").ok(), 1),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

fn parse_or<T: std::str::FromStr + PartialOrd + Default>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}

/// Shared application state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration.
    pub config: Arc<AppConfig>,
    /// Webhook dispatcher; absent when the processor is not configured.
    pub dispatcher: Option<Arc<AsyncProcessor>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, dispatcher: Option<Arc<AsyncProcessor>>) -> Self {
        Self { config, dispatcher }
    }
}
