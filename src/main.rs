use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai_llm_service::{LlmModelConfig, TextGenerator};
use api::core::app_state::{AppConfig, AppState};
use pr_reviewer::review::ReviewService;
use pr_reviewer::{HostClient, HostConfig};
use pr_workspace::Manager;
use webhook_processor::{AsyncConfig, AsyncProcessor, Processor, ScanService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env when present.
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Arc::new(AppConfig::from_env());

    // Text generator (OpenAI-compatible by default).
    let generator = Arc::new(TextGenerator::from_config(LlmModelConfig::from_env())?);
    generator.start()?;

    // Hosting client shared by the scan and review flows.
    let host = HostClient::from_config(HostConfig {
        base_api: "https://api.github.com".to_string(),
        token: config.github_token.clone(),
    })?;

    // Core services.
    let workspace = Arc::new(Manager::new(&config.work_base_dir));
    let scan_service = ScanService::new(host.clone(), config.github_token.clone());
    let review_service = ReviewService::new(host.clone(), generator.clone());
    let processor = Processor::new(workspace, scan_service, review_service, host);

    let dispatcher = Arc::new(AsyncProcessor::new(
        processor,
        AsyncConfig {
            queue_size: config.webhook_queue_size,
            workers: config.webhook_workers,
        },
    ));

    let state = Arc::new(AppState::new(config.clone(), Some(dispatcher.clone())));

    // Serve until ctrl-c, then drain workers within the shutdown budget.
    api::start(state).await?;

    if let Err(err) = dispatcher.stop(Instant::now() + config.shutdown_timeout).await {
        tracing::warn!(%err, "dispatcher shutdown incomplete");
    }
    generator.stop()?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,pr_reviewer=debug,repo_scanner=debug,webhook_processor=debug")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
