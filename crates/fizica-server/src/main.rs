use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fizica_client::{ChatClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use fizica_core::models::ChatOptions;
use fizica_core::throttle::{RequestThrottle, ThrottleConfig};
use fizica_core::tutor::TutorService;
use fizica_server::routes::{self, DEFAULT_MAX_BODY_BYTES};
use fizica_server::state::AppState;

#[derive(Parser)]
#[command(name = "fizica-server", version, about = "Physics tutor HTTP server")]
struct Config {
    /// Chat-completion API key
    #[arg(long, env = "FIZICA_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model name; vision-capable models receive the photos
    #[arg(long, env = "FIZICA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "FIZICA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout for model calls, in seconds
    #[arg(long, env = "FIZICA_LLM_TIMEOUT_SECS", default_value_t = 120)]
    llm_timeout_secs: u64,

    #[arg(long, env = "FIZICA_PORT", default_value_t = 3000)]
    port: u16,

    /// Maximum request body size in bytes
    #[arg(long, env = "FIZICA_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fizica=info".parse()?))
        .with_target(false)
        .init();

    let config = Config::parse();

    let throttle = RequestThrottle::install(ThrottleConfig::from_env()?)?.clone();
    let client = ChatClient::with_base_url(&config.api_key, &config.model, &config.base_url)?
        .with_timeout(Duration::from_secs(config.llm_timeout_secs))?;
    let tutor = TutorService::new(client, throttle).with_options(ChatOptions {
        model: Some(config.model.clone()),
        ..ChatOptions::default()
    });

    let state = Arc::new(AppState::new(tutor));
    let app = routes::router(state, config.max_body_bytes).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(model = %config.model, "Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
