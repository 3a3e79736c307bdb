use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verdant_client::GeminiClient;
use verdant_core::backend::GenerationBackend;

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use crate::api::AppState;
use crate::config::Config;
use crate::repository::artifact_repository::FsArtifactStorage;
use crate::repository::job_repository::JobStore;
use crate::service::analysis_service::FieldAnalyzer;
use crate::service::generation_service::GenerationOrchestrator;
use crate::service::janitor::Janitor;

/// Upper bound for a single request to the Gemini API
const BACKEND_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verdant_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Verdant Orchestrator...");

    let config = Config::from_env().context("Invalid configuration")?;

    let backend = build_backend(&config)?;
    if backend.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, serving substitute analytics and videos");
    }

    let storage = FsArtifactStorage::new(&config.video_dir);
    storage
        .ensure_root()
        .await
        .with_context(|| format!("Failed to create {}", config.video_dir.display()))?;
    tracing::info!("Storing videos in {}", storage.root().display());

    let store = Arc::new(JobStore::new());
    let orchestrator = GenerationOrchestrator::new(
        Arc::clone(&store),
        backend.clone(),
        Arc::new(storage),
        config.generation_settings(),
    );
    let analyzer = FieldAnalyzer::new(backend, config.analysis_models.clone());

    spawn_janitor(orchestrator.janitor(), config.sweep_interval, config.retention);

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        orchestrator,
        analyzer,
        max_upload_bytes: config.max_upload_bytes,
        retention: config.retention,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

fn build_backend(config: &Config) -> anyhow::Result<Option<Arc<dyn GenerationBackend>>> {
    let Some(api_key) = config.api_key.as_deref() else {
        return Ok(None);
    };

    let http = reqwest::Client::builder()
        .timeout(BACKEND_REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let client = GeminiClient::with_client(&config.api_base, api_key, http)
        .context("Failed to create Gemini client")?;

    tracing::info!("Video generation enabled via {}", client.base_url());
    Ok(Some(Arc::new(client)))
}

/// Periodically evict expired jobs
fn spawn_janitor(janitor: Janitor, every: Duration, retention: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = janitor.sweep(retention).await;
            tracing::debug!("Janitor pass removed {} jobs", report.removed.len());
        }
    });
}
