// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::contribution_fetcher::Credential;
use crate::application::import_service::ImportService;
use crate::application::model_assembler::ModelAssembler;
use crate::application::model_service::ModelService;
use crate::infrastructure::config::load_skyline_config;
use crate::infrastructure::github_fetcher::GithubContributionFetcher;
use crate::infrastructure::label_font::load_label_font;
use crate::infrastructure::mesh_kernel::MeshKernel;
use crate::infrastructure::sqlite_repository::SqliteRepository;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_skyline_config()?;
    if config.github.machine_user_token.is_empty() {
        tracing::warn!("No machine user token configured, all-activity imports will fail");
    }

    // Create collaborators (infrastructure layer)
    let repository = Arc::new(SqliteRepository::open(&config.database.path)?);
    let fetcher = Arc::new(GithubContributionFetcher::new(config.github.graphql_url));
    let kernel = MeshKernel::new(load_label_font(&config.labels)?);
    tracing::info!(labels = kernel.has_font(), "Mesh kernel ready");
    let generator = Arc::new(ModelAssembler::new(kernel));

    // Create services (application layer)
    let import_service = ImportService::new(
        repository.clone(),
        fetcher,
        Credential::new(config.github.machine_user_token),
    );
    let model_service = ModelService::new(repository, generator);

    // Create application state
    let state = Arc::new(AppState {
        import_service,
        model_service,
    });

    // Build router (presentation layer)
    let router = presentation::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, database = %config.database.path.display(), "Starting skyline service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
