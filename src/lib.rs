pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{CatalogError, CatalogResult, IdentifierError, PatchError};

pub use logic::{IdGenerator, Outcome, Resource, ResourceService};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Repository, Store};

use std::sync::Arc;

use api::{AppState, TokenVerifier};
use config::{AppConfig, StoreBackend};

/// Info for everything, warn for sqlx; `RUST_LOG` overrides both.
pub fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

/// Router with state for one store backend.
pub fn build_app<S: Store + 'static>(state: AppState<S>) -> axum::Router {
    routes::create_router().with_state(state)
}

async fn serve_with<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    use tokio::net::TcpListener;

    let verifier = TokenVerifier::from_config(&config.auth)?;
    if !verifier.is_enabled() {
        log::warn!("Authentication is disabled, every request acts as the development user");
    }
    let state = AppState::new(store, verifier);

    if config.load_seed_data {
        log::info!("Loading seed data...");
        seed::load_seed_data(&state.service).await?;
    }

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Cerebrum server running on http://{}", bind_address);

    axum::serve(listener, build_app(state)).await?;

    Ok(())
}

/// Connects the configured backend and serves until shutdown.
pub async fn run_with_config(config: AppConfig) -> anyhow::Result<()> {
    match config.database.backend {
        StoreBackend::Memory => {
            log::info!("Using in-memory graph store");
            serve_with(Arc::new(MemoryStore::new()), &config).await
        }
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&config.database_url(), config.max_connections()).await?;
            store.migrate().await?;
            log::info!("Graph tables ready");
            serve_with(Arc::new(store), &config).await
        }
    }
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::load()?;
    run_with_config(config).await
}
