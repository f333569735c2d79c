//! Lead Tracker Backend
//!
//! REST backend for lead records, the tag hierarchy, follow-up logging and
//! CSV import/export, with SQLite persistence and Tantivy full-text search.

mod api;
mod config;
mod csv;
mod db;
mod errors;
mod export;
mod import;
mod models;
mod search;
mod validation;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, StorageBackend};
use db::{MemoryStore, Repository, SqliteStore, Store};
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lead Tracker Backend");
    tracing::info!("Storage: {:?}", config.storage);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize storage
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            let pool = db::init_database(&config.db_path).await?;
            Arc::new(SqliteStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let repo = Arc::new(Repository::new(store));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    tracing::info!("Building search index...");
    let leads = repo.list_leads().await?;
    let tags = repo.list_tags().await?;
    search.rebuild(&leads, &tags).await?;

    let app = create_router(AppState { repo, search });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Datastore
        .route("/datastore", get(api::get_datastore))
        .route("/datastore/revision", get(api::get_revision))
        // Leads
        .route("/leads", get(api::list_leads).post(api::create_lead))
        .route(
            "/leads/{id}",
            get(api::get_lead)
                .put(api::update_lead)
                .delete(api::delete_lead),
        )
        // Interactions
        .route(
            "/leads/{id}/interactions",
            get(api::list_interactions).post(api::append_interaction),
        )
        // Tasks
        .route("/leads/{id}/tasks", get(api::list_lead_tasks))
        .route("/tasks", get(api::list_tasks))
        .route("/tasks", post(api::create_task))
        .route("/tasks/{id}", put(api::update_task))
        .route("/tasks/{id}", delete(api::delete_task))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags", post(api::create_tag))
        .route("/tags/{id}", put(api::update_tag))
        .route("/tags/{id}", delete(api::delete_tag))
        .route("/tags/{id}/children", get(api::list_tag_children))
        // Sources
        .route("/sources", get(api::list_sources))
        .route("/sources", post(api::create_source))
        .route("/sources/{id}", put(api::update_source))
        .route("/sources/{id}", delete(api::delete_source))
        // Import / export
        .route("/import/preview", post(api::preview_import))
        .route("/import", post(api::import_leads))
        .route("/export", get(api::export_report))
        // Search
        .route("/search", get(api::search_leads));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
