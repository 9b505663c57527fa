use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::models::{
    BOOKINGS_COLLECTION, BOOKING_COLUMNS, TREATMENT_OPTIONS_COLLECTION, TREATMENT_OPTION_COLUMNS,
};
use auth_cell::handlers::{USERS_COLLECTION, USER_COLUMNS};
use shared_config::{AppConfig, StoreBackend};
use shared_database::{DocumentStore, MemoryStore, SupabaseClient};
use shared_utils::AppState;

fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Supabase => {
            info!("Using Supabase document store at {}", config.supabase_url);
            let client = SupabaseClient::new(config)
                .with_columns(TREATMENT_OPTIONS_COLLECTION, TREATMENT_OPTION_COLUMNS)
                .with_columns(BOOKINGS_COLLECTION, BOOKING_COLUMNS)
                .with_columns(USERS_COLLECTION, USER_COLUMNS);
            Ok(Arc::new(client))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => MemoryStore::from_seed_file(path)
                    .with_context(|| format!("failed to seed memory store from {}", path))?,
                None => {
                    warn!("Memory store started without SEED_FILE, catalog is empty");
                    MemoryStore::new()
                }
            };
            info!("Using in-memory document store");
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting doctors portal API server");

    let config = AppConfig::from_env();
    let port = config.port;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The store handle lives for the whole process and is shared by every handler
    let store = build_store(&config)?;
    let state = AppState::new(config, store);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
