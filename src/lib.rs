pub mod client;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod store;
pub mod telemetry;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use config::{Config, StoreBackend};
use store::{EventStore, MemoryEventStore, PgEventStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let store: Arc<dyn EventStore> = match config.database.backend {
            StoreBackend::Postgres => {
                let db = database::Database::from_config(&config.database).await?;
                info!("Database connected");

                if config.database.run_migrations {
                    db.run_migrations().await?;
                }
                Arc::new(PgEventStore::connect(db.pool).await?)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory event store, events are lost on restart");
                Arc::new(MemoryEventStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<dyn EventStore>, config: Config) -> Arc<Self> {
        Arc::new(Self { store, config })
    }
}

/// Главный роутер: баннер, health-check и API под `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = match state.config.app.cors_allow_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::permissive().allow_origin(origin),
            Err(_) => {
                warn!("Ignoring invalid CORS_ALLOW_ORIGIN {:?}", origin);
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    };

    Router::new()
        .route("/", get(|| async { "Study Planner API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
