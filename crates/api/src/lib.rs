//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for catalog items and orders, with structured
//! logging (tracing) and Prometheus metrics.

pub mod clients;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{
    CatalogStore, EventPublisher, InMemoryUserDirectory, LoggingEventPublisher, OrderService,
    OrderStore, UserDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryCatalogStore, InMemoryOrderStore, PostgresCatalogStore, PostgresOrderStore};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use clients::HttpUserDirectory;
use config::Config;

/// Order service over type-erased stores, so the backend is chosen at startup.
pub type SharedOrderService = OrderService<Arc<dyn OrderStore>, Arc<dyn CatalogStore>>;

/// Store backend serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Memory,
    Postgres,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Memory => "memory",
            Storage::Postgres => "postgres",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub order_service: SharedOrderService,
    pub storage: Storage,
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// State over in-memory stores with the given user directory.
    pub fn in_memory(users: Arc<dyn UserDirectory>, metrics: PrometheusHandle) -> Self {
        let order_store = InMemoryOrderStore::new();
        let catalog: Arc<dyn CatalogStore> =
            Arc::new(InMemoryCatalogStore::referenced_by(&order_store));
        let orders: Arc<dyn OrderStore> = Arc::new(order_store);
        let publisher: Arc<dyn EventPublisher> = Arc::new(LoggingEventPublisher::new());
        Self {
            order_service: OrderService::new(orders, catalog, users, publisher),
            storage: Storage::Memory,
            metrics,
        }
    }
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to build user service client: {0}")]
    UserClient(#[from] reqwest::Error),
}

/// Builds the application state described by `config`.
///
/// Uses PostgreSQL when `DATABASE_URL` is set and the HTTP user directory
/// when `USER_SERVICE_URL` is set; in-memory stand-ins otherwise.
pub async fn build_state(
    config: &Config,
    metrics: PrometheusHandle,
) -> Result<AppState, StartupError> {
    let users: Arc<dyn UserDirectory> = match &config.user_service_url {
        Some(url) => {
            tracing::info!(%url, "using HTTP user directory");
            Arc::new(HttpUserDirectory::new(url, config.user_service_timeout)?)
        }
        None => {
            tracing::warn!("USER_SERVICE_URL not set, accepting every user");
            Arc::new(InMemoryUserDirectory::allow_all())
        }
    };

    let Some(database_url) = &config.database_url else {
        tracing::info!("DATABASE_URL not set, using in-memory stores");
        return Ok(AppState::in_memory(users, metrics));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    store::run_migrations(&pool).await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "connected to PostgreSQL"
    );

    let orders: Arc<dyn OrderStore> = Arc::new(PostgresOrderStore::new(pool.clone()));
    let catalog: Arc<dyn CatalogStore> = Arc::new(PostgresCatalogStore::new(pool));
    Ok(AppState {
        order_service: OrderService::new(
            orders,
            catalog,
            users,
            Arc::new(LoggingEventPublisher::new()),
        ),
        storage: Storage::Postgres,
        metrics,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::render))
        .route(
            "/items",
            post(routes::items::create).get(routes::items::list),
        )
        .route(
            "/items/{id}",
            get(routes::items::get)
                .put(routes::items::update)
                .delete(routes::items::delete),
        )
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get)
                .patch(routes::orders::update)
                .delete(routes::orders::delete),
        )
        .route("/orders/{id}/total", get(routes::orders::total))
        .route("/orders/{id}/exists", get(routes::orders::exists))
        .route("/orders/{id}/payment", post(routes::orders::payment))
        .route("/users/{user_id}/orders", get(routes::orders::by_user))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
