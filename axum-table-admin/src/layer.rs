//! TableAdminLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the admin API
//! into an Axum application.

use crate::database::traits::DatabaseProvider;
use crate::service::DataService;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

#[cfg(feature = "mysql")]
use crate::database::mysql::MySqlProvider;

use crate::api::{
    alter_table_handler, bulk_delete_rows_handler, bulk_update_rows_handler, create_row_handler,
    create_table_handler, delete_row_handler, drop_table_handler, export_table_handler,
    generate_report_handler, get_row_handler, get_table_handler, global_stats_handler,
    health_handler, list_rows_handler, list_tables_handler, not_found_handler,
    search_global_handler, search_table_handler, table_stats_handler, update_row_handler,
    ApiState,
};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Main layer for mounting the admin API into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_table_admin::{DataService, SqliteProvider, TableAdminLayer};
/// use sqlx::SqlitePool;
///
/// # async fn example() {
/// let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let service = DataService::new(SqliteProvider::new(pool));
/// service.initialize().await.unwrap();
///
/// let admin = TableAdminLayer::new("/api", service).with_internal_errors(false);
/// let app = Router::new().merge(admin.into_router());
/// # }
/// ```
pub struct TableAdminLayer<DB: DatabaseProvider> {
    base_path: String,
    service: Arc<DataService<DB>>,
    expose_internal_errors: bool,
    cors: CorsLayer,
}

impl<DB: DatabaseProvider> TableAdminLayer<DB> {
    /// Create a new admin API at the given base path
    ///
    /// The service must already be initialized.
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted (e.g., "/api")
    /// * `service` - The data service, owned or shared
    pub fn new(base_path: impl Into<String>, service: impl Into<Arc<DataService<DB>>>) -> Self {
        Self {
            base_path: base_path.into(),
            service: service.into(),
            expose_internal_errors: true,
            cors: CorsLayer::permissive(),
        }
    }

    /// Whether 5xx responses include the underlying error message
    ///
    /// Enabled by default; disable for production deployments.
    pub fn with_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Replace the default permissive CORS policy
    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = cors;
        self
    }

    /// The shared data service behind this layer
    pub fn service(&self) -> Arc<DataService<DB>> {
        Arc::clone(&self.service)
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - Table, data, search and report endpoints at `{base_path}/*`
    /// - A health check at `{base_path}/health`
    /// - A JSON 404 for unknown routes, a 10 MiB body limit, request tracing and CORS
    pub fn into_router(self) -> Router {
        let state = ApiState::new(self.service, self.expose_internal_errors);

        // Axum 0.8 uses {param} syntax; static segments win over parameters
        let api_router = Router::new()
            .route("/health", get(health_handler::<DB>))
            .route(
                "/tables",
                get(list_tables_handler::<DB>).post(create_table_handler::<DB>),
            )
            .route(
                "/tables/{name}",
                get(get_table_handler::<DB>)
                    .put(alter_table_handler::<DB>)
                    .delete(drop_table_handler::<DB>),
            )
            .route(
                "/data/{table}",
                get(list_rows_handler::<DB>).post(create_row_handler::<DB>),
            )
            .route(
                "/data/{table}/bulk",
                put(bulk_update_rows_handler::<DB>).delete(bulk_delete_rows_handler::<DB>),
            )
            .route(
                "/data/{table}/{id}",
                get(get_row_handler::<DB>)
                    .put(update_row_handler::<DB>)
                    .delete(delete_row_handler::<DB>),
            )
            .route("/search", get(search_global_handler::<DB>))
            .route("/search/{table}", get(search_table_handler::<DB>))
            .route("/reports/stats", get(global_stats_handler::<DB>))
            .route("/reports/stats/{table}", get(table_stats_handler::<DB>))
            .route("/reports/generate", axum::routing::post(generate_report_handler::<DB>))
            .route("/reports/export/{table}", get(export_table_handler::<DB>))
            .with_state(state);

        let base_path = self.base_path.trim_end_matches('/');
        let router = if base_path.is_empty() {
            api_router
        } else {
            Router::new().nest(base_path, api_router)
        };

        router
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(TraceLayer::new_for_http())
            .layer(self.cors)
    }
}

#[cfg(feature = "sqlite")]
impl TableAdminLayer<SqliteProvider> {
    /// Create an admin API for SQLite, bootstrapping the schema registry
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted
    /// * `pool` - The SQLite connection pool
    pub async fn sqlite(base_path: impl Into<String>, pool: sqlx::SqlitePool) -> crate::Result<Self> {
        let service = DataService::new(SqliteProvider::new(pool));
        service.initialize().await?;
        Ok(Self::new(base_path, service))
    }
}

#[cfg(feature = "mysql")]
impl TableAdminLayer<MySqlProvider> {
    /// Create an admin API for MySQL, bootstrapping the schema registry
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted
    /// * `pool` - The MySQL connection pool
    pub async fn mysql(base_path: impl Into<String>, pool: sqlx::MySqlPool) -> crate::Result<Self> {
        let service = DataService::new(MySqlProvider::new(pool));
        service.initialize().await?;
        Ok(Self::new(base_path, service))
    }
}
