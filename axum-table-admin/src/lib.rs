//! # axum-table-admin
//!
//! A schema-flexible admin API for relational databases, mountable as an Axum router.
//!
//! ## Features
//!
//! - Create, alter and drop tables at runtime, tracked in a schema registry
//! - Generic row CRUD with bulk update/delete
//! - Substring search per table and across all registered tables
//! - Table statistics, ad-hoc reports and CSV/JSON/XLSX export
//! - Support for SQLite and MySQL
//!
//! ## Security Warning
//!
//! - No authentication/authorization built-in
//! - Table and column management allows full schema changes
//! - Mount it behind your own auth layer
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_table_admin::TableAdminLayer;
//! use sqlx::SqlitePool;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = SqlitePool::connect("sqlite::memory:")
//!         .await
//!         .unwrap();
//!
//!     let admin = TableAdminLayer::sqlite("/api", pool).await.unwrap();
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(admin.into_router());
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod database;
pub mod layer;
pub mod sanitize;
pub mod schema;
pub mod service;
pub mod sql;

#[cfg(all(test, feature = "sqlite"))]
pub(crate) mod test_support;

// Public exports
pub use layer::TableAdminLayer;
pub use schema::{ColumnDescriptor, ColumnSpec, ColumnType, Record, TableDescriptor};
pub use service::DataService;

// Re-export database providers
pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "mysql")]
pub use database::mysql::MySqlProvider;

// Error type
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// Table definition that cannot be created
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Referenced table or row is absent
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(String),
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ConstraintViolation(message) => Error::ConstraintViolation(message),
            DatabaseError::TableNotFound(message) => Error::NotFound(message),
            DatabaseError::Query(message) => Error::Database(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
