//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.

use crate::database::Dialect;
use crate::schema::{CatalogTimestamps, ColumnDescriptor, Record};
use crate::sql::Statement;
use async_trait::async_trait;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result of a data-modifying statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOutcome {
    /// Number of rows changed
    pub rows_affected: u64,

    /// Key generated by the last INSERT, if any
    pub last_insert_id: Option<i64>,
}

/// Database provider trait for statement execution and catalog introspection
///
/// Implementations own a connection pool and translate backend-specific
/// types into JSON records and [`ColumnDescriptor`]s. The services build
/// SQL through [`DatabaseProvider::dialect`] and never talk to sqlx directly.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// SQL flavour of this backend
    fn dialect(&self) -> Dialect;

    /// Run a query and convert every row to a JSON record
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, DatabaseError>;

    /// Run a single data-modifying statement
    async fn execute(&self, statement: &Statement) -> Result<ExecuteOutcome, DatabaseError>;

    /// Run all statements in one transaction
    ///
    /// Commits when every statement succeeds. On the first failure the
    /// transaction is rolled back and that failure is returned; the
    /// connection goes back to the pool on every path.
    async fn execute_atomic(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<ExecuteOutcome>, DatabaseError>;

    /// Names of all user tables that physically exist
    async fn list_physical_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Columns of a table in ordinal order (empty if the table does not exist)
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError>;

    /// Creation/update times recorded by the catalog, when it keeps them
    async fn table_timestamps(&self, table: &str) -> Result<CatalogTimestamps, DatabaseError>;

    /// Round trip to verify connectivity
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Close the underlying pool
    async fn close(&self);
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),

    /// Unique, foreign key, NOT NULL or check constraint rejected the change
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Statement referenced a table that does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        if let Some(database_error) = error.as_database_error() {
            if matches!(
                database_error.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return DatabaseError::ConstraintViolation(database_error.message().to_string());
            }
            // SQLite reports no SQLSTATE; MySQL uses 42S02
            let message = database_error.message();
            if message.starts_with("no such table")
                || database_error.code().as_deref() == Some("42S02")
            {
                return DatabaseError::TableNotFound(message.to_string());
            }
        }
        DatabaseError::Query(error.to_string())
    }
}
