//! Data service
//!
//! [`DataService`] is the explicitly constructed entry point to the schema
//! registry and the table, row, search and report services. It owns the
//! database provider; the individual services are cheap borrowed views.

use std::sync::Arc;

use serde_json::Value;

use crate::database::traits::DatabaseProvider;
use crate::sanitize::validate_table_name;
use crate::schema::{ColumnDescriptor, Record};
use crate::{Error, Result};

pub mod export;
pub mod registry;
pub mod reports;
pub mod rows;
pub mod search;
pub mod tables;

pub use export::{ExportFile, ExportFormat};
pub use registry::SchemaRegistry;
pub use reports::ReportService;
pub use rows::RowService;
pub use search::SearchService;
pub use tables::TableService;

/// Entry point bundling all services over one database provider
pub struct DataService<DB: DatabaseProvider> {
    database: Arc<DB>,
}

impl<DB: DatabaseProvider> DataService<DB> {
    /// Create a service over the given provider
    ///
    /// Call [`DataService::initialize`] before serving requests.
    pub fn new(database: DB) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    /// Create the registry table if it does not exist yet
    pub async fn initialize(&self) -> Result<()> {
        self.registry().initialize().await?;
        tracing::info!("Schema registry ready");
        Ok(())
    }

    /// Close the connection pool
    pub async fn shutdown(&self) {
        self.database.close().await;
        tracing::info!("Database pool closed");
    }

    /// Verify the database is reachable
    pub async fn ping(&self) -> Result<()> {
        Ok(self.database.ping().await?)
    }

    pub fn database(&self) -> &DB {
        &self.database
    }

    pub fn registry(&self) -> SchemaRegistry<'_, DB> {
        SchemaRegistry::new(&self.database)
    }

    pub fn tables(&self) -> TableService<'_, DB> {
        TableService::new(&self.database)
    }

    pub fn rows(&self) -> RowService<'_, DB> {
        RowService::new(&self.database)
    }

    pub fn search(&self) -> SearchService<'_, DB> {
        SearchService::new(&self.database)
    }

    pub fn reports(&self) -> ReportService<'_, DB> {
        ReportService::new(&self.database)
    }
}

/// Columns of an existing table, or `NotFound`
pub(crate) async fn existing_columns<DB: DatabaseProvider>(
    database: &DB,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    validate_table_name(table)?;

    let columns = database.table_columns(table).await?;
    if columns.is_empty() {
        return Err(Error::NotFound(format!("Table '{}' not found", table)));
    }
    Ok(columns)
}

/// Look up a column by name; both backends compare column names case-insensitively
pub(crate) fn find_column<'c>(
    columns: &'c [ColumnDescriptor],
    name: &str,
) -> Option<&'c ColumnDescriptor> {
    columns
        .iter()
        .find(|column| column.name.eq_ignore_ascii_case(name))
}

/// Reject names that are not columns of the table
pub(crate) fn require_column<'c>(
    columns: &'c [ColumnDescriptor],
    name: &str,
) -> Result<&'c ColumnDescriptor> {
    find_column(columns, name)
        .ok_or_else(|| Error::Validation(format!("Unknown column '{}'", name)))
}

/// Read the `count` column of a `SELECT COUNT(*) AS count` result
pub(crate) fn count_from(records: &[Record]) -> u64 {
    records
        .first()
        .and_then(|record| record.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}
