use crate::database::sqlite::SqliteProvider;
use crate::database::traits::{DatabaseError, DatabaseProvider, ExecuteOutcome};
use crate::database::Dialect;
use crate::schema::{CatalogTimestamps, ColumnDescriptor, ColumnSpec, ColumnType, CreateTableRequest, Record};
use crate::service::DataService;
use crate::sql::Statement;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Every connection to `sqlite::memory:` is its own database, so pin the pool
/// to one connection that never expires.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool")
}

pub async fn memory_service() -> DataService<SqliteProvider> {
    let service = DataService::new(SqliteProvider::new(memory_pool().await));
    service.initialize().await.expect("registry table");
    service
}

pub fn column(name: &str, data_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        data_type,
        length: None,
        nullable: true,
        primary_key: false,
        auto_increment: false,
        default: None,
    }
}

pub fn id_column() -> ColumnSpec {
    ColumnSpec {
        primary_key: true,
        auto_increment: true,
        ..column("id", ColumnType::Int)
    }
}

/// `widgets(id pk/auto, name varchar(50) not null, price decimal)`
pub fn widgets_request() -> CreateTableRequest {
    CreateTableRequest {
        name: "widgets".to_string(),
        display_name: Some("Widgets".to_string()),
        columns: vec![
            id_column(),
            ColumnSpec {
                length: Some(50),
                nullable: false,
                ..column("name", ColumnType::Varchar)
            },
            column("price", ColumnType::Decimal),
        ],
    }
}

/// SQLite provider whose queries against one table always fail
pub struct FailingTableProvider {
    inner: SqliteProvider,
    quoted_table: String,
}

/// Service whose reads of `table` fail while everything else works
pub async fn failing_service(table: &str) -> DataService<FailingTableProvider> {
    let service = DataService::new(FailingTableProvider {
        inner: SqliteProvider::new(memory_pool().await),
        quoted_table: Dialect::Sqlite.quote_identifier(table),
    });
    service.initialize().await.expect("registry table");
    service
}

#[async_trait]
impl DatabaseProvider for FailingTableProvider {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, DatabaseError> {
        if statement.sql.contains(&self.quoted_table) {
            return Err(DatabaseError::Query("disk I/O error".to_string()));
        }
        self.inner.fetch_all(statement).await
    }

    async fn execute(&self, statement: &Statement) -> Result<ExecuteOutcome, DatabaseError> {
        self.inner.execute(statement).await
    }

    async fn execute_atomic(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<ExecuteOutcome>, DatabaseError> {
        self.inner.execute_atomic(statements).await
    }

    async fn list_physical_tables(&self) -> Result<Vec<String>, DatabaseError> {
        self.inner.list_physical_tables().await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        self.inner.table_columns(table).await
    }

    async fn table_timestamps(&self, table: &str) -> Result<CatalogTimestamps, DatabaseError> {
        self.inner.table_timestamps(table).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
