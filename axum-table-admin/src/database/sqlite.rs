//! SQLite database provider implementation

use crate::database::traits::{DatabaseError, DatabaseProvider, ExecuteOutcome};
use crate::database::Dialect;
use crate::schema::{CatalogTimestamps, ColumnDescriptor, Record};
use crate::sql::{SqlValue, Statement};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bind statement parameters in order
    fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &[SqlValue]) -> SqliteQuery<'q> {
        for value in params {
            query = match value {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(flag) => query.bind(*flag),
                SqlValue::Integer(integer) => query.bind(*integer),
                SqlValue::Float(float) => query.bind(*float),
                SqlValue::Text(text) => query.bind(text.clone()),
                // Fixed-width UTC text keeps lexical and chronological order equal
                SqlValue::Timestamp(timestamp) => {
                    query.bind(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
                }
            };
        }
        query
    }

    /// Convert a SQLite row to a JSON record
    fn row_to_record(row: &SqliteRow) -> Result<Record, DatabaseError> {
        let mut record = Record::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column.ordinal())?;
            record.insert(column.name().to_string(), value);
        }

        Ok(record)
    }

    /// Extract a column value based on the storage class of the stored value
    ///
    /// SQLite is dynamically typed, so the declared column type says little
    /// about what a given cell holds.
    fn extract_column_value(row: &SqliteRow, index: usize) -> Result<Value, DatabaseError> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let storage_class = raw.type_info().name().to_string();

        let value = match storage_class.as_str() {
            "INTEGER" => Value::Number(row.try_get_unchecked::<i64, _>(index)?.into()),
            "REAL" => {
                let float: f64 = row.try_get_unchecked(index)?;
                serde_json::Number::from_f64(float)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get_unchecked(index)?;
                Value::String(format!("[BLOB: {} bytes]", bytes.len()))
            }
            _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

/// Split a declared type such as `VARCHAR(50)` into `("varchar", Some(50))`
fn split_declared_type(declared: &str) -> (String, Option<u64>) {
    let declared = declared.trim();
    match declared.find('(') {
        Some(open) => {
            let base = declared[..open].trim().to_ascii_lowercase();
            let length = declared[open + 1..]
                .trim_end_matches(')')
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<u64>().ok());
            (base, length)
        }
        None => (declared.to_ascii_lowercase(), None),
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>, DatabaseError> {
        tracing::debug!(sql = %statement.sql, "fetch");

        let rows = Self::bind_params(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn execute(&self, statement: &Statement) -> Result<ExecuteOutcome, DatabaseError> {
        tracing::debug!(sql = %statement.sql, "execute");

        let result = Self::bind_params(sqlx::query(&statement.sql), &statement.params)
            .execute(&self.pool)
            .await?;

        Ok(ExecuteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn execute_atomic(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<ExecuteOutcome>, DatabaseError> {
        let mut transaction = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(statements.len());

        for statement in statements {
            tracing::debug!(sql = %statement.sql, "execute in transaction");

            let result = Self::bind_params(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *transaction)
                .await;

            match result {
                Ok(result) => outcomes.push(ExecuteOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: Some(result.last_insert_rowid()),
                }),
                Err(error) => {
                    if let Err(rollback_error) = transaction.rollback().await {
                        tracing::warn!("Rollback failed: {}", rollback_error);
                    }
                    return Err(error.into());
                }
            }
        }

        transaction.commit().await?;
        Ok(outcomes)
    }

    async fn list_physical_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let query = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(row.try_get::<String, _>("name")?);
        }
        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        let table_info_query = format!(
            "PRAGMA table_info({})",
            Dialect::Sqlite.quote_identifier(table)
        );
        let column_rows = sqlx::query(&table_info_query)
            .fetch_all(&self.pool)
            .await?;

        let mut primary_key_count = 0;
        let mut raw_columns = Vec::with_capacity(column_rows.len());
        for row in column_rows {
            // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
            let name: String = row.try_get("name")?;
            let declared_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
            let primary_key: i64 = row.try_get("pk")?;

            if primary_key > 0 {
                primary_key_count += 1;
            }
            raw_columns.push((name, declared_type, not_null, default_value, primary_key > 0));
        }

        let columns = raw_columns
            .into_iter()
            .map(|(name, declared_type, not_null, default_value, is_primary_key)| {
                let (data_type, length) = split_declared_type(&declared_type);
                // Only a single-column INTEGER PRIMARY KEY aliases the rowid
                let is_auto_increment =
                    is_primary_key && primary_key_count == 1 && data_type == "integer";
                let max_length = match data_type.as_str() {
                    "varchar" | "char" | "text" => length,
                    _ => None,
                };

                ColumnDescriptor {
                    name,
                    nullable: not_null == 0 && !is_primary_key,
                    data_type,
                    is_primary_key,
                    is_auto_increment,
                    max_length,
                    default_value,
                }
            })
            .collect();

        Ok(columns)
    }

    async fn table_timestamps(&self, _table: &str) -> Result<CatalogTimestamps, DatabaseError> {
        // sqlite_master keeps no creation or modification times
        Ok(CatalogTimestamps::default())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    #[test]
    fn test_split_declared_type() {
        assert_eq!(split_declared_type("VARCHAR(50)"), ("varchar".to_string(), Some(50)));
        assert_eq!(split_declared_type("DECIMAL(10,2)"), ("decimal".to_string(), Some(10)));
        assert_eq!(split_declared_type("INTEGER"), ("integer".to_string(), None));
        assert_eq!(split_declared_type(""), (String::new(), None));
    }

    #[tokio::test]
    async fn test_fetch_all_converts_storage_classes() {
        let provider = SqliteProvider::new(memory_pool().await);
        provider
            .execute(&Statement::new(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, price DECIMAL, note TEXT)",
            ))
            .await
            .unwrap();
        provider
            .execute(
                &Statement::new("INSERT INTO items (name, price, note) VALUES (?, ?, ?)")
                    .bind(SqlValue::Text("Bolt".to_string()))
                    .bind(SqlValue::Float(1.5))
                    .bind(SqlValue::Null),
            )
            .await
            .unwrap();

        let rows = provider
            .fetch_all(&Statement::new("SELECT * FROM items"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], serde_json::json!(1));
        assert_eq!(rows[0]["name"], serde_json::json!("Bolt"));
        assert_eq!(rows[0]["price"], serde_json::json!(1.5));
        assert_eq!(rows[0]["note"], Value::Null);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name", "price", "note"]);
    }

    #[tokio::test]
    async fn test_execute_atomic_rolls_back_on_failure() {
        let provider = SqliteProvider::new(memory_pool().await);
        provider
            .execute(&Statement::new(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            ))
            .await
            .unwrap();

        let result = provider
            .execute_atomic(&[
                Statement::new("INSERT INTO items (name) VALUES (?)")
                    .bind(SqlValue::Text("first".to_string())),
                Statement::new("INSERT INTO items (name) VALUES (?)").bind(SqlValue::Null),
            ])
            .await;

        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));

        let rows = provider
            .fetch_all(&Statement::new("SELECT * FROM items"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_table_error() {
        let provider = SqliteProvider::new(memory_pool().await);
        let result = provider
            .fetch_all(&Statement::new("SELECT * FROM nowhere"))
            .await;
        assert!(matches!(result, Err(DatabaseError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_table_columns_introspection() {
        let provider = SqliteProvider::new(memory_pool().await);
        provider
            .execute(&Statement::new(
                "CREATE TABLE widgets (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(50) NOT NULL, price DECIMAL DEFAULT 0)",
            ))
            .await
            .unwrap();

        let columns = provider.table_columns("widgets").await.unwrap();
        assert_eq!(columns.len(), 3);

        assert_eq!(columns[0].name, "id");
        assert!(columns[0].is_primary_key);
        assert!(columns[0].is_auto_increment);

        assert_eq!(columns[1].data_type, "varchar");
        assert_eq!(columns[1].max_length, Some(50));
        assert!(!columns[1].nullable);

        assert_eq!(columns[2].data_type, "decimal");
        assert!(columns[2].nullable);
        assert_eq!(columns[2].default_value.as_deref(), Some("0"));

        assert!(provider.table_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_physical_tables() {
        let provider = SqliteProvider::new(memory_pool().await);
        provider
            .execute(&Statement::new("CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT)"))
            .await
            .unwrap();
        provider
            .execute(&Statement::new("CREATE TABLE a (id INTEGER PRIMARY KEY)"))
            .await
            .unwrap();

        let tables = provider.list_physical_tables().await.unwrap();
        assert_eq!(tables, vec!["a".to_string(), "b".to_string()]);
    }
}
