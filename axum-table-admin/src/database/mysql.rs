//! MySQL database provider implementation

use crate::database::traits::{DatabaseError, DatabaseProvider, ExecuteOutcome};
use crate::database::Dialect;
use crate::schema::{CatalogTimestamps, ColumnDescriptor, Record};
use crate::sql::{SqlValue, Statement};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlPool, Row, TypeInfo};

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// MySQL database provider
pub struct MySqlProvider {
    pool: MySqlPool,
}

impl MySqlProvider {
    /// Create a new MySQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - MySQL connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn bind_params<'q>(mut query: MySqlQuery<'q>, params: &[SqlValue]) -> MySqlQuery<'q> {
        for value in params {
            query = match value {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(flag) => query.bind(*flag),
                SqlValue::Integer(integer) => query.bind(*integer),
                SqlValue::Float(float) => query.bind(*float),
                SqlValue::Text(text) => query.bind(text.clone()),
                SqlValue::Timestamp(timestamp) => query.bind(*timestamp),
            };
        }
        query
    }

    /// Convert a MySQL row to a JSON record
    fn row_to_record(row: &MySqlRow) -> Result<Record, DatabaseError> {
        let mut record = Record::new();

        for column in row.columns() {
            let index = column.ordinal();
            let type_name = column.type_info().name();

            let value: Value = match type_name {
                "BOOLEAN" => row
                    .try_get_unchecked::<Option<bool>, _>(index)?
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
                    .try_get_unchecked::<Option<i64>, _>(index)?
                    .map(|integer| Value::Number(integer.into()))
                    .unwrap_or(Value::Null),
                name if name.ends_with("UNSIGNED") => row
                    .try_get_unchecked::<Option<u64>, _>(index)?
                    .map(|integer| Value::Number(integer.into()))
                    .unwrap_or(Value::Null),
                "FLOAT" => row
                    .try_get_unchecked::<Option<f32>, _>(index)?
                    .and_then(|float| serde_json::Number::from_f64(float as f64))
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "DOUBLE" => row
                    .try_get_unchecked::<Option<f64>, _>(index)?
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "DECIMAL" => {
                    // Sent as text; keep the original digits if they don't fit an f64
                    let text: Option<String> = row.try_get_unchecked(index)?;
                    text.map(|text| {
                        text.parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or(Value::String(text))
                    })
                    .unwrap_or(Value::Null)
                }
                "DATE" => row
                    .try_get_unchecked::<Option<NaiveDate>, _>(index)?
                    .map(|date| Value::String(date.to_string()))
                    .unwrap_or(Value::Null),
                "DATETIME" => row
                    .try_get_unchecked::<Option<NaiveDateTime>, _>(index)?
                    .map(|datetime| Value::String(datetime.to_string()))
                    .unwrap_or(Value::Null),
                "TIMESTAMP" => row
                    .try_get_unchecked::<Option<DateTime<Utc>>, _>(index)?
                    .map(|timestamp| Value::String(timestamp.to_rfc3339()))
                    .unwrap_or(Value::Null),
                "TIME" => row
                    .try_get_unchecked::<Option<NaiveTime>, _>(index)
                    .ok()
                    .flatten()
                    .map(|time| Value::String(time.to_string()))
                    .unwrap_or(Value::Null),
                "JSON" => row
                    .try_get_unchecked::<Option<Value>, _>(index)?
                    .unwrap_or(Value::Null),
                "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
                    .try_get_unchecked::<Option<Vec<u8>>, _>(index)?
                    .map(|bytes| Value::String(format!("[BLOB: {} bytes]", bytes.len())))
                    .unwrap_or(Value::Null),
                _ => row
                    .try_get_unchecked::<Option<String>, _>(index)?
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            };

            record.insert(column.name().to_string(), value);
        }

        Ok(record)
    }

    fn outcome(result: &sqlx::mysql::MySqlQueryResult) -> ExecuteOutcome {
        let last_insert_id = result.last_insert_id();
        ExecuteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: (last_insert_id > 0).then_some(last_insert_id as i64),
        }
    }
}

#[async_trait]
impl DatabaseProvider for MySqlProvider {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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

        Ok(Self::outcome(&result))
    }

    async fn execute_atomic(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<ExecuteOutcome>, DatabaseError> {
        // MySQL commits DDL implicitly; only the DML part is truly rolled back
        let mut transaction = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(statements.len());

        for statement in statements {
            tracing::debug!(sql = %statement.sql, "execute in transaction");

            let result = Self::bind_params(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *transaction)
                .await;

            match result {
                Ok(result) => outcomes.push(Self::outcome(&result)),
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
        // information_schema columns may come back as binary strings; cast them
        let query = "SELECT CAST(table_name AS CHAR) AS name FROM information_schema.tables \
                     WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY table_name";

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(row.try_get_unchecked::<String, _>("name")?);
        }
        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        let query = "SELECT \
                CAST(column_name AS CHAR) AS name, \
                CAST(data_type AS CHAR) AS data_type, \
                CAST(is_nullable AS CHAR) AS is_nullable, \
                CAST(column_default AS CHAR) AS column_default, \
                CAST(character_maximum_length AS SIGNED) AS max_length, \
                CAST(column_key AS CHAR) AS column_key, \
                CAST(extra AS CHAR) AS extra \
            FROM information_schema.columns \
            WHERE table_schema = DATABASE() AND table_name = ? \
            ORDER BY ordinal_position";

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get_unchecked("name")?;
            let data_type: String = row.try_get_unchecked("data_type")?;
            let is_nullable: String = row.try_get_unchecked("is_nullable")?;
            let default_value: Option<String> = row.try_get_unchecked("column_default")?;
            let max_length: Option<i64> = row.try_get_unchecked("max_length")?;
            let column_key: Option<String> = row.try_get_unchecked("column_key")?;
            let extra: Option<String> = row.try_get_unchecked("extra")?;

            columns.push(ColumnDescriptor {
                name,
                data_type: data_type.to_ascii_lowercase(),
                nullable: is_nullable == "YES",
                is_primary_key: column_key.as_deref() == Some("PRI"),
                is_auto_increment: extra
                    .map(|extra| extra.to_ascii_lowercase().contains("auto_increment"))
                    .unwrap_or(false),
                max_length: max_length.and_then(|length| u64::try_from(length).ok()),
                default_value,
            });
        }

        Ok(columns)
    }

    async fn table_timestamps(&self, table: &str) -> Result<CatalogTimestamps, DatabaseError> {
        let query = "SELECT create_time AS created_at, update_time AS updated_at \
                     FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?";

        let row = sqlx::query(query)
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(CatalogTimestamps::default());
        };

        let created_at: Option<NaiveDateTime> = row.try_get_unchecked("created_at").ok().flatten();
        let updated_at: Option<NaiveDateTime> = row.try_get_unchecked("updated_at").ok().flatten();

        Ok(CatalogTimestamps {
            created_at: created_at.map(|datetime| datetime.and_utc()),
            updated_at: updated_at.map(|datetime| datetime.and_utc()),
        })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
