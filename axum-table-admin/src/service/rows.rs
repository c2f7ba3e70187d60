//! Row service
//!
//! Generic CRUD against any existing table. Column names coming from the
//! caller are checked against the introspected column set before they are
//! used as identifiers; values are always bound.

use serde_json::Value;

use crate::database::traits::DatabaseProvider;
use crate::sanitize::validate_identifier;
use crate::schema::{ColumnDescriptor, Record, RowQuery, RowsResponse};
use crate::service::{existing_columns, require_column};
use crate::sql::{self, SqlValue, Statement};
use crate::{Error, Result};

const ID_COLUMN: &str = "id";

pub struct RowService<'a, DB: DatabaseProvider> {
    database: &'a DB,
}

impl<'a, DB: DatabaseProvider> RowService<'a, DB> {
    pub fn new(database: &'a DB) -> Self {
        Self { database }
    }

    /// Fetch a page of rows plus the table's column metadata
    pub async fn list_rows(&self, table: &str, query: &RowQuery) -> Result<RowsResponse> {
        let columns = existing_columns(self.database, table).await?;
        let dialect = self.database.dialect();

        let mut sql = sql::select_all(dialect, table).sql;
        if let Some(sort_by) = query.sort_by.as_deref().filter(|column| !column.is_empty()) {
            validate_identifier("Column", sort_by)?;
            require_column(&columns, sort_by)?;
            sql.push_str(&format!(
                " ORDER BY {} {}",
                dialect.quote_identifier(sort_by),
                query.sort_order.as_sql()
            ));
        }
        sql.push_str(" LIMIT ? OFFSET ?");

        let statement = Statement::new(sql)
            .bind(SqlValue::Integer(clamp_to_i64(query.limit)))
            .bind(SqlValue::Integer(clamp_to_i64(query.offset)));
        let rows = self.database.fetch_all(&statement).await?;

        Ok(RowsResponse { rows, columns })
    }

    /// Fetch a single row by id
    pub async fn get_row(&self, table: &str, id: &str) -> Result<Record> {
        existing_columns(self.database, table).await?;
        self.find_row(table, SqlValue::from_id(id))
            .await?
            .ok_or_else(|| row_not_found(table, id))
    }

    /// Insert a row and return it as stored
    ///
    /// `id` as well as null and empty-string fields are dropped so that the
    /// database assigns keys and defaults.
    pub async fn create_row(&self, table: &str, payload: Value) -> Result<Record> {
        let columns = existing_columns(self.database, table).await?;

        let mut fields = into_record(payload)?;
        fields.remove(ID_COLUMN);
        fields.retain(|_, value| !is_blank(value));
        check_fields(&columns, &fields)?;

        let dialect = self.database.dialect();
        let outcome = self
            .database
            .execute(&sql::insert(dialect, table, &fields))
            .await?;

        let has_id = columns.iter().any(|column| column.name == ID_COLUMN);
        match outcome.last_insert_id.filter(|id| *id > 0) {
            Some(id) if has_id => Ok(self
                .find_row(table, SqlValue::Integer(id))
                .await?
                .unwrap_or(fields)),
            _ => Ok(fields),
        }
    }

    /// Update the given fields of one row and return it
    pub async fn update_row(&self, table: &str, id: &str, payload: Value) -> Result<Record> {
        let columns = existing_columns(self.database, table).await?;

        let mut fields = into_record(payload)?;
        fields.remove(ID_COLUMN);
        if fields.is_empty() {
            return Err(Error::Validation("No fields to update".to_string()));
        }
        check_fields(&columns, &fields)?;

        let dialect = self.database.dialect();
        self.database
            .execute(&sql::update_by_id(dialect, table, &fields, SqlValue::from_id(id)))
            .await?;

        self.find_row(table, SqlValue::from_id(id))
            .await?
            .ok_or_else(|| row_not_found(table, id))
    }

    /// Update several rows in one transaction, returning how many were applied
    ///
    /// Records without an `id`, or with nothing besides it, are skipped.
    pub async fn bulk_update_rows(&self, table: &str, records: Vec<Value>) -> Result<usize> {
        let columns = existing_columns(self.database, table).await?;
        let dialect = self.database.dialect();

        let mut statements = Vec::with_capacity(records.len());
        for record in records {
            let mut fields = into_record(record)?;
            let id = match fields.remove(ID_COLUMN) {
                Some(Value::Null) | None => continue,
                Some(id) => SqlValue::from_json(&id),
            };
            if fields.is_empty() {
                continue;
            }
            check_fields(&columns, &fields)?;
            statements.push(sql::update_by_id(dialect, table, &fields, id));
        }

        if statements.is_empty() {
            return Ok(0);
        }

        self.database.execute_atomic(&statements).await?;
        tracing::debug!(table = %table, count = statements.len(), "Bulk update applied");
        Ok(statements.len())
    }

    /// Delete one row by id
    pub async fn delete_row(&self, table: &str, id: &str) -> Result<()> {
        existing_columns(self.database, table).await?;

        let dialect = self.database.dialect();
        let outcome = self
            .database
            .execute(&sql::delete_by_id(dialect, table, SqlValue::from_id(id)))
            .await?;

        if outcome.rows_affected == 0 {
            return Err(row_not_found(table, id));
        }
        Ok(())
    }

    /// Delete all rows whose id is listed, returning the number removed
    pub async fn bulk_delete_rows(&self, table: &str, ids: &[Value]) -> Result<u64> {
        existing_columns(self.database, table).await?;

        if ids.is_empty() {
            return Err(Error::Validation("ids must be a non-empty array".to_string()));
        }
        if ids.iter().any(|id| matches!(id, Value::Array(_) | Value::Object(_))) {
            return Err(Error::Validation(
                "ids must be strings or numbers".to_string(),
            ));
        }

        let dialect = self.database.dialect();
        let ids = ids.iter().map(SqlValue::from_json).collect();
        let outcome = self
            .database
            .execute(&sql::delete_by_ids(dialect, table, ids))
            .await?;

        Ok(outcome.rows_affected)
    }

    async fn find_row(&self, table: &str, id: SqlValue) -> Result<Option<Record>> {
        let dialect = self.database.dialect();
        let mut records = self
            .database
            .fetch_all(&sql::select_by_id(dialect, table, id))
            .await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }
}

fn into_record(payload: Value) -> Result<Record> {
    match payload {
        Value::Object(record) => Ok(record),
        _ => Err(Error::Validation(
            "Row payload must be a JSON object".to_string(),
        )),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn check_fields(columns: &[ColumnDescriptor], fields: &Record) -> Result<()> {
    for name in fields.keys() {
        validate_identifier("Column", name)?;
        require_column(columns, name)?;
    }
    Ok(())
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn row_not_found(table: &str, id: &str) -> Error {
    Error::NotFound(format!("Row '{}' not found in table '{}'", id, table))
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::schema::{AlterTableRequest, ColumnSpec, ColumnType, CreateTableRequest, SortOrder};
    use crate::test_support::{column, id_column, memory_service, widgets_request};
    use serde_json::json;

    async fn widgets_service() -> crate::DataService<crate::SqliteProvider> {
        let service = memory_service().await;
        service.tables().create_table(widgets_request()).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_widgets_scenario() {
        let service = widgets_service().await;
        let rows = service.rows();

        let created = rows
            .create_row("widgets", json!({ "name": "Bolt", "price": 1.50 }))
            .await
            .unwrap();
        assert_eq!(Value::Object(created), json!({ "id": 1, "name": "Bolt", "price": 1.5 }));

        service
            .tables()
            .alter_table("widgets", AlterTableRequest::DeleteColumn("price".to_string()))
            .await
            .unwrap();

        let listed = rows.list_rows("widgets", &RowQuery::default()).await.unwrap();
        assert_eq!(listed.rows.len(), 1);
        assert_eq!(Value::Object(listed.rows[0].clone()), json!({ "id": 1, "name": "Bolt" }));
        assert!(listed.columns.iter().all(|column| column.name != "price"));
    }

    #[tokio::test]
    async fn test_create_row_strips_id_and_blank_fields() {
        let service = widgets_service().await;

        let created = service
            .rows()
            .create_row("widgets", json!({ "id": 99, "name": "Nut", "price": "" }))
            .await
            .unwrap();
        assert_eq!(created.get("id"), Some(&json!(1)));
        assert_eq!(created.get("price"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_create_row_leaves_omitted_columns_at_defaults() {
        let service = memory_service().await;
        let orders = CreateTableRequest {
            name: "orders".to_string(),
            display_name: None,
            columns: vec![
                id_column(),
                column("name", ColumnType::Varchar),
                ColumnSpec {
                    length: Some(20),
                    default: Some(json!("pending")),
                    ..column("status", ColumnType::Varchar)
                },
                ColumnSpec {
                    default: Some(json!(7)),
                    ..column("qty", ColumnType::Int)
                },
            ],
        };
        service.tables().create_table(orders).await.unwrap();

        let created = service
            .rows()
            .create_row("orders", json!({ "name": "a", "status": "" }))
            .await
            .unwrap();
        assert_eq!(
            Value::Object(created),
            json!({ "id": 1, "name": "a", "status": "pending", "qty": 7 })
        );
    }

    #[tokio::test]
    async fn test_create_row_rejects_unknown_column() {
        let service = widgets_service().await;
        let result = service
            .rows()
            .create_row("widgets", json!({ "name": "Nut", "weight": 3 }))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_row_not_null_is_constraint_violation() {
        let service = widgets_service().await;
        let result = service
            .rows()
            .create_row("widgets", json!({ "price": 2 }))
            .await;
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_list_rows_sorting_and_paging() {
        let service = widgets_service().await;
        for name in ["b", "c", "a"] {
            service
                .rows()
                .create_row("widgets", json!({ "name": name }))
                .await
                .unwrap();
        }

        let query = RowQuery {
            limit: 2,
            offset: 0,
            sort_by: Some("name".to_string()),
            sort_order: SortOrder::Descending,
        };
        let page = service.rows().list_rows("widgets", &query).await.unwrap();
        let names: Vec<_> = page.rows.iter().map(|row| row["name"].clone()).collect();
        assert_eq!(names, vec![json!("c"), json!("b")]);

        let query = RowQuery {
            offset: 2,
            ..query
        };
        let page = service.rows().list_rows("widgets", &query).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0]["name"], json!("a"));
    }

    #[tokio::test]
    async fn test_list_rows_rejects_unknown_sort_column() {
        let service = widgets_service().await;
        let query = RowQuery {
            sort_by: Some("name; DROP TABLE widgets".to_string()),
            ..RowQuery::default()
        };
        let result = service.rows().list_rows("widgets", &query).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_row() {
        let service = widgets_service().await;
        service
            .rows()
            .create_row("widgets", json!({ "name": "Bolt" }))
            .await
            .unwrap();

        let updated = service
            .rows()
            .update_row("widgets", "1", json!({ "id": 5, "price": 3 }))
            .await
            .unwrap();
        assert_eq!(updated["id"], json!(1));
        assert_eq!(updated["price"], json!(3));

        let empty = service.rows().update_row("widgets", "1", json!({ "id": 1 })).await;
        assert!(matches!(empty, Err(Error::Validation(_))));

        let missing = service
            .rows()
            .update_row("widgets", "42", json!({ "name": "Gone" }))
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_update_is_atomic() {
        let service = widgets_service().await;
        for index in 1..=5 {
            service
                .rows()
                .create_row("widgets", json!({ "name": format!("w{}", index) }))
                .await
                .unwrap();
        }

        let records = vec![
            json!({ "id": 1, "name": "x1" }),
            json!({ "id": 2, "name": "x2" }),
            json!({ "id": 3, "name": null }),
            json!({ "id": 4, "name": "x4" }),
            json!({ "id": 5, "name": "x5" }),
        ];
        let result = service.rows().bulk_update_rows("widgets", records).await;
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));

        let listed = service
            .rows()
            .list_rows("widgets", &RowQuery::default())
            .await
            .unwrap();
        for (index, row) in listed.rows.iter().enumerate() {
            assert_eq!(row["name"], json!(format!("w{}", index + 1)));
        }
    }

    #[tokio::test]
    async fn test_bulk_update_skips_records_without_id() {
        let service = widgets_service().await;
        service
            .rows()
            .create_row("widgets", json!({ "name": "Bolt" }))
            .await
            .unwrap();

        let records = vec![
            json!({ "name": "no id" }),
            json!({ "id": 1 }),
            json!({ "id": 1, "name": "Screw" }),
        ];
        let applied = service.rows().bulk_update_rows("widgets", records).await.unwrap();
        assert_eq!(applied, 1);

        let row = service.rows().get_row("widgets", "1").await.unwrap();
        assert_eq!(row["name"], json!("Screw"));
    }

    #[tokio::test]
    async fn test_delete_rows() {
        let service = widgets_service().await;
        for name in ["a", "b", "c"] {
            service
                .rows()
                .create_row("widgets", json!({ "name": name }))
                .await
                .unwrap();
        }

        service.rows().delete_row("widgets", "1").await.unwrap();
        assert!(matches!(
            service.rows().delete_row("widgets", "1").await,
            Err(Error::NotFound(_))
        ));

        let removed = service
            .rows()
            .bulk_delete_rows("widgets", &[json!(2), json!("3"), json!(7)])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        assert!(matches!(
            service.rows().bulk_delete_rows("widgets", &[]).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rows_of_missing_table() {
        let service = memory_service().await;
        let result = service.rows().list_rows("ghost", &RowQuery::default()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
