//! Schema registry
//!
//! Maps logical table names to display names and timestamps. The physical
//! catalog decides whether a table exists; registry rows without a matching
//! table are stale and filtered out when listing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::sanitize::REGISTRY_TABLE;
use crate::schema::{Record, TableDescriptor};
use crate::service::count_from;
use crate::sql::{self, SqlValue, Statement};
use crate::{Error, Result};

pub struct SchemaRegistry<'a, DB: DatabaseProvider> {
    database: &'a DB,
}

impl<'a, DB: DatabaseProvider> SchemaRegistry<'a, DB> {
    pub fn new(database: &'a DB) -> Self {
        Self { database }
    }

    fn table(&self) -> String {
        self.database.dialect().quote_identifier(REGISTRY_TABLE)
    }

    pub async fn initialize(&self) -> Result<()> {
        let ddl = self.database.dialect().registry_table_ddl();
        self.database.execute(&Statement::new(ddl)).await?;
        Ok(())
    }

    /// Registered tables that physically exist, newest first
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let statement = Statement::new(format!(
            "SELECT table_name, display_name, created_at, updated_at FROM {} ORDER BY created_at DESC",
            self.table()
        ));
        let records = self.database.fetch_all(&statement).await?;

        let physical: HashSet<String> = self
            .database
            .list_physical_tables()
            .await?
            .into_iter()
            .collect();

        let mut tables: Vec<TableDescriptor> = records
            .iter()
            .filter_map(descriptor_from_record)
            .filter(|descriptor| physical.contains(&descriptor.name))
            .collect();
        tables.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        for table in &mut tables {
            let count = sql::count_rows(self.database.dialect(), &table.name);
            table.row_count = self
                .database
                .fetch_all(&count)
                .await
                .ok()
                .map(|records| count_from(&records));
        }

        Ok(tables)
    }

    /// Descriptor of one table, whether or not the physical table exists
    pub async fn descriptor(&self, name: &str) -> Result<Option<TableDescriptor>> {
        let statement = Statement::new(format!(
            "SELECT table_name, display_name, created_at, updated_at FROM {} WHERE table_name = ?",
            self.table()
        ))
        .bind(SqlValue::Text(name.to_string()));

        let records = self.database.fetch_all(&statement).await?;
        Ok(records.first().and_then(descriptor_from_record))
    }

    pub(crate) fn register_statement(&self, name: &str, display_name: &str) -> Statement {
        let now = Utc::now();
        Statement::new(format!(
            "INSERT INTO {} (table_name, display_name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            self.table()
        ))
        .bind(SqlValue::Text(name.to_string()))
        .bind(SqlValue::Text(display_name.to_string()))
        .bind(SqlValue::Timestamp(now))
        .bind(SqlValue::Timestamp(now))
    }

    pub(crate) fn touch_statement(&self, name: &str) -> Statement {
        Statement::new(format!(
            "UPDATE {} SET updated_at = ? WHERE table_name = ?",
            self.table()
        ))
        .bind(SqlValue::Timestamp(Utc::now()))
        .bind(SqlValue::Text(name.to_string()))
    }

    pub(crate) fn unregister_statement(&self, name: &str) -> Statement {
        Statement::new(format!("DELETE FROM {} WHERE table_name = ?", self.table()))
            .bind(SqlValue::Text(name.to_string()))
    }

    /// Insert a descriptor; fails with `DuplicateTable` if already registered
    pub async fn register_table(&self, name: &str, display_name: &str) -> Result<()> {
        match self
            .database
            .execute(&self.register_statement(name, display_name))
            .await
        {
            Ok(_) => Ok(()),
            Err(DatabaseError::ConstraintViolation(_)) => {
                Err(Error::DuplicateTable(name.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Set `updated_at` to now
    pub async fn touch_table(&self, name: &str) -> Result<()> {
        self.database.execute(&self.touch_statement(name)).await?;
        Ok(())
    }

    /// Remove a descriptor; absent names are not an error
    pub async fn unregister_table(&self, name: &str) -> Result<()> {
        self.database
            .execute(&self.unregister_statement(name))
            .await?;
        Ok(())
    }
}

fn descriptor_from_record(record: &Record) -> Option<TableDescriptor> {
    let name = record.get("table_name")?.as_str()?.to_string();
    let display_name = record
        .get("display_name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    Some(TableDescriptor {
        display_name,
        created_at: parse_timestamp(record.get("created_at")),
        updated_at: parse_timestamp(record.get("updated_at")),
        name,
        row_count: None,
    })
}

fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::test_support::memory_service;

    #[tokio::test]
    async fn test_register_and_unregister() {
        let service = memory_service().await;
        let registry = service.registry();

        registry.register_table("orders", "Orders").await.unwrap();
        let descriptor = registry.descriptor("orders").await.unwrap().unwrap();
        assert_eq!(descriptor.display_name, "Orders");
        assert_eq!(descriptor.created_at, descriptor.updated_at);

        registry.unregister_table("orders").await.unwrap();
        assert!(registry.descriptor("orders").await.unwrap().is_none());

        // idempotent
        registry.unregister_table("orders").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let service = memory_service().await;
        let registry = service.registry();

        registry.register_table("orders", "Orders").await.unwrap();
        let result = registry.register_table("orders", "Again").await;
        assert!(matches!(result, Err(Error::DuplicateTable(name)) if name == "orders"));
    }

    #[tokio::test]
    async fn test_touch_updates_timestamp() {
        let service = memory_service().await;
        let registry = service.registry();

        registry.register_table("orders", "Orders").await.unwrap();
        let before = registry.descriptor("orders").await.unwrap().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.touch_table("orders").await.unwrap();
        let after = registry.descriptor("orders").await.unwrap().unwrap();

        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_list_tables_skips_stale_descriptors() {
        let service = memory_service().await;
        let registry = service.registry();

        service
            .database()
            .execute(&Statement::new("CREATE TABLE live (id INTEGER PRIMARY KEY)"))
            .await
            .unwrap();
        service
            .database()
            .execute(&Statement::new("CREATE TABLE unregistered (id INTEGER PRIMARY KEY)"))
            .await
            .unwrap();
        registry.register_table("live", "Live").await.unwrap();
        registry.register_table("ghost", "Ghost").await.unwrap();

        let tables = registry.list_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "live");
        assert_eq!(tables[0].row_count, Some(0));
    }

    #[test]
    fn test_parse_timestamp() {
        let value = Value::String("2026-01-02T03:04:05.000006Z".to_string());
        let parsed = parse_timestamp(Some(&value));
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T03:04:05.000006+00:00");
    }
}
