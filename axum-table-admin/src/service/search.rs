//! Search service
//!
//! Substring search over the textual columns of one table or of every
//! registered table. Global results are ranked with [`relevance_score`].

use serde_json::Value;

use crate::database::traits::DatabaseProvider;
use crate::schema::{ColumnDescriptor, Record, SearchHit, SearchResponse};
use crate::service::{existing_columns, SchemaRegistry};
use crate::sql::{SqlValue, Statement};
use crate::{Error, Result};

pub const DEFAULT_TABLE_LIMIT: usize = 50;
pub const DEFAULT_GLOBAL_LIMIT: usize = 100;

/// Matches taken from each table during a global search
const PER_TABLE_LIMIT: usize = 20;

pub struct SearchService<'a, DB: DatabaseProvider> {
    database: &'a DB,
}

impl<'a, DB: DatabaseProvider> SearchService<'a, DB> {
    pub fn new(database: &'a DB) -> Self {
        Self { database }
    }

    /// Rows of one table where any textual column contains `query`
    pub async fn search_table(
        &self,
        table: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse> {
        let query = require_query(query)?;
        let columns = existing_columns(self.database, table).await?;
        let limit = limit.unwrap_or(DEFAULT_TABLE_LIMIT);

        let results = self
            .matching_rows(table, &columns, query, limit)
            .await?
            .into_iter()
            .map(|row| hit(table, row))
            .collect();

        Ok(SearchResponse {
            results,
            total_found: None,
        })
    }

    /// Search every registered table and rank the matches
    ///
    /// A table that fails to search is logged and skipped.
    pub async fn search_global(&self, query: &str, limit: Option<usize>) -> Result<SearchResponse> {
        let query = require_query(query)?;
        let limit = limit.unwrap_or(DEFAULT_GLOBAL_LIMIT);
        let tables = SchemaRegistry::new(self.database).list_tables().await?;

        let mut scored: Vec<(f64, SearchHit)> = Vec::new();
        for table in tables {
            let rows = match self.search_one(&table.name, query).await {
                Ok(rows) => rows,
                Err(error) => {
                    tracing::warn!(table = %table.name, error = %error, "Skipping table in global search");
                    continue;
                }
            };
            for (columns, row) in rows {
                let score = relevance_score(&row, &columns, query);
                scored.push((score, hit(&table.name, row)));
            }
        }

        // Stable sort keeps table order for equal scores
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));
        let total_found = scored.len();
        let results = scored
            .into_iter()
            .take(limit)
            .map(|(_, hit)| hit)
            .collect();

        Ok(SearchResponse {
            results,
            total_found: Some(total_found),
        })
    }

    async fn search_one(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<(Vec<String>, Record)>> {
        let columns = existing_columns(self.database, table).await?;
        let searchable: Vec<String> = columns
            .iter()
            .filter(|column| column.is_searchable())
            .map(|column| column.name.clone())
            .collect();

        let rows = self
            .matching_rows(table, &columns, query, PER_TABLE_LIMIT)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (searchable.clone(), row))
            .collect())
    }

    async fn matching_rows(
        &self,
        table: &str,
        columns: &[ColumnDescriptor],
        query: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let dialect = self.database.dialect();
        let searchable: Vec<&ColumnDescriptor> =
            columns.iter().filter(|column| column.is_searchable()).collect();
        if searchable.is_empty() {
            return Ok(Vec::new());
        }

        let conditions: Vec<String> = searchable
            .iter()
            .map(|column| format!("{} LIKE ?", dialect.quote_identifier(&column.name)))
            .collect();
        let mut statement = Statement::new(format!(
            "SELECT * FROM {} WHERE {} LIMIT ?",
            dialect.quote_identifier(table),
            conditions.join(" OR ")
        ));

        let pattern = format!("%{}%", query);
        for _ in &searchable {
            statement = statement.bind(SqlValue::Text(pattern.clone()));
        }
        let statement = statement.bind(SqlValue::Integer(
            i64::try_from(limit).unwrap_or(i64::MAX),
        ));

        Ok(self.database.fetch_all(&statement).await?)
    }
}

fn require_query(query: &str) -> Result<&str> {
    if query.is_empty() {
        return Err(Error::Validation("Search query is required".to_string()));
    }
    Ok(query)
}

fn hit(table: &str, data: Record) -> SearchHit {
    SearchHit {
        table_name: table.to_string(),
        id: data.get("id").cloned().unwrap_or(Value::Null),
        data,
    }
}

/// Heuristic ranking of a row against a query
///
/// Per searchable column: exact match +100, prefix match +50, other substring
/// match +25, plus a tightness bonus of `max(1, 10 - (len - query_len) / 10)`
/// for any match. Comparisons are case-insensitive and lengths are counted
/// in characters.
pub fn relevance_score(row: &Record, searchable: &[String], query: &str) -> f64 {
    let query = query.to_lowercase();
    let query_length = query.chars().count() as f64;

    searchable
        .iter()
        .filter_map(|column| row.get(column))
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.to_lowercase()),
            other => Some(other.to_string().to_lowercase()),
        })
        .filter(|value| value.contains(&query))
        .map(|value| {
            let base = if value == query {
                100.0
            } else if value.starts_with(&query) {
                50.0
            } else {
                25.0
            };
            let excess = value.chars().count() as f64 - query_length;
            base + (10.0 - excess / 10.0).max(1.0)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    #[cfg(feature = "sqlite")]
    use crate::schema::{ColumnType, CreateTableRequest};
    #[cfg(feature = "sqlite")]
    use crate::test_support::{column, failing_service, id_column, memory_service, widgets_request};

    fn row(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => unreachable!(),
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_exact_match_scores_highest() {
        let searchable = columns(&["name"]);
        let exact = relevance_score(&row(json!({ "name": "Exact" })), &searchable, "exact");
        let prefix = relevance_score(&row(json!({ "name": "exactly" })), &searchable, "exact");
        let inner = relevance_score(&row(json!({ "name": "inexact" })), &searchable, "exact");

        assert_eq!(exact, 110.0);
        assert!((prefix - 59.8).abs() < 1e-9);
        assert!((inner - 34.8).abs() < 1e-9);
        assert!(exact > prefix && prefix > inner);
    }

    #[test]
    fn test_tightness_bonus_floors_at_one() {
        let searchable = columns(&["notes"]);
        let long = format!("{}bolt", "x".repeat(200));
        assert_eq!(relevance_score(&row(json!({ "notes": long })), &searchable, "bolt"), 26.0);

        let medium = format!("{}bolt", "x".repeat(25));
        assert_eq!(relevance_score(&row(json!({ "notes": medium })), &searchable, "bolt"), 32.5);
    }

    #[test]
    fn test_scores_accumulate_across_columns() {
        let searchable = columns(&["name", "description"]);
        let record = row(json!({ "name": "bolt", "description": "bolt", "id": 1 }));
        assert_eq!(relevance_score(&record, &searchable, "BOLT"), 220.0);
    }

    #[test]
    fn test_non_matching_and_null_columns_score_zero() {
        let searchable = columns(&["name", "notes"]);
        let record = row(json!({ "name": "nut", "notes": null }));
        assert_eq!(relevance_score(&record, &searchable, "bolt"), 0.0);
    }

    #[test]
    fn test_lengths_are_counted_in_characters() {
        let searchable = columns(&["name"]);
        let record = row(json!({ "name": "ÉCROU" }));
        assert_eq!(relevance_score(&record, &searchable, "écrou"), 110.0);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_search_table() {
        let service = memory_service().await;
        service.tables().create_table(widgets_request()).await.unwrap();
        for name in ["Bolt", "Big bolt", "Nut"] {
            service
                .rows()
                .create_row("widgets", json!({ "name": name }))
                .await
                .unwrap();
        }

        let response = service.search().search_table("widgets", "bolt", None).await.unwrap();
        assert_eq!(response.results.len(), 2);
        assert!(response.total_found.is_none());
        assert_eq!(response.results[0].table_name, "widgets");
        assert_eq!(response.results[0].id, json!(1));

        let limited = service
            .search()
            .search_table("widgets", "bolt", Some(1))
            .await
            .unwrap();
        assert_eq!(limited.results.len(), 1);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_search_requires_query() {
        let service = memory_service().await;
        service.tables().create_table(widgets_request()).await.unwrap();
        assert!(matches!(
            service.search().search_table("widgets", "", None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.search().search_global("", None).await,
            Err(Error::Validation(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_search_table_without_text_columns() {
        let service = memory_service().await;
        let request = CreateTableRequest {
            name: "counters".to_string(),
            display_name: None,
            columns: vec![id_column(), column("value", ColumnType::Int)],
        };
        service.tables().create_table(request).await.unwrap();
        service
            .rows()
            .create_row("counters", json!({ "value": 5 }))
            .await
            .unwrap();

        let response = service.search().search_table("counters", "5", None).await.unwrap();
        assert!(response.results.is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_global_search_ranks_exact_matches_first() {
        let service = memory_service().await;
        service.tables().create_table(widgets_request()).await.unwrap();
        let notes = CreateTableRequest {
            name: "notes".to_string(),
            display_name: Some("Notes".to_string()),
            columns: vec![id_column(), column("body", ColumnType::Text)],
        };
        service.tables().create_table(notes).await.unwrap();

        service
            .rows()
            .create_row("widgets", json!({ "name": "an exact fit" }))
            .await
            .unwrap();
        service
            .rows()
            .create_row("notes", json!({ "body": "exact" }))
            .await
            .unwrap();

        let response = service.search().search_global("exact", None).await.unwrap();
        assert_eq!(response.total_found, Some(2));
        assert_eq!(response.results[0].table_name, "notes");
        assert_eq!(response.results[1].table_name, "widgets");

        let value = serde_json::to_value(&response).unwrap();
        assert!(value["results"][0].get("score").is_none());
        assert!(value["results"][0]["data"].get("score").is_none());

        let truncated = service.search().search_global("exact", Some(1)).await.unwrap();
        assert_eq!(truncated.results.len(), 1);
        assert_eq!(truncated.total_found, Some(2));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_global_search_skips_failing_table() {
        let service = failing_service("notes").await;
        service.tables().create_table(widgets_request()).await.unwrap();
        let notes = CreateTableRequest {
            name: "notes".to_string(),
            display_name: None,
            columns: vec![id_column(), column("body", ColumnType::Text)],
        };
        service.tables().create_table(notes).await.unwrap();
        service
            .rows()
            .create_row("widgets", json!({ "name": "Bolt" }))
            .await
            .unwrap();

        assert!(service.search().search_table("notes", "bolt", None).await.is_err());

        let response = service.search().search_global("bolt", None).await.unwrap();
        assert_eq!(response.total_found, Some(1));
        assert_eq!(response.results[0].table_name, "widgets");
        assert_eq!(response.results[0].data["name"], json!("Bolt"));
    }
}
