//! Report service
//!
//! Table statistics, single-table ad-hoc reports and full table exports.

use chrono::Utc;

use crate::database::traits::DatabaseProvider;
use crate::sanitize::validate_identifier;
use crate::schema::{
    ColumnDescriptor, ColumnStats, GlobalStats, Report, ReportRequest, SortOrder, TableInfo,
    TableStats, TableSummary,
};
use crate::service::export::{ExportFile, ExportFormat};
use crate::service::{count_from, existing_columns, require_column, SchemaRegistry};
use crate::sql::{self, SqlValue, Statement};
use crate::{Error, Result};

/// Hard cap on rows returned by a report
pub const REPORT_ROW_LIMIT: u32 = 1000;

const FILTER_OPERATORS: [&str; 9] = ["=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE"];

pub struct ReportService<'a, DB: DatabaseProvider> {
    database: &'a DB,
}

impl<'a, DB: DatabaseProvider> ReportService<'a, DB> {
    pub fn new(database: &'a DB) -> Self {
        Self { database }
    }

    /// Row count, per-column null counts and catalog timestamps of one table
    pub async fn table_stats(&self, table: &str) -> Result<TableStats> {
        let columns = existing_columns(self.database, table).await?;
        let dialect = self.database.dialect();

        let total_rows = self.count(&sql::count_rows(dialect, table)).await?;

        let mut column_stats = Vec::with_capacity(columns.len());
        for column in &columns {
            let null_count = self
                .count(&sql::count_nulls(dialect, table, &column.name))
                .await?;
            column_stats.push(ColumnStats {
                name: column.name.clone(),
                data_type: column.data_type.clone(),
                nullable: column.nullable,
                null_count,
            });
        }

        let timestamps = self.database.table_timestamps(table).await?;
        let now = Utc::now();

        Ok(TableStats {
            table_info: TableInfo {
                name: table.to_string(),
                created_at: timestamps.created_at.unwrap_or(now),
                updated_at: timestamps.updated_at.unwrap_or(now),
            },
            total_rows,
            total_columns: columns.len(),
            column_stats,
        })
    }

    /// Row and column totals over every registered table
    ///
    /// Tables that cannot be inspected are logged and left out.
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let tables = SchemaRegistry::new(self.database).list_tables().await?;

        let mut summaries = Vec::with_capacity(tables.len());
        for table in tables {
            match self.summary(&table.name).await {
                Ok(summary) => summaries.push(summary),
                Err(error) => {
                    tracing::warn!(table = %table.name, error = %error, "Skipping table in global stats");
                }
            }
        }

        Ok(GlobalStats {
            total_rows: summaries.iter().map(|summary| summary.row_count).sum(),
            total_columns: summaries.iter().map(|summary| summary.column_count).sum(),
            table_count: summaries.len(),
            tables: summaries,
        })
    }

    /// Run a filtered, projected, grouped and ordered query on one table
    ///
    /// Only the first listed table is used. At most [`REPORT_ROW_LIMIT`]
    /// rows are returned.
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<Report> {
        let table = request
            .tables
            .first()
            .ok_or_else(|| Error::Validation("At least one table is required".to_string()))?;
        let columns = existing_columns(self.database, table).await?;
        let dialect = self.database.dialect();

        let projection = if request.columns.is_empty() {
            "*".to_string()
        } else {
            request
                .columns
                .iter()
                .map(|column| {
                    check_column(&columns, column)?;
                    Ok(dialect.quote_identifier(column))
                })
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            projection,
            dialect.quote_identifier(table)
        );
        let mut params = Vec::with_capacity(request.filters.len());

        if !request.filters.is_empty() {
            let mut conditions = Vec::with_capacity(request.filters.len());
            for filter in &request.filters {
                check_column(&columns, &filter.column)?;
                let operator = normalize_operator(filter.operator.as_deref())?;
                conditions.push(format!(
                    "{} {} ?",
                    dialect.quote_identifier(&filter.column),
                    operator
                ));
                params.push(SqlValue::from_json(&filter.value));
            }
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !request.group_by.is_empty() {
            let group_by = request
                .group_by
                .iter()
                .map(|column| {
                    check_column(&columns, column)?;
                    Ok(dialect.quote_identifier(column))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }

        if !request.order_by.is_empty() {
            let order_by = request
                .order_by
                .iter()
                .map(|order| {
                    check_column(&columns, &order.column)?;
                    let direction = order.direction.unwrap_or(SortOrder::Ascending);
                    Ok(format!(
                        "{} {}",
                        dialect.quote_identifier(&order.column),
                        direction.as_sql()
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }

        sql.push_str(&format!(" LIMIT {}", REPORT_ROW_LIMIT));

        let mut statement = Statement::new(sql);
        statement.params = params;
        let data = self.database.fetch_all(&statement).await?;

        Ok(Report {
            sql: statement.display_sql(),
            row_count: data.len(),
            data,
        })
    }

    /// Serialise every row of a table; no row cap applies
    pub async fn export_table(&self, table: &str, format: ExportFormat) -> Result<ExportFile> {
        let columns = existing_columns(self.database, table).await?;
        let rows = self
            .database
            .fetch_all(&sql::select_all(self.database.dialect(), table))
            .await?;

        let headers: Vec<String> = columns.into_iter().map(|column| column.name).collect();
        let file = ExportFile::build(table, format, &headers, &rows)?;

        tracing::debug!(table = %table, format = %format, rows = rows.len(), "Table exported");
        Ok(file)
    }

    async fn summary(&self, table: &str) -> Result<TableSummary> {
        let columns = existing_columns(self.database, table).await?;
        let row_count = self
            .count(&sql::count_rows(self.database.dialect(), table))
            .await?;

        Ok(TableSummary {
            name: table.to_string(),
            row_count,
            column_count: columns.len(),
        })
    }

    async fn count(&self, statement: &Statement) -> Result<u64> {
        let records = self.database.fetch_all(statement).await?;
        Ok(count_from(&records))
    }
}

fn check_column(columns: &[ColumnDescriptor], name: &str) -> Result<()> {
    validate_identifier("Column", name)?;
    require_column(columns, name)?;
    Ok(())
}

fn normalize_operator(operator: Option<&str>) -> Result<&'static str> {
    let operator = operator
        .map(|operator| {
            operator
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_uppercase()
        })
        .unwrap_or_else(|| "=".to_string());

    FILTER_OPERATORS
        .iter()
        .find(|allowed| **allowed == operator)
        .copied()
        .ok_or_else(|| Error::Validation(format!("Unsupported operator '{}'", operator)))
}
