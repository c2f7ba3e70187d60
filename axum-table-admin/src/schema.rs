//! Schema types for dynamic table management
//!
//! These types describe registered tables, their introspected columns, and
//! the request/response payloads of the admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row as an open-ended column name -> value mapping
pub type Record = serde_json::Map<String, Value>;

/// Column types accepted when creating or altering tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Varchar,
    Text,
    #[serde(alias = "integer")]
    Int,
    Bigint,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    Datetime,
    Timestamp,
    Time,
    Year,
    Char,
}

impl ColumnType {
    /// SQL keyword used in column definitions
    pub fn sql_keyword(self) -> &'static str {
        match self {
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Int => "INT",
            ColumnType::Bigint => "BIGINT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Year => "YEAR",
            ColumnType::Char => "CHAR",
        }
    }

    /// Map a catalog type name (e.g. `varchar`, `INTEGER`) back to a column type
    pub fn from_catalog_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "varchar" => Some(ColumnType::Varchar),
            "text" => Some(ColumnType::Text),
            "int" | "integer" => Some(ColumnType::Int),
            "bigint" => Some(ColumnType::Bigint),
            "decimal" => Some(ColumnType::Decimal),
            "float" => Some(ColumnType::Float),
            "double" => Some(ColumnType::Double),
            "boolean" | "bool" => Some(ColumnType::Boolean),
            "date" => Some(ColumnType::Date),
            "datetime" => Some(ColumnType::Datetime),
            "timestamp" => Some(ColumnType::Timestamp),
            "time" => Some(ColumnType::Time),
            "year" => Some(ColumnType::Year),
            "char" => Some(ColumnType::Char),
            _ => None,
        }
    }
}

/// Column definition supplied when creating a table or adding a column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub data_type: ColumnType,

    /// Optional length / precision (1-65535)
    #[serde(default)]
    pub length: Option<u32>,

    /// Whether NULL is allowed
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// Creation only
    #[serde(default)]
    pub primary_key: bool,

    /// Creation only
    #[serde(default)]
    pub auto_increment: bool,

    /// Default value (string, number or boolean)
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_nullable() -> bool {
    true
}

/// Metadata about a registered table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    /// Logical (and physical) table name
    pub name: String,

    /// Human readable name
    pub display_name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Row count, if it could be determined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// Information about a single column, derived from the physical catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Lower-case base type as reported by the catalog (e.g. "varchar")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,

    /// Whether values are generated by the database
    pub is_auto_increment: bool,

    /// Maximum character length for textual columns
    pub max_length: Option<u64>,

    /// Default value expression (if any)
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// The declared type, when it is one of the supported column types
    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::from_catalog_name(&self.data_type)
    }

    /// Textual columns take part in substring search
    pub fn is_searchable(&self) -> bool {
        matches!(
            self.data_type.as_str(),
            "varchar" | "text" | "char" | "tinytext" | "mediumtext" | "longtext"
        )
    }
}

/// Creation and modification times reported by the catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogTimestamps {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for POST /tables
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    /// Logical table name
    pub name: String,

    /// Display name (defaults to the logical name)
    pub display_name: Option<String>,

    /// Column definitions
    pub columns: Vec<ColumnSpec>,
}

/// Request body for PUT /tables/:name
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "column", rename_all = "snake_case")]
pub enum AlterTableRequest {
    /// Add a new column
    AddColumn(ColumnSpec),

    /// Drop a column by name
    DeleteColumn(String),

    /// Redefine an existing column
    ModifyColumn(ColumnSpec),
}

/// Response for GET /tables/:name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnsResponse {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// Generic confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: None,
        }
    }
}

/// Query parameters for listing rows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowQuery {
    /// Maximum number of rows to return
    #[serde(default = "default_row_limit")]
    pub limit: u64,

    /// Starting offset for pagination
    #[serde(default)]
    pub offset: u64,

    /// Column name to sort by
    pub sort_by: Option<String>,

    /// Sort order
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for RowQuery {
    fn default() -> Self {
        Self {
            limit: default_row_limit(),
            offset: 0,
            sort_by: None,
            sort_order: SortOrder::Ascending,
        }
    }
}

fn default_row_limit() -> u64 {
    1000
}

/// Sort order for row queries and reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC", alias = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "DESC", alias = "desc", alias = "descending")]
    Descending,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Response containing table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    /// The rows returned
    pub rows: Vec<Record>,

    /// Column metadata of the table
    pub columns: Vec<ColumnDescriptor>,
}

/// Request body for DELETE /data/:table/bulk
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<Value>,
}

/// Query parameters for search endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// A single search match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub table_name: String,
    pub id: Value,
    pub data: Record,
}

/// Response for search endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,

    /// Matches found before truncation (global search only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_found: Option<usize>,
}

/// Catalog information of a single table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub null_count: u64,
}

/// Response for GET /reports/stats/:table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub table_info: TableInfo,
    pub total_rows: u64,
    pub total_columns: usize,
    pub column_stats: Vec<ColumnStats>,
}

/// Row and column counts of one table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub name: String,
    pub row_count: u64,
    pub column_count: usize,
}

/// Response for GET /reports/stats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_rows: u64,
    pub total_columns: usize,
    pub table_count: usize,
    pub tables: Vec<TableSummary>,
}

/// Request body for POST /reports/generate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<ReportOrder>,
}

/// A `column operator value` condition
#[derive(Debug, Clone, Deserialize)]
pub struct ReportFilter {
    pub column: String,
    /// Defaults to `=`
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// An ORDER BY entry
#[derive(Debug, Clone, Deserialize)]
pub struct ReportOrder {
    pub column: String,
    pub direction: Option<SortOrder>,
}

/// Generated report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Executed SQL with bound values substituted, for display only
    pub sql: String,
    pub row_count: usize,
    pub data: Vec<Record>,
}

/// Response for POST /reports/generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Report,
}

/// Query parameters for GET /reports/export/:table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_spec_defaults() {
        let spec: ColumnSpec = serde_json::from_value(json!({
            "name": "title",
            "type": "varchar",
            "length": 50
        }))
        .unwrap();

        assert_eq!(spec.data_type, ColumnType::Varchar);
        assert_eq!(spec.length, Some(50));
        assert!(spec.nullable);
        assert!(!spec.primary_key);
        assert!(!spec.auto_increment);
        assert!(spec.default.is_none());
    }

    #[test]
    fn test_column_type_accepts_integer_alias() {
        let spec: ColumnSpec =
            serde_json::from_value(json!({ "name": "id", "type": "integer" })).unwrap();
        assert_eq!(spec.data_type, ColumnType::Int);

        let invalid = serde_json::from_value::<ColumnSpec>(json!({ "name": "id", "type": "blob" }));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_alter_table_request_shapes() {
        let add: AlterTableRequest = serde_json::from_value(json!({
            "action": "add_column",
            "column": { "name": "price", "type": "decimal" }
        }))
        .unwrap();
        assert!(matches!(add, AlterTableRequest::AddColumn(ref spec) if spec.name == "price"));

        let delete: AlterTableRequest = serde_json::from_value(json!({
            "action": "delete_column",
            "column": "price"
        }))
        .unwrap();
        assert!(matches!(delete, AlterTableRequest::DeleteColumn(ref name) if name == "price"));

        let unknown = serde_json::from_value::<AlterTableRequest>(json!({
            "action": "rename_table",
            "column": "x"
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_sort_order_aliases() {
        let query: RowQuery = serde_json::from_value(json!({ "sortOrder": "desc" })).unwrap();
        assert_eq!(query.sort_order, SortOrder::Descending);
        assert_eq!(query.limit, 1000);
        assert_eq!(query.offset, 0);

        let query: RowQuery = serde_json::from_value(json!({ "sortOrder": "ASC" })).unwrap();
        assert_eq!(query.sort_order.as_sql(), "ASC");
    }

    #[test]
    fn test_column_descriptor_searchable() {
        let mut column = ColumnDescriptor {
            name: "name".to_string(),
            data_type: "varchar".to_string(),
            nullable: false,
            is_primary_key: false,
            is_auto_increment: false,
            max_length: Some(50),
            default_value: None,
        };
        assert!(column.is_searchable());
        assert_eq!(column.column_type(), Some(ColumnType::Varchar));

        column.data_type = "decimal".to_string();
        assert!(!column.is_searchable());
    }
}
