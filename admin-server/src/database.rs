//! Pool construction and optional sample data

use std::str::FromStr;

use axum_table_admin::schema::{ColumnSpec, ColumnType, CreateTableRequest};
use axum_table_admin::{DataService, DatabaseProvider};
use serde_json::json;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{MySqlPool, SqlitePool};

const SAMPLE_TABLE: &str = "products";

/// Open a SQLite pool, creating the database file and its directory if needed
pub async fn connect_sqlite(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    let filename = options.get_filename();
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn connect_mysql(url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

fn column(name: &str, data_type: ColumnType) -> ColumnSpec {
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

/// Create and fill the `products` sample table unless it already exists
pub async fn seed_sample_data<DB: DatabaseProvider>(
    service: &DataService<DB>,
) -> Result<(), axum_table_admin::Error> {
    if service.registry().descriptor(SAMPLE_TABLE).await?.is_some() {
        tracing::debug!("Sample table already present, skipping seed");
        return Ok(());
    }

    let request = CreateTableRequest {
        name: SAMPLE_TABLE.to_string(),
        display_name: Some("Products".to_string()),
        columns: vec![
            ColumnSpec {
                nullable: false,
                primary_key: true,
                auto_increment: true,
                ..column("id", ColumnType::Int)
            },
            ColumnSpec {
                length: Some(255),
                nullable: false,
                ..column("name", ColumnType::Varchar)
            },
            column("description", ColumnType::Text),
            ColumnSpec {
                default: Some(json!(0)),
                ..column("price", ColumnType::Decimal)
            },
            ColumnSpec {
                length: Some(100),
                ..column("category", ColumnType::Varchar)
            },
            ColumnSpec {
                default: Some(json!(0)),
                ..column("stock", ColumnType::Int)
            },
        ],
    };

    match service.tables().create_table(request).await {
        Ok(()) => {}
        // Physical table exists without a registry entry; leave it alone
        Err(axum_table_admin::Error::DuplicateTable(_)) => {
            tracing::warn!(table = SAMPLE_TABLE, "Unregistered sample table exists, skipping seed");
            return Ok(());
        }
        Err(error) => return Err(error),
    }

    let samples = [
        json!({ "name": "Sample product", "description": "A product to get started with", "price": 100, "category": "Category A", "stock": 12 }),
        json!({ "name": "Another product", "description": "Second sample row", "price": 200, "category": "Category B", "stock": 3 }),
    ];
    for sample in samples {
        service.rows().create_row(SAMPLE_TABLE, sample).await?;
    }

    tracing::info!(table = SAMPLE_TABLE, "Sample data seeded");
    Ok(())
}
