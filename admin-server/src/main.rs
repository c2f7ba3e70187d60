use std::process::ExitCode;
use std::sync::Arc;

use axum_table_admin::{DataService, DatabaseProvider, MySqlProvider, SqliteProvider, TableAdminLayer};
use thiserror::Error;

mod config;
mod database;

use config::{Backend, ConfigError, ServerConfig};

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Admin(#[from] axum_table_admin::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Server terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;

    match config.backend {
        Backend::Sqlite => {
            let pool = database::connect_sqlite(&config.database_url, config.max_connections).await?;
            serve(&config, DataService::new(SqliteProvider::new(pool))).await
        }
        Backend::MySql => {
            let pool = database::connect_mysql(&config.database_url, config.max_connections).await?;
            serve(&config, DataService::new(MySqlProvider::new(pool))).await
        }
    }
}

async fn serve<DB: DatabaseProvider>(config: &ServerConfig, service: DataService<DB>) -> Result<(), ServerError> {
    service.initialize().await?;

    if config.seed_sample_data {
        database::seed_sample_data(&service).await?;
    }

    let service = Arc::new(service);
    let app = TableAdminLayer::new(config.base_path.clone(), Arc::clone(&service))
        .with_internal_errors(!config.is_production())
        .into_router();

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!(
        address = %config.bind_address,
        base_path = %config.base_path,
        backend = ?config.backend,
        "Admin API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
