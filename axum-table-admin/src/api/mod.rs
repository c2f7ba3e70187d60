//! REST API endpoints
//!
//! Handlers are generic over the [`DatabaseProvider`] and share an
//! [`ApiState`]. Every failure is answered with `{ "error": message }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::service::DataService;
use crate::Error;

pub mod reports;
pub mod rows;
pub mod search;
pub mod tables;

// Re-export handlers for convenience
pub use reports::{export_table_handler, generate_report_handler, global_stats_handler, table_stats_handler};
pub use rows::{
    bulk_delete_rows_handler, bulk_update_rows_handler, create_row_handler, delete_row_handler,
    get_row_handler, list_rows_handler, update_row_handler,
};
pub use search::{search_global_handler, search_table_handler};
pub use tables::{
    alter_table_handler, create_table_handler, drop_table_handler, get_table_handler,
    list_tables_handler,
};

/// Message used for 5xx responses when internal errors are hidden
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Shared state of all handlers
pub struct ApiState<DB: DatabaseProvider> {
    pub service: Arc<DataService<DB>>,

    /// Whether 5xx responses carry the underlying error message
    pub expose_internal_errors: bool,
}

// Derive would require `DB: Clone`
impl<DB: DatabaseProvider> Clone for ApiState<DB> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            expose_internal_errors: self.expose_internal_errors,
        }
    }
}

impl<DB: DatabaseProvider> ApiState<DB> {
    pub fn new(service: Arc<DataService<DB>>, expose_internal_errors: bool) -> Self {
        Self {
            service,
            expose_internal_errors,
        }
    }

    /// Translate a service error into an HTTP response
    pub fn error_response(&self, error: Error) -> Response {
        let status = status_for(&error);

        let message = if status.is_server_error() {
            tracing::error!(error = %error, "Request failed");
            if self.expose_internal_errors {
                error.to_string()
            } else {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        } else {
            tracing::debug!(error = %error, status = %status, "Request rejected");
            error.to_string()
        };

        error_body(status, message)
    }
}

/// HTTP status of a service error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) | Error::InvalidSchema(_) => StatusCode::BAD_REQUEST,
        Error::DuplicateTable(_) | Error::ConstraintViolation(_) => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Database(_) | Error::Serialization(_) | Error::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Answer for malformed bodies and query strings
pub(crate) fn rejection_response(rejection: impl std::fmt::Display) -> Response {
    error_body(StatusCode::BAD_REQUEST, rejection.to_string())
}

/// Handler for GET /health
pub async fn health_handler<DB: DatabaseProvider>(
    axum::extract::State(state): axum::extract::State<ApiState<DB>>,
) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match state.service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "OK", "timestamp": timestamp })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "ERROR", "timestamp": timestamp })),
            )
                .into_response()
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found_handler() -> Response {
    error_body(StatusCode::NOT_FOUND, "Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(&Error::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::InvalidSchema("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::DuplicateTable("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&Error::ConstraintViolation("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::Database("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
