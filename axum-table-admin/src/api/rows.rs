//! Row endpoints under /data

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use crate::api::{rejection_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::{BulkDeleteRequest, MessageResponse, RowQuery};

/// Handler for GET /data/:table
///
/// Query parameters:
/// - limit: Maximum rows to return (default: 1000)
/// - offset: Starting row offset (default: 0)
/// - sortBy: Column name to sort by (optional, must exist)
/// - sortOrder: "ASC" or "DESC" (optional, default: "ASC")
pub async fn list_rows_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    query: Result<Query<RowQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.rows().list_rows(&table_name, &query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for GET /data/:table/:id
pub async fn get_row_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path((table_name, id)): Path<(String, String)>,
) -> Response {
    match state.service.rows().get_row(&table_name, &id).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for POST /data/:table
///
/// Returns the stored row, including generated keys and defaults.
pub async fn create_row_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.rows().create_row(&table_name, payload).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for PUT /data/:table/:id
pub async fn update_row_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path((table_name, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.rows().update_row(&table_name, &id, payload).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for PUT /data/:table/bulk
///
/// Body is an array of records, each carrying its `id`. All updates are
/// applied in one transaction.
pub async fn bulk_update_rows_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Response {
    let Json(records) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.rows().bulk_update_rows(&table_name, records).await {
        Ok(updated) => {
            tracing::debug!(table = %table_name, updated, "Bulk update completed");
            (
                StatusCode::OK,
                Json(MessageResponse::new("Bulk update completed successfully")),
            )
                .into_response()
        }
        Err(error) => state.error_response(error),
    }
}

/// Handler for DELETE /data/:table/:id
pub async fn delete_row_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path((table_name, id)): Path<(String, String)>,
) -> Response {
    match state.service.rows().delete_row(&table_name, &id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("Record deleted successfully")),
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for DELETE /data/:table/bulk
///
/// Body is `{ ids: [...] }`; an empty list is rejected.
pub async fn bulk_delete_rows_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state
        .service
        .rows()
        .bulk_delete_rows(&table_name, &request.ids)
        .await
    {
        Ok(deleted) => {
            tracing::debug!(table = %table_name, deleted, "Bulk delete completed");
            (
                StatusCode::OK,
                Json(MessageResponse::new("Records deleted successfully")),
            )
                .into_response()
        }
        Err(error) => state.error_response(error),
    }
}
