//! Table listing and schema management endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::api::{rejection_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::{AlterTableRequest, CreateTableRequest, MessageResponse, TableColumnsResponse};

/// Handler for GET /tables
///
/// Returns the registered tables that physically exist, newest first.
pub async fn list_tables_handler<DB: DatabaseProvider>(State(state): State<ApiState<DB>>) -> Response {
    match state.service.registry().list_tables().await {
        Ok(tables) => (StatusCode::OK, Json(tables)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for GET /tables/:name
///
/// Returns the introspected columns of a table.
pub async fn get_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
) -> Response {
    match state.service.tables().get_columns(&table_name).await {
        Ok(columns) => (
            StatusCode::OK,
            Json(TableColumnsResponse {
                name: table_name,
                columns,
            }),
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for POST /tables
///
/// # Arguments
///
/// * `state` - Shared API state
/// * `payload` - `{ name, displayName?, columns[] }`
///
/// # Returns
///
/// 201 with `{ message, name }`
pub async fn create_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    payload: Result<Json<CreateTableRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    let name = request.name.clone();
    match state.service.tables().create_table(request).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Table created successfully".to_string(),
                name: Some(name),
            }),
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for PUT /tables/:name
///
/// Body is `{ action, column }` with `action` one of `add_column`,
/// `delete_column` or `modify_column`.
pub async fn alter_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    payload: Result<Json<AlterTableRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.tables().alter_table(&table_name, request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("Table updated successfully")),
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for DELETE /tables/:name
pub async fn drop_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
) -> Response {
    match state.service.tables().drop_table(&table_name).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("Table deleted successfully")),
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}
