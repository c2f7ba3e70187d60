//! Statistics, report and export endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::api::{rejection_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::{ExportQuery, ReportRequest, ReportResponse};
use crate::service::ExportFormat;

/// Handler for GET /reports/stats/:table
pub async fn table_stats_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
) -> Response {
    match state.service.reports().table_stats(&table_name).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for GET /reports/stats
pub async fn global_stats_handler<DB: DatabaseProvider>(State(state): State<ApiState<DB>>) -> Response {
    match state.service.reports().global_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for POST /reports/generate
///
/// # Returns
///
/// `{ report: { sql, rowCount, data } }`
pub async fn generate_report_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match state.service.reports().generate_report(&request).await {
        Ok(report) => (StatusCode::OK, Json(ReportResponse { report })).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for GET /reports/export/:table?format=csv|json|xlsx
///
/// Sends the whole table as an attachment named `<table>.<format>`.
pub async fn export_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };

    let format = match query.format.as_deref() {
        None => ExportFormat::default(),
        Some(format) => match format.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(error) => return state.error_response(error),
        },
    };

    match state.service.reports().export_table(&table_name, format).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, file.content_type.to_string()),
                (header::CONTENT_DISPOSITION, file.content_disposition()),
            ],
            file.bytes,
        )
            .into_response(),
        Err(error) => state.error_response(error),
    }
}
