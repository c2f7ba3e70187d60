//! Search endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::api::{rejection_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::SearchQuery;

/// Handler for GET /search/:table?q=&limit=
pub async fn search_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };

    let text = query.q.unwrap_or_default();
    match state
        .service
        .search()
        .search_table(&table_name, &text, query.limit)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Handler for GET /search?q=&limit=
///
/// Searches every registered table and returns the best-ranked matches.
pub async fn search_global_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection),
    };

    let text = query.q.unwrap_or_default();
    match state.service.search().search_global(&text, query.limit).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => state.error_response(error),
    }
}
