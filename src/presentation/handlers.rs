// HTTP request handlers
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::application::history::WINDOW_HOURS;
use crate::application::store_repository::StoreError;
use crate::presentation::app_state::AppState;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub hours: Option<i64>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn store_error_response(error: StoreError) -> Response {
    match &error {
        StoreError::UnknownEntityType(_) | StoreError::UnknownEntity { .. } => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        StoreError::InvalidDocument(_) => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        StoreError::Io(_) | StoreError::Json(_) => {
            tracing::error!("store error: {error}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

/// Full stored document, verbatim.
pub async fn get_data(State(state): State<Arc<AppState>>) -> Response {
    match state.repository.load().await {
        Ok(document) => Json(document).into_response(),
        Err(error) => store_error_response(error),
    }
}

/// Replaces the whole document, last-writer-wins.
pub async fn post_data(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> Response {
    if document.get("sensors").is_none() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid data format".to_string());
    }
    match state.repository.replace(document).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(error) => store_error_response(error),
    }
}

/// Shallow-merges a partial object into one entity and returns it.
pub async fn patch_entity(
    State(state): State<Arc<AppState>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Json(partial): Json<Value>,
) -> Response {
    match state
        .repository
        .patch_entity(&entity_type, &entity_id, partial)
        .await
    {
        Ok(entity) => Json(entity).into_response(),
        Err(error) => store_error_response(error),
    }
}

/// Rollup summary over rooms, categories, assets and use cases.
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard_service.dashboard().await {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => {
            tracing::error!("dashboard computation failed: {error}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

/// Detail analytics for one sensor.
pub async fn get_sensor_stats(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> Response {
    // the detail views offer a fixed 8h/24h/7d selector
    let hours = query
        .hours
        .filter(|h| WINDOW_HOURS.contains(h))
        .unwrap_or(24);
    match state
        .dashboard_service
        .sensor_stats(sensor_id, hours, Utc::now())
        .await
    {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("sensor {sensor_id} not found"),
        ),
        Err(error) => {
            tracing::error!("sensor stats failed: {error}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}
