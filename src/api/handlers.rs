use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use std::sync::Arc;
use std::time::Instant;

use crate::changeset::ChangeSet;
use crate::data_models::SearchRequest as AggregateRequest;
use crate::settings::StoreKind;

use super::AppState;
use super::errors::ApiError;
use super::models::{SearchRequest, SearchResponse, SettingsUpdateResponse, StoreListing};

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid search request: {e}")))?;

    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".to_string()));
    }
    if request.max_pages == 0 || request.max_pages > state.max_pages {
        return Err(ApiError::BadRequest(format!(
            "max_pages must be between 1 and {}",
            state.max_pages
        )));
    }

    let api_key = lookup(&state, StoreKind::Credentials, &request.api_key)?;
    let engine_id = lookup(&state, StoreKind::EngineIds, &request.engine)?;

    let aggregate = state
        .aggregator
        .aggregate(&AggregateRequest {
            api_key,
            engine_id,
            query: request.query,
            sort: request.sort_by,
            max_pages: request.max_pages,
        })
        .await;

    tracing::info!(
        results = aggregate.results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search served"
    );

    Ok(Json(SearchResponse {
        results: aggregate.results,
        total_results: aggregate.total_results,
        search_time: aggregate.search_time,
    }))
}

/// Resolves a stored handle (key name, engine name) to its value.
fn lookup(state: &AppState, kind: StoreKind, name: &str) -> Result<String, ApiError> {
    state
        .settings
        .store(kind)
        .snapshot()
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown {kind} entry: {name}")))
}

pub async fn list_settings_handler(
    State(state): State<Arc<AppState>>,
    Path(store): Path<String>,
) -> Result<Json<StoreListing>, ApiError> {
    let kind: StoreKind = store.parse()?;
    let snapshot = state.settings.store(kind).snapshot();
    Ok(Json(StoreListing {
        store: kind,
        names: snapshot.names().into_iter().map(str::to_string).collect(),
    }))
}

/// Like the search endpoint, the body is parsed here rather than by an
/// extractor so malformed JSON is answered with `{"error": ...}`.
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Path(store): Path<String>,
    body: Bytes,
) -> Result<Json<SettingsUpdateResponse>, ApiError> {
    let kind: StoreKind = store.parse()?;
    let changeset = ChangeSet::from_json(&body)?;
    let changed = state.settings.update(kind, &changeset).await?;
    Ok(Json(SettingsUpdateResponse {
        success: true,
        changed,
    }))
}

pub async fn reload_settings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsUpdateResponse>, ApiError> {
    state.settings.reload_all().await?;
    Ok(Json(SettingsUpdateResponse {
        success: true,
        changed: true,
    }))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
