use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sarwatch_core::{AppError, StatusCode};
use sarwatch_db::{collect_all, CatalogStreams};
use serde_json::Value;

use super::to_json;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /events`
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let events = collect_all(state.catalog.events()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to scan events");
        e
    })?;

    tracing::debug!(count = events.len(), "Listing events");
    Ok(Json(to_json(&events)?))
}

/// `GET /events/{event_id}`: the event with its succeeded products.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .catalog
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let products = collect_all(
        state
            .catalog
            .products_for_event(&event_id, Some(StatusCode::Succeeded)),
    )
    .await?;

    let mut body = to_json(&event)?;
    if let Value::Object(map) = &mut body {
        map.insert("products".to_string(), to_json(&products)?);
    }

    Ok(Json(body))
}
