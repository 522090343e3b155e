use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::SubsecRound;
use sarwatch_core::StatusCode;
use sarwatch_db::{collect_all, CatalogStreams};

use super::to_json;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /recent_products`: succeeded products processed within the window.
pub async fn recent_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let since = state.now().trunc_subsecs(0) - state.recent_products_window;

    let products = collect_all(
        state
            .catalog
            .products_by_status(StatusCode::Succeeded, Some(since)),
    )
    .await?;

    tracing::debug!(count = products.len(), since = %since, "Listing recent products");
    Ok(Json(to_json(&products)?))
}
