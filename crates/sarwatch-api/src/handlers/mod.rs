pub mod events;
pub mod products;

use axum::response::IntoResponse;
use sarwatch_core::json::normalize_numbers;
use sarwatch_core::AppError;
use serde::Serialize;
use serde_json::Value;

use crate::error::HttpAppError;

/// Serialize a response body with catalog numbers normalized.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    Ok(normalize_numbers(serde_json::to_value(value)?))
}

pub async fn not_found() -> impl IntoResponse {
    HttpAppError(AppError::NotFound("Route not found".to_string()))
}
