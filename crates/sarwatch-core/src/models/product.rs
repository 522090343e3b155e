use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::granule::Granule;
use super::status::StatusCode;
use super::timestamp;

/// A processing job tracked in the catalog.
///
/// `product_id` is the vendor job id, or a random UUID for failure
/// placeholders recorded when submission never produced a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub event_id: String,
    pub granules: Vec<Granule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    pub status_code: StatusCode,
    #[serde(with = "timestamp")]
    pub processing_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<ProductFiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Public locations of harvested artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFiles {
    pub browse_url: String,
    pub thumbnail_url: String,
    pub product_name: String,
    pub product_size: u64,
    pub product_url: String,
}

impl Product {
    /// Placeholder for a granule whose jobs could not be submitted.
    pub fn failed(
        event_id: impl Into<String>,
        granule: Granule,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: Uuid::new_v4().to_string(),
            event_id: event_id.into(),
            granules: vec![granule],
            job_type: None,
            status_code: StatusCode::Failed,
            processing_date: now,
            files: None,
            message: Some(message.into()),
            extra: Map::new(),
        }
    }

    /// The granule a job was submitted for.
    pub fn reference_granule(&self) -> Option<&Granule> {
        self.granules.first()
    }

    pub fn is_terminal(&self) -> bool {
        self.status_code.is_terminal()
    }
}
