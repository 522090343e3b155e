use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp;

/// A tracked region and time window of interest.
///
/// Attributes the pipeline does not interpret (names, descriptions, links)
/// are kept in `extra` and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
    pub processing_timeframe: ProcessingTimeframe,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTimeframe {
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(event_id: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            wkt: None,
            processing_timeframe: ProcessingTimeframe { start, end: None },
            extra: Map::new(),
        }
    }
}
