use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::error::AppError;

/// One record of the search API's `jsonlite` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGranule {
    pub granule_name: String,
    #[serde(rename = "productID", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub start_time: String,
    pub path: i64,
    pub frame: i64,
    #[serde(default)]
    pub wkt: String,
}

/// Granule as embedded in a stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    pub granule_name: String,
    #[serde(with = "timestamp")]
    pub acquisition_date: DateTime<Utc>,
    pub path: i64,
    pub frame: i64,
    pub wkt: String,
}

impl TryFrom<&SearchGranule> for Granule {
    type Error = AppError;

    fn try_from(value: &SearchGranule) -> Result<Self, Self::Error> {
        let acquisition_date = timestamp::parse(&value.start_time).map_err(|e| {
            AppError::InvalidInput(format!(
                "granule {} has an invalid start time '{}': {}",
                value.granule_name, value.start_time, e
            ))
        })?;

        Ok(Granule {
            granule_name: value.granule_name.clone(),
            acquisition_date,
            path: value.path,
            frame: value.frame,
            wkt: value.wkt.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_granule_from_search_result() {
        let result: SearchGranule = serde_json::from_value(json!({
            "granuleName": "S1A_IW_SLC__1SDV_20200101T000000",
            "productID": "S1A_IW_SLC__1SDV_20200101T000000-SLC",
            "startTime": "2020-01-01T00:00:00.000000",
            "path": 123,
            "frame": 456,
            "wkt": "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"
        }))
        .unwrap();

        let granule = Granule::try_from(&result).unwrap();
        let stored = serde_json::to_value(&granule).unwrap();
        assert_eq!(
            stored,
            json!({
                "granule_name": "S1A_IW_SLC__1SDV_20200101T000000",
                "acquisition_date": "2020-01-01T00:00:00+00:00",
                "path": 123,
                "frame": 456,
                "wkt": "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"
            })
        );
    }

    #[test]
    fn test_granule_with_bad_start_time() {
        let result = SearchGranule {
            granule_name: "g".to_string(),
            product_id: None,
            start_time: "not a date".to_string(),
            path: 1,
            frame: 2,
            wkt: String::new(),
        };
        assert!(matches!(
            Granule::try_from(&result),
            Err(AppError::InvalidInput(_))
        ));
    }
}
