//! Test helpers: build the router over an in-memory catalog.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use sarwatch_api::setup::routes::setup_routes;
use sarwatch_api::AppState;
use sarwatch_core::{Event, Granule, Product, ProductFiles, StatusCode};
use sarwatch_db::InMemoryCatalog;
use serde_json::Map;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap()
}

pub struct TestApp {
    pub server: TestServer,
    pub catalog: InMemoryCatalog,
}

/// Small pages so every listing crosses page boundaries.
pub fn setup_test_app() -> TestApp {
    let catalog = InMemoryCatalog::with_page_size(2);
    let state = AppState::new(Arc::new(catalog.clone()), 7).with_clock(fixed_now);
    let server = TestServer::new(setup_routes(Arc::new(state))).expect("Failed to build test server");
    TestApp { server, catalog }
}

pub fn event(event_id: &str) -> Event {
    Event::new(event_id, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
}

pub fn product(
    event_id: &str,
    product_id: &str,
    status: StatusCode,
    processing_date: DateTime<Utc>,
) -> Product {
    let files = (status == StatusCode::Succeeded).then(|| ProductFiles {
        browse_url: format!("https://bucket/{}/{}/browse.png", event_id, product_id),
        thumbnail_url: format!("https://bucket/{}/{}/thumb.png", event_id, product_id),
        product_name: "product.zip".to_string(),
        product_size: 2048,
        product_url: format!("https://bucket/{}/{}/product.zip", event_id, product_id),
    });

    Product {
        product_id: product_id.to_string(),
        event_id: event_id.to_string(),
        granules: vec![Granule {
            granule_name: format!("granule-{}", product_id),
            acquisition_date: processing_date,
            path: 64,
            frame: 123,
            wkt: "POINT(0 0)".to_string(),
        }],
        job_type: Some("RTC_GAMMA".to_string()),
        status_code: status,
        processing_date,
        files,
        message: None,
        extra: Map::new(),
    }
}
