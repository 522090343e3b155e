//! In-memory catalog
//!
//! Keeps both tables in ordered maps and serves them in pages of a fixed
//! size, so pagination behaves the way it does against a real table
//! service. Used by tests and local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sarwatch_core::{Event, Product, StatusCode};

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, CatalogResult};
use crate::pagination::{Cursor, Page};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct InMemoryCatalog {
    events: Arc<Mutex<BTreeMap<String, Event>>>,
    products: Arc<Mutex<BTreeMap<(String, String), Product>>>,
    page_size: usize,
    product_writes: Arc<AtomicUsize>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(BTreeMap::new())),
            products: Arc::new(Mutex::new(BTreeMap::new())),
            page_size: page_size.max(1),
            product_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `put_product` calls served so far.
    pub fn product_writes(&self) -> usize {
        self.product_writes.load(Ordering::SeqCst)
    }

    fn page<T: Clone>(&self, items: Vec<T>, cursor: Option<Cursor>) -> CatalogResult<Page<T>> {
        let offset: usize = match cursor {
            Some(cursor) => cursor.decode()?,
            None => 0,
        };
        let end = (offset + self.page_size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default().to_vec();
        let next = if end < items.len() {
            Some(Cursor::encode(&end)?)
        } else {
            None
        };
        Ok(Page::new(slice, next))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> CatalogResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CatalogError::BackendError("in-memory catalog lock poisoned".to_string()))
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn scan_events(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Event>> {
        let events: Vec<Event> = lock(&self.events)?.values().cloned().collect();
        self.page(events, cursor)
    }

    async fn get_event(&self, event_id: &str) -> CatalogResult<Option<Event>> {
        Ok(lock(&self.events)?.get(event_id).cloned())
    }

    async fn put_event(&self, event: &Event) -> CatalogResult<()> {
        lock(&self.events)?.insert(event.event_id.clone(), event.clone());
        Ok(())
    }

    async fn query_event_products(
        &self,
        event_id: &str,
        status: Option<&StatusCode>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|p| p.event_id == event_id)
            .filter(|p| status.map_or(true, |s| &p.status_code == s))
            .cloned()
            .collect();
        self.page(products, cursor)
    }

    async fn query_products_by_status(
        &self,
        status: &StatusCode,
        processed_since: Option<DateTime<Utc>>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let mut products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|p| &p.status_code == status)
            .filter(|p| processed_since.map_or(true, |since| p.processing_date >= since))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            (a.processing_date, &a.event_id, &a.product_id).cmp(&(
                b.processing_date,
                &b.event_id,
                &b.product_id,
            ))
        });
        self.page(products, cursor)
    }

    async fn scan_products(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Product>> {
        let products: Vec<Product> = lock(&self.products)?.values().cloned().collect();
        self.page(products, cursor)
    }

    async fn put_product(&self, product: &Product) -> CatalogResult<()> {
        lock(&self.products)?.insert(
            (product.event_id.clone(), product.product_id.clone()),
            product.clone(),
        );
        self.product_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{collect_all, CatalogStreams};
    use chrono::{Duration, TimeZone};
    use sarwatch_core::Granule;
    use serde_json::Map;

    fn product(event_id: &str, product_id: &str, status: StatusCode, date: DateTime<Utc>) -> Product {
        Product {
            product_id: product_id.to_string(),
            event_id: event_id.to_string(),
            granules: vec![Granule {
                granule_name: format!("granule-{}", product_id),
                acquisition_date: date,
                path: 1,
                frame: 1,
                wkt: String::new(),
            }],
            job_type: Some("RTC_GAMMA".to_string()),
            status_code: status,
            processing_date: date,
            files: None,
            message: None,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_events_stream_crosses_pages() {
        let catalog = InMemoryCatalog::with_page_size(2);
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        for id in ["e1", "e2", "e3", "e4", "e5"] {
            catalog.put_event(&Event::new(id, start)).await.unwrap();
        }

        let first = catalog.scan_events(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.next.is_some());

        let events = collect_all(catalog.events()).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3", "e4", "e5"]);
    }

    #[tokio::test]
    async fn test_get_event_missing() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get_event("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_products_for_event_with_status_filter() {
        let catalog = InMemoryCatalog::with_page_size(1);
        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        catalog
            .put_product(&product("e1", "p1", StatusCode::Succeeded, date))
            .await
            .unwrap();
        catalog
            .put_product(&product("e1", "p2", StatusCode::Failed, date))
            .await
            .unwrap();
        catalog
            .put_product(&product("e1", "p3", StatusCode::Succeeded, date))
            .await
            .unwrap();
        catalog
            .put_product(&product("e2", "p4", StatusCode::Succeeded, date))
            .await
            .unwrap();

        let all = collect_all(catalog.products_for_event("e1", None)).await.unwrap();
        assert_eq!(all.len(), 3);

        let succeeded = collect_all(catalog.products_for_event("e1", Some(StatusCode::Succeeded)))
            .await
            .unwrap();
        let ids: Vec<_> = succeeded.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[tokio::test]
    async fn test_products_by_status_lower_bound_is_inclusive() {
        let catalog = InMemoryCatalog::with_page_size(2);
        let since = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        catalog
            .put_product(&product("e1", "old", StatusCode::Succeeded, since - Duration::seconds(1)))
            .await
            .unwrap();
        catalog
            .put_product(&product("e1", "edge", StatusCode::Succeeded, since))
            .await
            .unwrap();
        catalog
            .put_product(&product("e2", "new", StatusCode::Succeeded, since + Duration::days(1)))
            .await
            .unwrap();
        catalog
            .put_product(&product("e2", "pending", StatusCode::Pending, since + Duration::days(1)))
            .await
            .unwrap();

        let recent = collect_all(catalog.products_by_status(StatusCode::Succeeded, Some(since)))
            .await
            .unwrap();
        let ids: Vec<_> = recent.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "new"]);
    }

    #[tokio::test]
    async fn test_put_product_replaces_by_key() {
        let catalog = InMemoryCatalog::new();
        let date = Utc::now();
        let mut p = product("e1", "p1", StatusCode::Pending, date);
        catalog.put_product(&p).await.unwrap();
        p.status_code = StatusCode::Succeeded;
        catalog.put_product(&p).await.unwrap();

        let all = collect_all(catalog.products()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status_code, StatusCode::Succeeded);
        assert_eq!(catalog.product_writes(), 2);
    }
}
