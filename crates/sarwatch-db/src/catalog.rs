//! Catalog store abstraction
//!
//! All catalog backends implement [`CatalogStore`]. Read operations return a
//! single [`Page`]; [`CatalogStreams`] layers lazy, restartable streams over
//! them so callers never handle continuation tokens directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;

use sarwatch_core::{Event, Product, StatusCode};

use crate::error::CatalogResult;
use crate::pagination::{paginate, Cursor, Page};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// One page of a full scan of the events table.
    async fn scan_events(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Event>>;

    async fn get_event(&self, event_id: &str) -> CatalogResult<Option<Event>>;

    async fn put_event(&self, event: &Event) -> CatalogResult<()>;

    /// One page of the products of an event, optionally filtered by status.
    async fn query_event_products(
        &self,
        event_id: &str,
        status: Option<&StatusCode>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>>;

    /// One page of the status index, optionally bounded below by
    /// `processing_date` (inclusive).
    async fn query_products_by_status(
        &self,
        status: &StatusCode,
        processed_since: Option<DateTime<Utc>>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>>;

    /// One page of a full scan of the products table.
    async fn scan_products(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Product>>;

    /// Insert or replace a product keyed by (`event_id`, `product_id`).
    async fn put_product(&self, product: &Product) -> CatalogResult<()>;
}

/// Lazy streams over every page of a catalog read.
pub trait CatalogStreams {
    fn events(&self) -> BoxStream<'_, CatalogResult<Event>>;

    fn products_for_event(
        &self,
        event_id: &str,
        status: Option<StatusCode>,
    ) -> BoxStream<'_, CatalogResult<Product>>;

    fn products_by_status(
        &self,
        status: StatusCode,
        processed_since: Option<DateTime<Utc>>,
    ) -> BoxStream<'_, CatalogResult<Product>>;

    fn products(&self) -> BoxStream<'_, CatalogResult<Product>>;
}

impl<S: CatalogStore + ?Sized> CatalogStreams for S {
    fn events(&self) -> BoxStream<'_, CatalogResult<Event>> {
        paginate(move |cursor| self.scan_events(cursor))
    }

    fn products_for_event(
        &self,
        event_id: &str,
        status: Option<StatusCode>,
    ) -> BoxStream<'_, CatalogResult<Product>> {
        let event_id = event_id.to_string();
        paginate(move |cursor| {
            let event_id = event_id.clone();
            let status = status.clone();
            async move {
                self.query_event_products(&event_id, status.as_ref(), cursor)
                    .await
            }
        })
    }

    fn products_by_status(
        &self,
        status: StatusCode,
        processed_since: Option<DateTime<Utc>>,
    ) -> BoxStream<'_, CatalogResult<Product>> {
        paginate(move |cursor| {
            let status = status.clone();
            async move {
                self.query_products_by_status(&status, processed_since, cursor)
                    .await
            }
        })
    }

    fn products(&self) -> BoxStream<'_, CatalogResult<Product>> {
        paginate(move |cursor| self.scan_products(cursor))
    }
}

/// Collect a whole stream, stopping at the first error.
pub async fn collect_all<T>(stream: BoxStream<'_, CatalogResult<T>>) -> CatalogResult<Vec<T>> {
    stream.try_collect().await
}
