use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use sarwatch_core::{Event, Product, StatusCode};

use crate::catalog::CatalogStore;
use crate::error::CatalogResult;
use crate::pagination::{Cursor, Page};

const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// PostgreSQL catalog
///
/// Pages use keyset pagination: the cursor carries the sort key of the last
/// row returned.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    page_size: usize,
}

#[derive(Serialize, Deserialize)]
struct EventKey {
    event_id: String,
}

#[derive(Serialize, Deserialize)]
struct ProductKey {
    event_id: String,
    product_id: String,
}

#[derive(Serialize, Deserialize)]
struct StatusKey {
    processing_date: DateTime<Utc>,
    event_id: String,
    product_id: String,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool, page_size: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
        }
    }

    /// Connect and apply the embedded migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        page_size: usize,
    ) -> CatalogResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Catalog migrations applied");

        Ok(Self::new(pool, page_size))
    }

    fn limit(&self) -> i64 {
        self.page_size as i64 + 1
    }

    /// Trim the look-ahead row and build the cursor from the last kept item.
    fn page<T, K, F>(&self, mut items: Vec<T>, key: F) -> CatalogResult<Page<T>>
    where
        K: Serialize,
        F: Fn(&T) -> K,
    {
        if items.len() > self.page_size {
            items.truncate(self.page_size);
            let next = match items.last() {
                Some(last) => Some(Cursor::encode(&key(last))?),
                None => None,
            };
            Ok(Page::new(items, next))
        } else {
            Ok(Page::last(items))
        }
    }
}

fn product_key(product: &Product) -> ProductKey {
    ProductKey {
        event_id: product.event_id.clone(),
        product_id: product.product_id.clone(),
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    #[tracing::instrument(skip(self, cursor), fields(db.table = "events", db.operation = "select"))]
    async fn scan_events(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Event>> {
        let after = cursor.map(|c| c.decode::<EventKey>()).transpose()?;

        let rows = sqlx::query_as::<Postgres, (Json<Event>,)>(
            r#"
            SELECT document FROM events
            WHERE ($1::TEXT IS NULL OR event_id > $1)
            ORDER BY event_id
            LIMIT $2
            "#,
        )
        .bind(after.map(|k| k.event_id))
        .bind(self.limit())
        .fetch_all(&self.pool)
        .await?;

        let events = rows.into_iter().map(|(Json(event),)| event).collect();
        self.page(events, |e: &Event| EventKey {
            event_id: e.event_id.clone(),
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "select"))]
    async fn get_event(&self, event_id: &str) -> CatalogResult<Option<Event>> {
        let row = sqlx::query_as::<Postgres, (Json<Event>,)>(
            "SELECT document FROM events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(event),)| event))
    }

    #[tracing::instrument(skip(self, event), fields(db.table = "events", db.operation = "upsert", event_id = %event.event_id))]
    async fn put_event(&self, event: &Event) -> CatalogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, document)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO UPDATE SET document = EXCLUDED.document
            "#,
        )
        .bind(&event.event_id)
        .bind(Json(event))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = "products", db.operation = "select"))]
    async fn query_event_products(
        &self,
        event_id: &str,
        status: Option<&StatusCode>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let after = cursor.map(|c| c.decode::<ProductKey>()).transpose()?;

        let rows = sqlx::query_as::<Postgres, (Json<Product>,)>(
            r#"
            SELECT document FROM products
            WHERE event_id = $1
              AND ($2::TEXT IS NULL OR status_code = $2)
              AND ($3::TEXT IS NULL OR product_id > $3)
            ORDER BY product_id
            LIMIT $4
            "#,
        )
        .bind(event_id)
        .bind(status.map(|s| s.as_str().to_string()))
        .bind(after.map(|k| k.product_id))
        .bind(self.limit())
        .fetch_all(&self.pool)
        .await?;

        let products = rows.into_iter().map(|(Json(product),)| product).collect();
        self.page(products, product_key)
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = "products", db.operation = "select"))]
    async fn query_products_by_status(
        &self,
        status: &StatusCode,
        processed_since: Option<DateTime<Utc>>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let after = cursor.map(|c| c.decode::<StatusKey>()).transpose()?;
        let (after_date, after_event, after_product) = match after {
            Some(key) => (
                Some(key.processing_date),
                Some(key.event_id),
                Some(key.product_id),
            ),
            None => (None, None, None),
        };

        let rows = sqlx::query_as::<Postgres, (Json<Product>,)>(
            r#"
            SELECT document FROM products
            WHERE status_code = $1
              AND ($2::TIMESTAMPTZ IS NULL OR processing_date >= $2)
              AND ($3::TIMESTAMPTZ IS NULL
                   OR (processing_date, event_id, product_id) > ($3, $4::TEXT, $5::TEXT))
            ORDER BY processing_date, event_id, product_id
            LIMIT $6
            "#,
        )
        .bind(status.as_str())
        .bind(processed_since)
        .bind(after_date)
        .bind(after_event)
        .bind(after_product)
        .bind(self.limit())
        .fetch_all(&self.pool)
        .await?;

        let products = rows.into_iter().map(|(Json(product),)| product).collect();
        self.page(products, |p: &Product| StatusKey {
            processing_date: p.processing_date,
            event_id: p.event_id.clone(),
            product_id: p.product_id.clone(),
        })
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = "products", db.operation = "select"))]
    async fn scan_products(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Product>> {
        let after = cursor.map(|c| c.decode::<ProductKey>()).transpose()?;
        let (after_event, after_product) = match after {
            Some(key) => (Some(key.event_id), Some(key.product_id)),
            None => (None, None),
        };

        let rows = sqlx::query_as::<Postgres, (Json<Product>,)>(
            r#"
            SELECT document FROM products
            WHERE ($1::TEXT IS NULL OR (event_id, product_id) > ($1, $2::TEXT))
            ORDER BY event_id, product_id
            LIMIT $3
            "#,
        )
        .bind(after_event)
        .bind(after_product)
        .bind(self.limit())
        .fetch_all(&self.pool)
        .await?;

        let products = rows.into_iter().map(|(Json(product),)| product).collect();
        self.page(products, product_key)
    }

    #[tracing::instrument(skip(self, product), fields(db.table = "products", db.operation = "upsert", product_id = %product.product_id))]
    async fn put_product(&self, product: &Product) -> CatalogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (event_id, product_id, status_code, processing_date, document)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, product_id) DO UPDATE SET
                status_code = EXCLUDED.status_code,
                processing_date = EXCLUDED.processing_date,
                document = EXCLUDED.document
            "#,
        )
        .bind(&product.event_id)
        .bind(&product.product_id)
        .bind(product.status_code.as_str())
        .bind(product.processing_date)
        .bind(Json(product))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
