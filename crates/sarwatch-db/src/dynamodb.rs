use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use sarwatch_core::json::number_from_str;
use sarwatch_core::models::timestamp;
use sarwatch_core::{Event, Product, StatusCode};

use crate::catalog::CatalogStore;
use crate::error::{CatalogError, CatalogResult};
use crate::pagination::{Cursor, Page};

/// Name of the products table index on (`status_code`, `processing_date`).
pub const STATUS_INDEX: &str = "status_code";

type Item = HashMap<String, AttributeValue>;

/// DynamoDB catalog
#[derive(Clone)]
pub struct DynamoCatalog {
    client: Client,
    event_table: String,
    product_table: String,
}

impl DynamoCatalog {
    /// Create a catalog client
    ///
    /// `endpoint_url` points the client at a local emulator (DynamoDB Local)
    /// instead of the regional endpoint.
    pub async fn new(
        event_table: String,
        product_table: String,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> CatalogResult<Self> {
        let region_provider = RegionProviderChain::first_try(region.map(aws_config::Region::new))
            .or_default_provider();

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::standard())
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::from_client(
            Client::from_conf(builder.build()),
            event_table,
            product_table,
        ))
    }

    pub fn from_client(client: Client, event_table: String, product_table: String) -> Self {
        Self {
            client,
            event_table,
            product_table,
        }
    }
}

fn sdk_error<E, R>(operation: &str, table: &str, err: SdkError<E, R>) -> CatalogError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{} on {} failed: {}", operation, table, DisplayErrorContext(&err));
    tracing::error!(table = %table, operation = %operation, error = %message, "DynamoDB request failed");
    CatalogError::BackendError(message)
}

/// Convert a JSON document to a DynamoDB attribute.
pub(crate) fn json_to_attr(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(key, value)| (key, json_to_attr(value)))
                .collect(),
        ),
    }
}

/// Convert a DynamoDB attribute to JSON; numbers follow the decimal rule.
pub(crate) fn attr_to_json(value: AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => number_from_str(&n).unwrap_or(Value::String(n)),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.into_iter().map(attr_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, attr_to_json(value)))
                .collect(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(
            items
                .into_iter()
                .map(|n| number_from_str(&n).unwrap_or(Value::String(n)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn to_item<T: Serialize>(record: &T) -> CatalogResult<Item> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key, json_to_attr(value)))
            .collect()),
        _ => Err(CatalogError::Serialization(
            "catalog records must serialize to objects".to_string(),
        )),
    }
}

fn from_item<T: DeserializeOwned>(item: Item) -> CatalogResult<T> {
    let map: Map<String, Value> = item
        .into_iter()
        .map(|(key, value)| (key, attr_to_json(value)))
        .collect();
    Ok(serde_json::from_value(Value::Object(map))?)
}

fn from_items<T: DeserializeOwned>(items: Option<Vec<Item>>) -> CatalogResult<Vec<T>> {
    items.unwrap_or_default().into_iter().map(from_item).collect()
}

/// Key attributes are always strings in both tables and the status index.
fn encode_key(key: Option<Item>) -> CatalogResult<Option<Cursor>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let mut plain = BTreeMap::new();
    for (name, value) in key {
        match value {
            AttributeValue::S(s) => {
                plain.insert(name, s);
            }
            other => {
                return Err(CatalogError::InvalidCursor(format!(
                    "unexpected key attribute {}: {:?}",
                    name, other
                )))
            }
        }
    }
    Cursor::encode(&plain).map(Some)
}

fn decode_key(cursor: Option<Cursor>) -> CatalogResult<Option<Item>> {
    match cursor {
        Some(cursor) => {
            let plain: BTreeMap<String, String> = cursor.decode()?;
            Ok(Some(
                plain
                    .into_iter()
                    .map(|(name, value)| (name, AttributeValue::S(value)))
                    .collect(),
            ))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl CatalogStore for DynamoCatalog {
    #[tracing::instrument(skip(self, cursor), fields(db.table = %self.event_table, db.operation = "scan"))]
    async fn scan_events(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Event>> {
        let output = self
            .client
            .scan()
            .table_name(&self.event_table)
            .set_exclusive_start_key(decode_key(cursor)?)
            .send()
            .await
            .map_err(|e| sdk_error("scan", &self.event_table, e))?;

        Ok(Page::new(
            from_items(output.items)?,
            encode_key(output.last_evaluated_key)?,
        ))
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.event_table, db.operation = "get"))]
    async fn get_event(&self, event_id: &str) -> CatalogResult<Option<Event>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.event_table)
            .key("event_id", AttributeValue::S(event_id.to_string()))
            .send()
            .await
            .map_err(|e| sdk_error("get_item", &self.event_table, e))?;

        output.item.map(from_item).transpose()
    }

    #[tracing::instrument(skip(self, event), fields(db.table = %self.event_table, db.operation = "put", event_id = %event.event_id))]
    async fn put_event(&self, event: &Event) -> CatalogResult<()> {
        self.client
            .put_item()
            .table_name(&self.event_table)
            .set_item(Some(to_item(event)?))
            .send()
            .await
            .map_err(|e| sdk_error("put_item", &self.event_table, e))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = %self.product_table, db.operation = "query"))]
    async fn query_event_products(
        &self,
        event_id: &str,
        status: Option<&StatusCode>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let mut request = self
            .client
            .query()
            .table_name(&self.product_table)
            .key_condition_expression("event_id = :event_id")
            .expression_attribute_values(":event_id", AttributeValue::S(event_id.to_string()))
            .set_exclusive_start_key(decode_key(cursor)?);

        if let Some(status) = status {
            request = request
                .filter_expression("status_code = :status_code")
                .expression_attribute_values(
                    ":status_code",
                    AttributeValue::S(status.as_str().to_string()),
                );
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("query", &self.product_table, e))?;

        Ok(Page::new(
            from_items(output.items)?,
            encode_key(output.last_evaluated_key)?,
        ))
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = %self.product_table, db.index = STATUS_INDEX, db.operation = "query"))]
    async fn query_products_by_status(
        &self,
        status: &StatusCode,
        processed_since: Option<DateTime<Utc>>,
        cursor: Option<Cursor>,
    ) -> CatalogResult<Page<Product>> {
        let start = Instant::now();
        let mut request = self
            .client
            .query()
            .table_name(&self.product_table)
            .index_name(STATUS_INDEX)
            .expression_attribute_values(
                ":status_code",
                AttributeValue::S(status.as_str().to_string()),
            )
            .set_exclusive_start_key(decode_key(cursor)?);

        request = match processed_since {
            Some(since) => request
                .key_condition_expression(
                    "status_code = :status_code AND processing_date >= :since",
                )
                .expression_attribute_values(":since", AttributeValue::S(timestamp::format(&since))),
            None => request.key_condition_expression("status_code = :status_code"),
        };

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("query", &self.product_table, e))?;

        let items = from_items(output.items)?;
        tracing::debug!(
            status_code = %status,
            count = items.len(),
            duration_ms = start.elapsed().as_millis(),
            "Status index page fetched"
        );
        Ok(Page::new(items, encode_key(output.last_evaluated_key)?))
    }

    #[tracing::instrument(skip(self, cursor), fields(db.table = %self.product_table, db.operation = "scan"))]
    async fn scan_products(&self, cursor: Option<Cursor>) -> CatalogResult<Page<Product>> {
        let output = self
            .client
            .scan()
            .table_name(&self.product_table)
            .set_exclusive_start_key(decode_key(cursor)?)
            .send()
            .await
            .map_err(|e| sdk_error("scan", &self.product_table, e))?;

        Ok(Page::new(
            from_items(output.items)?,
            encode_key(output.last_evaluated_key)?,
        ))
    }

    #[tracing::instrument(skip(self, product), fields(db.table = %self.product_table, db.operation = "put", product_id = %product.product_id))]
    async fn put_product(&self, product: &Product) -> CatalogResult<()> {
        self.client
            .put_item()
            .table_name(&self.product_table)
            .set_item(Some(to_item(product)?))
            .send()
            .await
            .map_err(|e| sdk_error("put_item", &self.product_table, e))?;
        Ok(())
    }
}
