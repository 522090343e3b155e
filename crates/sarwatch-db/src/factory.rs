#[cfg(feature = "catalog-dynamodb")]
use crate::DynamoCatalog;
#[cfg(feature = "catalog-postgres")]
use crate::PostgresCatalog;
use crate::{CatalogBackend, CatalogError, CatalogResult, CatalogStore, InMemoryCatalog};
use sarwatch_core::CatalogConfig;
use std::sync::Arc;

/// Create a catalog backend based on configuration
pub async fn create_catalog(config: &CatalogConfig) -> CatalogResult<Arc<dyn CatalogStore>> {
    tracing::info!(backend = %config.backend, "Initializing catalog");

    match config.backend {
        #[cfg(feature = "catalog-dynamodb")]
        CatalogBackend::DynamoDb => {
            let catalog = DynamoCatalog::new(
                config.event_table.clone(),
                config.product_table.clone(),
                config.aws_region.clone(),
                config.dynamodb_endpoint.clone(),
            )
            .await?;
            Ok(Arc::new(catalog))
        }

        #[cfg(not(feature = "catalog-dynamodb"))]
        CatalogBackend::DynamoDb => Err(CatalogError::ConfigError(
            "DynamoDB catalog backend not available (catalog-dynamodb feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "catalog-postgres")]
        CatalogBackend::Postgres => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                CatalogError::ConfigError("DATABASE_URL not configured".to_string())
            })?;
            let catalog =
                PostgresCatalog::connect(database_url, config.db_max_connections, config.page_size)
                    .await?;
            Ok(Arc::new(catalog))
        }

        #[cfg(not(feature = "catalog-postgres"))]
        CatalogBackend::Postgres => Err(CatalogError::ConfigError(
            "PostgreSQL catalog backend not available (catalog-postgres feature not enabled)"
                .to_string(),
        )),

        CatalogBackend::Memory => {
            tracing::warn!("Using the in-memory catalog; records are lost on exit");
            Ok(Arc::new(InMemoryCatalog::with_page_size(config.page_size)))
        }
    }
}
