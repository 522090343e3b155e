//! Sarwatch Catalog Library
//!
//! The catalog holds two tables: "events" keyed by `event_id`, and
//! "products" keyed by (`event_id`, `product_id`) with a secondary index on
//! (`status_code`, `processing_date`).
//!
//! Backends implement [`CatalogStore`] one page at a time; callers consume
//! whole result sets through the lazy streams in [`CatalogStreams`].

pub mod catalog;
#[cfg(feature = "catalog-dynamodb")]
pub mod dynamodb;
pub mod error;
pub mod factory;
pub mod memory;
pub mod pagination;
#[cfg(feature = "catalog-postgres")]
pub mod postgres;

// Re-export commonly used types
pub use catalog::{collect_all, CatalogStore, CatalogStreams};
#[cfg(feature = "catalog-dynamodb")]
pub use dynamodb::DynamoCatalog;
pub use error::{CatalogError, CatalogResult};
pub use factory::create_catalog;
pub use memory::InMemoryCatalog;
pub use pagination::{paginate, Cursor, Page};
#[cfg(feature = "catalog-postgres")]
pub use postgres::PostgresCatalog;
pub use sarwatch_core::CatalogBackend;
