//! Sarwatch Core Library
//!
//! Domain models, error types, configuration and JSON helpers shared by every
//! sarwatch component.

pub mod backend_types;
pub mod config;
pub mod error;
pub mod json;
pub mod models;

// Re-export commonly used types
pub use backend_types::{CatalogBackend, StorageBackend};
pub use config::{
    ApiConfig, CatalogConfig, Config, Hyp3Config, JobProfile, JobProfiles, SearchConfig,
    StorageConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    Event, Granule, ProcessingTimeframe, Product, ProductFiles, SearchGranule, StatusCode,
};
