use thiserror::Error;

use sarwatch_core::AppError;

/// Catalog operation errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog backend error: {0}")]
    BackendError(String),

    #[error("Malformed catalog record: {0}")]
    Serialization(String),

    #[error("Invalid continuation token: {0}")]
    InvalidCursor(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Catalog(other.to_string()),
        }
    }
}

#[cfg(feature = "catalog-postgres")]
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::BackendError(err.to_string())
    }
}

#[cfg(feature = "catalog-postgres")]
impl From<sqlx::migrate::MigrateError> for CatalogError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CatalogError::BackendError(format!("migration failed: {}", err))
    }
}
