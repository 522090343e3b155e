//! Sarwatch Storage Library
//!
//! Object storage for harvested artifacts. Artifacts are copied from the
//! processing service's bucket into a destination bucket and published
//! under a public URL.
//!
//! # Storage key format
//!
//! All artifacts of a product live under `{event_id}/{product_id}/{filename}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use sarwatch_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectRef, Storage, StorageError, StorageResult};
