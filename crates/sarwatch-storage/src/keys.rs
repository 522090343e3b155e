//! Storage key and URL helpers shared by every backend.

use crate::traits::{StorageError, StorageResult};

/// Key of a product artifact in the destination bucket.
pub fn product_key(event_id: &str, product_id: &str, filename: &str) -> String {
    format!("{}/{}/{}", event_id, product_id, filename)
}

/// Last path segment of an object key or URL, without query string.
pub fn file_name(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}

/// Public URL of a key: `https://{bucket}/{key}` unless a base URL is set.
pub fn public_url(base_url: Option<&str>, bucket: &str, key: &str) -> String {
    match base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}/{}", bucket, key),
    }
}

/// Reject keys that could escape their bucket.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' contains invalid characters",
            key
        )));
    }
    Ok(())
}

/// Content type from a file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
