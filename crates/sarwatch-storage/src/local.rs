use crate::keys;
use crate::traits::{ObjectRef, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
///
/// Emulates a set of buckets as sibling directories under `root`:
/// `{root}/{bucket}/{key}`. The destination bucket is one of them, and
/// source objects are read from whichever bucket they name.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    bucket: String,
    public_base_url: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `root` - Directory holding one subdirectory per bucket
    /// * `bucket` - Destination bucket name
    /// * `public_base_url` - Optional base for published URLs, defaults to `https://{bucket}`
    pub async fn new(
        root: impl Into<PathBuf>,
        bucket: String,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let root = root.into();
        validate_bucket(&bucket)?;
        let bucket_dir = root.join(&bucket);

        fs::create_dir_all(&bucket_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                bucket_dir.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            root,
            bucket,
            public_base_url,
        })
    }

    /// Convert a bucket and key to a filesystem path
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        keys::validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket.contains('/') || bucket.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "Bucket name '{}' contains invalid characters",
            bucket
        )));
    }
    Ok(())
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        let path = self.object_path(&self.bucket, storage_key)?;
        self.ensure_parent_dir(&path).await?;

        fs::write(&path, &data)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            content_type = %content_type,
            "Local upload successful"
        );

        Ok(self.public_url(storage_key))
    }

    async fn object_size(&self, source: &ObjectRef) -> StorageResult<u64> {
        let path = self.object_path(&source.bucket, &source.key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(
                format!("{}/{}", source.bucket, source.key),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy_from(&self, source: &ObjectRef, to_key: &str) -> StorageResult<String> {
        let from = self.object_path(&source.bucket, &source.key)?;
        let to = self.object_path(&self.bucket, to_key)?;

        if !fs::try_exists(&from).await? {
            return Err(StorageError::NotFound(format!(
                "{}/{}",
                source.bucket, source.key
            )));
        }

        self.ensure_parent_dir(&to).await?;
        fs::copy(&from, &to)
            .await
            .map_err(|e| StorageError::CopyFailed(e.to_string()))?;

        tracing::debug!(from = %from.display(), to = %to.display(), "Local copy successful");

        Ok(self.public_url(to_key))
    }

    fn public_url(&self, storage_key: &str) -> String {
        keys::public_url(self.public_base_url.as_deref(), &self.bucket, storage_key)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
