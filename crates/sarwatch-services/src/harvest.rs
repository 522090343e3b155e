//! Harvest poller
//!
//! Walks every product still waiting on its job. Products whose job reached a
//! terminal state are written back exactly once; successful ones first get
//! their artifacts published to the destination bucket.

use std::sync::Arc;

use anyhow::Context;
use futures::TryStreamExt;
use serde::Serialize;
use thiserror::Error;

use sarwatch_core::{AppError, Product, ProductFiles, StatusCode};
use sarwatch_db::{CatalogError, CatalogStore, CatalogStreams};
use sarwatch_storage::keys::{content_type_for, file_name, product_key};
use sarwatch_storage::{ObjectRef, Storage, StorageError};

use crate::hyp3::{Hyp3Error, Job, JobApi};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("job lookup failed: {0}")]
    Job(#[from] Hyp3Error),

    #[error("job {0} has no {1}")]
    MissingFiles(String, &'static str),

    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Counts for one poller run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub checked: usize,
    pub unchanged: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: usize,
}

pub struct HarvestService {
    catalog: Arc<dyn CatalogStore>,
    jobs: Arc<dyn JobApi>,
    storage: Arc<dyn Storage>,
    http_client: reqwest::Client,
}

impl HarvestService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        jobs: Arc<dyn JobApi>,
        storage: Arc<dyn Storage>,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("sarwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client for artifact downloads")?;

        Ok(Self {
            catalog,
            jobs,
            storage,
            http_client,
        })
    }

    /// Poll every non-terminal product once.
    pub async fn run(&self) -> Result<HarvestSummary, AppError> {
        let mut summary = HarvestSummary::default();
        let mut products = self.catalog.products();

        while let Some(product) = products.try_next().await? {
            if product.is_terminal() {
                continue;
            }
            summary.checked += 1;

            match self.update_product(&product).await {
                Ok(None) => summary.unchanged += 1,
                Ok(Some(StatusCode::Succeeded)) => summary.succeeded += 1,
                Ok(Some(_)) => summary.failed += 1,
                Err(e) => {
                    summary.errors += 1;
                    tracing::error!(
                        product_id = %product.product_id,
                        event_id = %product.event_id,
                        error = %e,
                        "Product update failed, will retry next run"
                    );
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            unchanged = summary.unchanged,
            succeeded = summary.succeeded,
            failed = summary.failed,
            errors = summary.errors,
            "Harvest run complete"
        );
        Ok(summary)
    }

    /// Refresh one product from its job. Returns the new status when the
    /// record was written.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.product_id))]
    pub async fn update_product(
        &self,
        product: &Product,
    ) -> Result<Option<StatusCode>, HarvestError> {
        let job = self.jobs.get_job(&product.product_id).await?;

        let mut updated = product.clone();
        match &job.status_code {
            StatusCode::Succeeded => {
                updated.files = Some(self.harvest(product, &job).await?);
            }
            StatusCode::Failed => {}
            status => {
                tracing::debug!(status = %status, "Job still in progress");
                return Ok(None);
            }
        }
        updated.status_code = job.status_code.clone();

        self.catalog.put_product(&updated).await?;
        tracing::info!(status = %updated.status_code, "Product updated");
        Ok(Some(updated.status_code))
    }

    /// Publish the artifacts of a finished job under
    /// `<event_id>/<product_id>/`.
    pub async fn harvest(&self, product: &Product, job: &Job) -> Result<ProductFiles, HarvestError> {
        let primary = job
            .files
            .as_ref()
            .and_then(|files| files.first())
            .ok_or_else(|| HarvestError::MissingFiles(job.job_id.clone(), "files"))?;

        let source = ObjectRef::new(&primary.s3.bucket, &primary.s3.key);
        let product_size = self.storage.object_size(&source).await?;
        let product_name = file_name(&primary.s3.key).to_string();
        let product_url = self
            .storage
            .copy_from(
                &source,
                &product_key(&product.event_id, &product.product_id, &product_name),
            )
            .await?;

        let browse = first_image(&job.browse_images)
            .ok_or_else(|| HarvestError::MissingFiles(job.job_id.clone(), "browse images"))?;
        let browse_url = self.upload_image(product, browse).await?;

        let thumbnail = first_image(&job.thumbnail_images)
            .ok_or_else(|| HarvestError::MissingFiles(job.job_id.clone(), "thumbnail images"))?;
        let thumbnail_url = self.upload_image(product, thumbnail).await?;

        Ok(ProductFiles {
            browse_url,
            thumbnail_url,
            product_name,
            product_size,
            product_url,
        })
    }

    async fn upload_image(&self, product: &Product, url: &str) -> Result<String, HarvestError> {
        let download_error = |message: String| HarvestError::Download {
            url: url.to_string(),
            message,
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("status {}", response.status())));
        }
        let data = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let name = file_name(url);
        let key = product_key(&product.event_id, &product.product_id, name);
        Ok(self
            .storage
            .upload_with_key(&key, data.to_vec(), content_type_for(name))
            .await?)
    }
}

fn first_image(images: &Option<Vec<String>>) -> Option<&str> {
    images.as_ref()?.first().map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyp3::{JobFile, S3Location};
    use crate::test_helpers::{date, granule, job, MockJobApi};
    use sarwatch_db::{collect_all, InMemoryCatalog};
    use sarwatch_storage::LocalStorage;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        catalog: InMemoryCatalog,
        service: HarvestService,
        images: mockito::ServerGuard,
    }

    fn pending_product(product_id: &str) -> Product {
        let mut product = Product::failed("e1", granule("g1"), "", date(1));
        product.product_id = product_id.to_string();
        product.status_code = StatusCode::Pending;
        product.message = None;
        product.job_type = Some("RTC_GAMMA".to_string());
        product
    }

    fn succeeded_job(job_id: &str, images_url: &str) -> Job {
        let mut job = job(job_id, StatusCode::Succeeded);
        job.files = Some(vec![JobFile {
            filename: "S1_RTC.zip".to_string(),
            size: Some(11),
            url: None,
            s3: S3Location {
                bucket: "results".to_string(),
                key: format!("{}/S1_RTC.zip", job_id),
            },
        }]);
        job.browse_images = Some(vec![format!("{}/{}/S1_RTC.png", images_url, job_id)]);
        job.thumbnail_images = Some(vec![format!("{}/{}/S1_RTC_thumb.png", images_url, job_id)]);
        job
    }

    async fn fixture(jobs: MockJobApi) -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "public-bucket".to_string(), None)
            .await
            .unwrap();
        // Source objects live in the processing service's bucket.
        let results = dir.path().join("results");
        for job_id in ["job-done", "job-twice"] {
            std::fs::create_dir_all(results.join(job_id)).unwrap();
            std::fs::write(results.join(job_id).join("S1_RTC.zip"), b"zip content").unwrap();
        }

        let images = mockito::Server::new_async().await;
        let catalog = InMemoryCatalog::with_page_size(2);
        let service = HarvestService::new(
            Arc::new(catalog.clone()),
            Arc::new(jobs),
            Arc::new(storage),
        )
        .unwrap();

        Fixture {
            _dir: dir,
            catalog,
            service,
            images,
        }
    }

    async fn mock_images(server: &mut mockito::ServerGuard, job_id: &str) {
        for name in ["S1_RTC.png", "S1_RTC_thumb.png"] {
            server
                .mock("GET", format!("/{}/{}", job_id, name).as_str())
                .with_status(200)
                .with_body(b"png")
                .create_async()
                .await;
        }
    }

    async fn stored(catalog: &InMemoryCatalog) -> Vec<Product> {
        collect_all(catalog.products()).await.unwrap()
    }

    #[tokio::test]
    async fn test_succeeded_job_is_harvested() {
        let jobs = MockJobApi::new();
        let mut fx = fixture(jobs.clone()).await;
        jobs.add_job(succeeded_job("job-done", &fx.images.url()));
        mock_images(&mut fx.images, "job-done").await;
        fx.catalog.put_product(&pending_product("job-done")).await.unwrap();

        let summary = fx.service.run().await.unwrap();
        assert_eq!(summary.succeeded, 1);

        let products = stored(&fx.catalog).await;
        let product = &products[0];
        assert_eq!(product.status_code, StatusCode::Succeeded);
        let files = product.files.as_ref().unwrap();
        assert_eq!(files.product_name, "S1_RTC.zip");
        assert_eq!(files.product_size, 11);
        assert_eq!(
            files.product_url,
            "https://public-bucket/e1/job-done/S1_RTC.zip"
        );
        assert_eq!(
            files.browse_url,
            "https://public-bucket/e1/job-done/S1_RTC.png"
        );
        assert_eq!(
            files.thumbnail_url,
            "https://public-bucket/e1/job-done/S1_RTC_thumb.png"
        );
    }

    #[tokio::test]
    async fn test_failed_job_is_written_once() {
        let jobs = MockJobApi::new().with_job(job("job-failed", StatusCode::Failed));
        let fx = fixture(jobs).await;
        fx.catalog.put_product(&pending_product("job-failed")).await.unwrap();
        let before = fx.catalog.product_writes();

        let first = fx.service.run().await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(fx.catalog.product_writes(), before + 1);

        let second = fx.service.run().await.unwrap();
        assert_eq!(second.checked, 0);
        assert_eq!(fx.catalog.product_writes(), before + 1);

        let products = stored(&fx.catalog).await;
        assert_eq!(products[0].status_code, StatusCode::Failed);
        assert!(products[0].files.is_none());
    }

    #[tokio::test]
    async fn test_in_progress_job_is_not_written() {
        let jobs = MockJobApi::new().with_job(job("job-running", StatusCode::Running));
        let fx = fixture(jobs).await;
        fx.catalog.put_product(&pending_product("job-running")).await.unwrap();
        let before = fx.catalog.product_writes();

        for _ in 0..3 {
            let summary = fx.service.run().await.unwrap();
            assert_eq!(summary.unchanged, 1);
        }
        assert_eq!(fx.catalog.product_writes(), before);
        assert_eq!(stored(&fx.catalog).await[0].status_code, StatusCode::Pending);
    }

    #[tokio::test]
    async fn test_job_errors_skip_product() {
        let jobs = MockJobApi::new()
            .failing_get("job-flaky")
            .with_job(job("job-failed", StatusCode::Failed));
        let fx = fixture(jobs).await;
        fx.catalog.put_product(&pending_product("job-flaky")).await.unwrap();
        fx.catalog.put_product(&pending_product("job-failed")).await.unwrap();

        let summary = fx.service.run().await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_harvest_failure_leaves_record_untouched() {
        let mut fx = fixture(MockJobApi::new()).await;
        let job = succeeded_job("job-twice", &fx.images.url());
        fx.images
            .mock("GET", "/job-twice/S1_RTC.png")
            .with_status(404)
            .create_async()
            .await;

        let product = pending_product("job-twice");
        fx.catalog.put_product(&product).await.unwrap();
        let before = fx.catalog.product_writes();

        let err = fx.service.harvest(&product, &job).await.unwrap_err();
        assert!(matches!(err, HarvestError::Download { .. }));
        assert_eq!(fx.catalog.product_writes(), before);
    }

    #[tokio::test]
    async fn test_succeeded_job_without_files() {
        let fx = fixture(MockJobApi::new()).await;
        let product = pending_product("job-empty");
        let job = job("job-empty", StatusCode::Succeeded);

        let err = fx.service.harvest(&product, &job).await.unwrap_err();
        assert!(matches!(err, HarvestError::MissingFiles(_, "files")));
    }
}
