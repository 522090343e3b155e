//! Job submission orchestrator
//!
//! For every event, submits one single-scene job plus one paired job per
//! neighbor for each granule not yet processed, and records the resulting
//! products. Every granule ends a run submitted, recorded as FAILED, or
//! skipped for a transient error of either service.

use std::sync::Arc;

use chrono::Utc;
use futures::TryStreamExt;
use serde::Serialize;

use sarwatch_core::{AppError, Event, Granule, JobProfiles, Product, SearchGranule};
use sarwatch_db::{CatalogStore, CatalogStreams};

use crate::filter::get_unprocessed_granules;
use crate::hyp3::{Job, JobApi, JobRequest};
use crate::pairing::find_neighbors;
use crate::search::GranuleSearch;

/// Counts for one orchestrator run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub events_failed: usize,
    pub granules_submitted: usize,
    pub granules_failed: usize,
    pub granules_skipped: usize,
    pub products_written: usize,
}

/// What happened to one granule.
#[derive(Debug, Clone, PartialEq)]
pub enum GranuleOutcome {
    /// Jobs accepted; one product per job.
    Submitted(Vec<Product>),
    /// Jobs can never succeed; a FAILED placeholder.
    Failed(Product),
    /// Transient error; retried next run.
    Skipped(String),
}

pub struct FindNewService {
    catalog: Arc<dyn CatalogStore>,
    search: Arc<dyn GranuleSearch>,
    jobs: Arc<dyn JobApi>,
    profiles: JobProfiles,
    max_neighbors: usize,
}

impl FindNewService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        search: Arc<dyn GranuleSearch>,
        jobs: Arc<dyn JobApi>,
        profiles: JobProfiles,
        max_neighbors: usize,
    ) -> Self {
        Self {
            catalog,
            search,
            jobs,
            profiles,
            max_neighbors,
        }
    }

    /// Process every event in catalog scan order.
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        let mut summary = RunSummary::default();
        let mut events = self.catalog.events();

        while let Some(event) = events.try_next().await? {
            self.process_event(&event, &mut summary).await;
        }

        tracing::info!(
            events = summary.events,
            events_failed = summary.events_failed,
            granules_submitted = summary.granules_submitted,
            granules_failed = summary.granules_failed,
            granules_skipped = summary.granules_skipped,
            products_written = summary.products_written,
            "Find-new run complete"
        );
        Ok(summary)
    }

    /// Process a single event.
    pub async fn run_for_event(&self, event_id: &str) -> Result<RunSummary, AppError> {
        let event = self
            .catalog
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        let mut summary = RunSummary::default();
        self.process_event(&event, &mut summary).await;
        Ok(summary)
    }

    async fn process_event(&self, event: &Event, summary: &mut RunSummary) {
        summary.events += 1;
        if let Err(e) = self.handle_event(event, summary).await {
            summary.events_failed += 1;
            tracing::error!(
                event_id = %event.event_id,
                error = %e,
                "Event processing failed, moving to next event"
            );
        }
    }

    #[tracing::instrument(skip(self, event, summary), fields(event_id = %event.event_id))]
    async fn handle_event(&self, event: &Event, summary: &mut RunSummary) -> Result<(), AppError> {
        let granules = get_unprocessed_granules(self.search.as_ref(), self.catalog.as_ref(), event)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        tracing::info!(count = granules.len(), "Processing unprocessed granules");

        for granule in &granules {
            let products = match self.submit_jobs_for_granule(&event.event_id, granule).await {
                GranuleOutcome::Submitted(products) => {
                    summary.granules_submitted += 1;
                    products
                }
                GranuleOutcome::Failed(product) => {
                    summary.granules_failed += 1;
                    vec![product]
                }
                GranuleOutcome::Skipped(reason) => {
                    summary.granules_skipped += 1;
                    tracing::warn!(
                        granule = %granule.granule_name,
                        reason = %reason,
                        "Skipping granule until next run"
                    );
                    continue;
                }
            };

            for product in &products {
                self.catalog.put_product(product).await?;
                summary.products_written += 1;
            }
        }

        Ok(())
    }

    /// Pair, prepare and submit the jobs of one granule.
    pub async fn submit_jobs_for_granule(
        &self,
        event_id: &str,
        granule: &SearchGranule,
    ) -> GranuleOutcome {
        let reference = match Granule::try_from(granule) {
            Ok(reference) => reference,
            Err(e) => return GranuleOutcome::Skipped(e.to_string()),
        };
        let failed = |message: String| {
            tracing::warn!(
                granule = %reference.granule_name,
                error = %message,
                "Recording FAILED product"
            );
            GranuleOutcome::Failed(Product::failed(
                event_id,
                reference.clone(),
                message,
                Utc::now(),
            ))
        };

        let neighbors =
            match find_neighbors(self.search.as_ref(), &granule.granule_name, self.max_neighbors)
                .await
            {
                Ok(neighbors) => neighbors,
                Err(e) if e.is_transient() => return GranuleOutcome::Skipped(e.to_string()),
                Err(e) => return failed(e.to_string()),
            };

        let mut requests = vec![
            JobRequest::from_profile(&self.profiles.rtc, &[granule.granule_name.as_str()])
                .with_name(event_id),
        ];
        let mut granule_lists = vec![vec![reference.clone()]];

        for neighbor in &neighbors {
            let secondary = match Granule::try_from(neighbor) {
                Ok(secondary) => secondary,
                Err(e) => return failed(e.to_string()),
            };
            requests.push(
                JobRequest::from_profile(
                    &self.profiles.insar,
                    &[granule.granule_name.as_str(), neighbor.granule_name.as_str()],
                )
                .with_name(event_id),
            );
            granule_lists.push(vec![reference.clone(), secondary]);
        }

        tracing::info!(
            granule = %granule.granule_name,
            jobs = requests.len(),
            "Submitting jobs"
        );

        match self.jobs.submit_jobs(&requests).await {
            Ok(jobs) => GranuleOutcome::Submitted(
                jobs.into_iter()
                    .zip(granule_lists)
                    .map(|(job, granules)| product_from_job(job, event_id, granules))
                    .collect(),
            ),
            Err(e) if e.is_transient() => GranuleOutcome::Skipped(e.to_string()),
            Err(e) => failed(e.to_string()),
        }
    }
}

fn product_from_job(job: Job, event_id: &str, granules: Vec<Granule>) -> Product {
    Product {
        product_id: job.job_id,
        event_id: event_id.to_string(),
        granules,
        job_type: Some(job.job_type),
        status_code: job.status_code,
        processing_date: job.request_time,
        files: None,
        message: None,
        extra: Default::default(),
    }
}
