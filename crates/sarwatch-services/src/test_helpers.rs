//! In-memory search and job API doubles for service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use sarwatch_core::{Granule, SearchGranule, StatusCode};

use crate::hyp3::{Hyp3Error, Job, JobApi, JobRequest};
use crate::search::{GranuleSearch, SearchError, SearchParams, StackEntry};

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap()
}

pub fn search_granule(name: &str, day: u32) -> SearchGranule {
    SearchGranule {
        granule_name: name.to_string(),
        product_id: Some(format!("{}-SLC", name)),
        start_time: format!("2020-01-{:02}T00:00:00.000000", day),
        path: 1,
        frame: 2,
        wkt: "POINT(0 0)".to_string(),
    }
}

pub fn granule(name: &str) -> Granule {
    Granule::try_from(&search_granule(name, 1)).unwrap()
}

fn status_error(status: u16) -> SearchError {
    if status < 500 {
        SearchError::Client {
            status,
            body: "rejected".to_string(),
        }
    } else {
        SearchError::Server {
            status,
            body: "unavailable".to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockSearch {
    results: Arc<Mutex<Vec<SearchGranule>>>,
    search_failure: Arc<Mutex<Option<u16>>>,
    stacks: Arc<Mutex<HashMap<String, Vec<StackEntry>>>>,
    stack_failures: Arc<Mutex<HashMap<String, u16>>>,
    products: Arc<Mutex<HashMap<String, SearchGranule>>>,
    product_list_calls: Arc<AtomicUsize>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(self, results: Vec<SearchGranule>) -> Self {
        *self.results.lock().unwrap() = results;
        self
    }

    pub fn failing_search(self, status: u16) -> Self {
        *self.search_failure.lock().unwrap() = Some(status);
        self
    }

    /// Register a stack for `reference`; every entry also becomes
    /// resolvable through `product_list`.
    pub fn with_stack(self, reference: &str, entries: &[(&str, u32, Option<f64>)]) -> Self {
        let mut stack = Vec::new();
        for (name, day, baseline) in entries {
            let granule = search_granule(name, *day);
            let product_id = granule.product_id.clone().unwrap();
            self.products
                .lock()
                .unwrap()
                .insert(product_id.clone(), granule);
            stack.push(StackEntry {
                product_id,
                temporal_baseline: *baseline,
            });
        }
        self.stacks
            .lock()
            .unwrap()
            .insert(reference.to_string(), stack);
        self
    }

    pub fn failing_stack(self, reference: &str, status: u16) -> Self {
        self.stack_failures
            .lock()
            .unwrap()
            .insert(reference.to_string(), status);
        self
    }

    pub fn product_list_calls(&self) -> usize {
        self.product_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GranuleSearch for MockSearch {
    async fn search(&self, _params: &SearchParams) -> Result<Vec<SearchGranule>, SearchError> {
        if let Some(status) = *self.search_failure.lock().unwrap() {
            return Err(status_error(status));
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn baseline_stack(&self, granule_name: &str) -> Result<Vec<StackEntry>, SearchError> {
        if let Some(status) = self.stack_failures.lock().unwrap().get(granule_name) {
            return Err(status_error(*status));
        }
        Ok(self
            .stacks
            .lock()
            .unwrap()
            .get(granule_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn product_list(&self, product_ids: &[String]) -> Result<Vec<SearchGranule>, SearchError> {
        self.product_list_calls.fetch_add(1, Ordering::SeqCst);
        let products = self.products.lock().unwrap();
        // The service answers in its own order, not the request order.
        let mut found: Vec<SearchGranule> = product_ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect();
        found.sort_by(|a, b| a.granule_name.cmp(&b.granule_name));
        Ok(found)
    }
}

#[derive(Clone, Default)]
pub struct MockJobApi {
    submissions: Arc<Mutex<Vec<Vec<JobRequest>>>>,
    reject_references: Arc<Mutex<HashMap<String, u16>>>,
    jobs: Arc<Mutex<HashMap<String, Job>>>,
    get_failures: Arc<Mutex<HashSet<String>>>,
    next_id: Arc<AtomicUsize>,
}

impl MockJobApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any batch whose first job references `granule` with a 400.
    pub fn rejecting(self, granule: &str) -> Self {
        self.rejecting_with(granule, 400)
    }

    pub fn rejecting_with(self, granule: &str, status: u16) -> Self {
        self.reject_references
            .lock()
            .unwrap()
            .insert(granule.to_string(), status);
        self
    }

    pub fn accept_all(&self) {
        self.reject_references.lock().unwrap().clear();
    }

    pub fn with_job(self, job: Job) -> Self {
        self.add_job(job);
        self
    }

    pub fn add_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.job_id.clone(), job);
    }

    pub fn failing_get(self, job_id: &str) -> Self {
        self.get_failures
            .lock()
            .unwrap()
            .insert(job_id.to_string());
        self
    }

    pub fn submissions(&self) -> Vec<Vec<JobRequest>> {
        self.submissions.lock().unwrap().clone()
    }
}

pub fn job(job_id: &str, status: StatusCode) -> Job {
    Job {
        job_id: job_id.to_string(),
        job_type: "RTC_GAMMA".to_string(),
        request_time: date(1),
        status_code: status,
        files: None,
        browse_images: None,
        thumbnail_images: None,
    }
}

fn reference_of(request: &JobRequest) -> Option<String> {
    request
        .job_parameters
        .get("granules")?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl JobApi for MockJobApi {
    async fn submit_jobs(&self, jobs: &[JobRequest]) -> Result<Vec<Job>, Hyp3Error> {
        self.submissions.lock().unwrap().push(jobs.to_vec());

        let reference = jobs.first().and_then(reference_of).unwrap_or_default();
        if let Some(&status) = self.reject_references.lock().unwrap().get(&reference) {
            let body = format!("granule {} is not processable", reference);
            return Err(if status >= 500 {
                Hyp3Error::Server { status, body }
            } else {
                Hyp3Error::Client { status, body }
            });
        }

        let mut accepted = Vec::with_capacity(jobs.len());
        for request in jobs {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut job = job(&format!("job-{}", id), StatusCode::Pending);
            job.job_type = request.job_type.clone();
            self.jobs
                .lock()
                .unwrap()
                .insert(job.job_id.clone(), job.clone());
            accepted.push(job);
        }
        Ok(accepted)
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, Hyp3Error> {
        if self.get_failures.lock().unwrap().contains(job_id) {
            return Err(Hyp3Error::Server {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| Hyp3Error::Client {
                status: 404,
                body: format!("job {} not found", job_id),
            })
    }
}
