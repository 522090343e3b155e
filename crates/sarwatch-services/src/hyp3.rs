//! HyP3 job API client
//!
//! Authentication is a cookie session: a GET to the Earthdata login URL with
//! basic credentials leaves the session cookie in the client's cookie store,
//! and every later request carries it.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use sarwatch_core::models::timestamp;
use sarwatch_core::{AppError, Hyp3Config, JobProfile, StatusCode};

#[derive(Debug, Error)]
pub enum Hyp3Error {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("job request rejected ({status}): {body}")]
    Client { status: u16, body: String },

    #[error("job service error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("job request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected job response: {0}")]
    Decode(String),
}

impl Hyp3Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Hyp3Error::Server { .. } | Hyp3Error::Transport(_))
    }
}

impl From<Hyp3Error> for AppError {
    fn from(err: Hyp3Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

const JOB_NAME_MAX_LEN: usize = 100;

/// One job of a batch submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    pub job_type: String,
    pub job_parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JobRequest {
    /// Build a request from a profile; `granules` is set from the given names.
    pub fn from_profile(profile: &JobProfile, granules: &[&str]) -> Self {
        let mut job_parameters = profile.parameters.clone();
        job_parameters.insert(
            "granules".to_string(),
            Value::Array(granules.iter().map(|g| Value::String(g.to_string())).collect()),
        );
        Self {
            job_type: profile.job_type.clone(),
            job_parameters,
            name: None,
        }
    }

    /// Tag the job with a name; the service caps names at 100 characters.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.chars().take(JOB_NAME_MAX_LEN).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobFile {
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    pub s3: S3Location,
}

/// A job as reported by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub job_type: String,
    #[serde(with = "timestamp")]
    pub request_time: DateTime<Utc>,
    pub status_code: StatusCode,
    #[serde(default)]
    pub files: Option<Vec<JobFile>>,
    #[serde(default)]
    pub browse_images: Option<Vec<String>>,
    #[serde(default)]
    pub thumbnail_images: Option<Vec<String>>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    jobs: &'a [JobRequest],
}

#[derive(Deserialize)]
struct SubmitResponse {
    jobs: Vec<Job>,
}

#[async_trait]
pub trait JobApi: Send + Sync {
    /// Submit a batch; jobs come back in request order.
    async fn submit_jobs(&self, jobs: &[JobRequest]) -> Result<Vec<Job>, Hyp3Error>;

    async fn get_job(&self, job_id: &str) -> Result<Job, Hyp3Error>;
}

/// Authenticated HyP3 client
pub struct Hyp3Client {
    http_client: reqwest::Client,
    api_url: String,
}

impl Hyp3Client {
    /// Build the client and open an authenticated session.
    pub async fn connect(config: &Hyp3Config) -> Result<Self, Hyp3Error> {
        let (username, password) = match (&config.username, &config.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => {
                return Err(Hyp3Error::Authentication(
                    "Earthdata credentials are not configured".to_string(),
                ))
            }
        };

        let http_client = build_http_client()
            .map_err(|e| Hyp3Error::Authentication(format!("{:#}", e)))?;

        let response = http_client
            .get(&config.auth_url)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Earthdata login failed");
            return Err(Hyp3Error::Authentication(format!(
                "login returned {}: {}",
                status, body
            )));
        }

        tracing::info!(api_url = %config.api_url, "HyP3 session established");

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, Hyp3Error> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            return Err(Hyp3Error::Client {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(Hyp3Error::Server {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Hyp3Error::Decode(e.to_string()))
    }
}

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(concat!("sarwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client for HyP3")
}

#[async_trait]
impl JobApi for Hyp3Client {
    #[tracing::instrument(skip(self, jobs), fields(job_count = jobs.len()))]
    async fn submit_jobs(&self, jobs: &[JobRequest]) -> Result<Vec<Job>, Hyp3Error> {
        let response = self
            .http_client
            .post(format!("{}/jobs", self.api_url))
            .json(&SubmitRequest { jobs })
            .send()
            .await?;

        let submitted: SubmitResponse = Self::read_json(response).await?;
        if submitted.jobs.len() != jobs.len() {
            tracing::error!(
                job_ids = ?submitted.jobs.iter().map(|j| j.job_id.as_str()).collect::<Vec<_>>(),
                expected = jobs.len(),
                "Job count mismatch; returned jobs are not tracked"
            );
            return Err(Hyp3Error::Decode(format!(
                "submitted {} jobs but the service returned {}",
                jobs.len(),
                submitted.jobs.len()
            )));
        }

        tracing::info!(
            job_ids = ?submitted.jobs.iter().map(|j| j.job_id.as_str()).collect::<Vec<_>>(),
            "Jobs submitted"
        );
        Ok(submitted.jobs)
    }

    #[tracing::instrument(skip(self))]
    async fn get_job(&self, job_id: &str) -> Result<Job, Hyp3Error> {
        let response = self
            .http_client
            .get(format!("{}/jobs/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::read_json(response).await
    }
}
