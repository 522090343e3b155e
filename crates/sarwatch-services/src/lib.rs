//! Sarwatch Services Library
//!
//! Clients for the granule search and HyP3 job APIs, and the two batch
//! workflows built on them:
//!
//! - [`submit::FindNewService`] finds unprocessed granules for every event
//!   and submits processing jobs for them.
//! - [`harvest::HarvestService`] polls submitted jobs and publishes the
//!   artifacts of finished ones.

pub mod filter;
pub mod harvest;
pub mod hyp3;
pub mod pairing;
pub mod search;
pub mod submit;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use filter::{get_unprocessed_granules, FilterError};
pub use harvest::{HarvestError, HarvestService, HarvestSummary};
pub use hyp3::{Hyp3Client, Hyp3Error, Job, JobApi, JobFile, JobRequest, S3Location};
pub use pairing::{find_neighbors, PairingError};
pub use search::{AsfSearchClient, GranuleSearch, SearchError, SearchParams, StackEntry};
pub use submit::{FindNewService, GranuleOutcome, RunSummary};
