//! Neighbor pairing
//!
//! A paired job needs a secondary granule acquired before the reference.
//! Candidates come from the reference granule's baseline stack, nearest in
//! time first.

use std::collections::HashMap;

use thiserror::Error;

use sarwatch_core::SearchGranule;

use crate::search::{GranuleSearch, SearchError, StackEntry};

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("max_neighbors must be at least 1")]
    InvalidMaxNeighbors,

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl PairingError {
    pub fn is_transient(&self) -> bool {
        match self {
            PairingError::InvalidMaxNeighbors => false,
            PairingError::Search(e) => e.is_transient(),
        }
    }
}

/// Product ids of the `max_neighbors` stack entries nearest before the
/// reference, nearest first.
pub fn select_neighbor_ids(stack: &[StackEntry], max_neighbors: usize) -> Vec<String> {
    let mut prior: Vec<(f64, &str)> = stack
        .iter()
        .filter_map(|entry| match entry.temporal_baseline {
            Some(baseline) if baseline < 0.0 => Some((baseline, entry.product_id.as_str())),
            _ => None,
        })
        .collect();

    prior.sort_by(|a, b| b.0.total_cmp(&a.0));
    prior
        .into_iter()
        .take(max_neighbors)
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Up to `max_neighbors` granules to pair with `granule_name`, nearest first.
#[tracing::instrument(skip(search))]
pub async fn find_neighbors(
    search: &dyn GranuleSearch,
    granule_name: &str,
    max_neighbors: usize,
) -> Result<Vec<SearchGranule>, PairingError> {
    if max_neighbors == 0 {
        return Err(PairingError::InvalidMaxNeighbors);
    }

    let stack = search.baseline_stack(granule_name).await?;
    let ids = select_neighbor_ids(&stack, max_neighbors);
    if ids.is_empty() {
        tracing::debug!("No prior acquisitions in baseline stack");
        return Ok(Vec::new());
    }

    let mut neighbors = search.product_list(&ids).await?;

    let rank: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    neighbors.sort_by_key(|g| {
        g.product_id
            .as_deref()
            .and_then(|id| rank.get(id).copied())
            .unwrap_or(usize::MAX)
    });

    Ok(neighbors)
}
