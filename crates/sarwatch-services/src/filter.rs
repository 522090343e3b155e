use std::collections::HashSet;

use futures::TryStreamExt;
use thiserror::Error;

use sarwatch_core::{Event, SearchGranule};
use sarwatch_db::{CatalogError, CatalogStore, CatalogStreams};

use crate::search::{GranuleSearch, SearchError, SearchParams};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Granules found for `event` that no stored product of the event references
/// as its first granule, in search order.
pub async fn get_unprocessed_granules(
    search: &dyn GranuleSearch,
    catalog: &dyn CatalogStore,
    event: &Event,
) -> Result<Vec<SearchGranule>, FilterError> {
    let granules = search.search(&SearchParams::for_event(event)).await?;

    let processed: HashSet<String> = catalog
        .products_for_event(&event.event_id, None)
        .try_filter_map(|product| async move {
            Ok(product.reference_granule().map(|g| g.granule_name.clone()))
        })
        .try_collect()
        .await?;

    let found = granules.len();
    let unprocessed: Vec<SearchGranule> = granules
        .into_iter()
        .filter(|g| !processed.contains(&g.granule_name))
        .collect();

    tracing::debug!(
        event_id = %event.event_id,
        found,
        unprocessed = unprocessed.len(),
        "Filtered processed granules"
    );
    Ok(unprocessed)
}
