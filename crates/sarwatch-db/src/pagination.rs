//! Continuation-token pagination.
//!
//! Backends return one [`Page`] per call together with an opaque [`Cursor`]
//! for the next page. [`paginate`] turns a page fetcher into a lazy stream
//! that requests the next page only once the current one is drained.

use std::future::Future;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};

/// Opaque continuation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    /// Encode a backend key as a token.
    pub fn encode<T: Serialize>(key: &T) -> CatalogResult<Self> {
        let json = serde_json::to_vec(key)?;
        Ok(Cursor(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode a token produced by [`Cursor::encode`].
    pub fn decode<T: DeserializeOwned>(&self) -> CatalogResult<T> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|e| CatalogError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::InvalidCursor(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

enum PageState {
    Start,
    Next(Cursor),
    Done,
}

/// Stream every item across all pages.
///
/// Each call starts again from the first page.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, CatalogResult<T>>
where
    T: Send + 'a,
    F: FnMut(Option<Cursor>) -> Fut + Send + 'a,
    Fut: Future<Output = CatalogResult<Page<T>>> + Send + 'a,
{
    stream::try_unfold((fetch, PageState::Start), |(mut fetch, state)| async move {
        let cursor = match state {
            PageState::Start => None,
            PageState::Next(cursor) => Some(cursor),
            PageState::Done => return Ok::<_, CatalogError>(None),
        };

        let page = fetch(cursor).await?;
        let next = match page.next {
            Some(cursor) => PageState::Next(cursor),
            None => PageState::Done,
        };
        Ok(Some((page.items, (fetch, next))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
    .try_flatten()
    .boxed()
}
