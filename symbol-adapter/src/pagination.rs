//! Exhaustive page-by-page fetching
//!
//! Pages are requested with increasing `pageNumber` until one comes back
//! with fewer items than the page size in effect. There is no upper bound
//! on the number of pages. Any failure aborts the whole fetch; the caller
//! never sees a partial result.

use crate::{types::Page, Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Anything that can serve one page of a paged endpoint
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a single page as raw JSON items
    async fn fetch_page(
        &self,
        path: &str,
        params: &[(String, String)],
        page_number: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<Page<Value>>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch_page(
        &self,
        path: &str,
        params: &[(String, String)],
        page_number: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<Page<Value>> {
        (**self)
            .fetch_page(path, params, page_number, page_size, cancel)
            .await
    }
}

/// Drives a [`PageSource`] until the last page
#[derive(Debug, Clone)]
pub struct PagedFetcher<S> {
    source: S,
    page_size: u32,
}

impl<S: PageSource> PagedFetcher<S> {
    /// Create fetcher with the requested page size
    pub fn new(source: S, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::Config("page size must be positive".to_string()));
        }
        Ok(Self { source, page_size })
    }

    /// Fetch and decode every item across all pages, in page order.
    ///
    /// Cancellation is checked before each page request.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_number = 1u32;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let page = self
                .source
                .fetch_page(path, params, page_number, self.page_size, cancel)
                .await?;

            // Nodes clamp oversized requests and echo the size they applied
            let effective_size = page
                .pagination
                .map(|p| p.page_size)
                .filter(|size| *size > 0)
                .unwrap_or(self.page_size);

            let count = page.data.len();
            for item in page.data {
                items.push(serde_json::from_value(item)?);
            }

            debug!(path, page_number, count, total = items.len(), "Fetched page");

            if count < effective_size as usize {
                break;
            }
            page_number += 1;
        }

        Ok(items)
    }
}
