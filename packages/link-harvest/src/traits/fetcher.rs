//! Page fetcher trait.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::page::FetchedPage;

/// Fetch capability: raw HTML for a URL.
///
/// Non-2xx responses must come back as [`FetchError::Status`](crate::FetchError::Status),
/// never as a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single page by URL.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;
}
