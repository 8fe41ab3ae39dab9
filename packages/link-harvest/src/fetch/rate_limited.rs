//! Rate-limited fetcher wrapper.
//!
//! Wraps any [`PageFetcher`] with a governor quota so a run never hits the
//! target site faster than configured, regardless of batch concurrency.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::FetchedPage;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher that waits for a permit before every request.
pub struct RateLimitedFetcher<F: PageFetcher> {
    inner: F,
    limiter: Arc<DirectRateLimiter>,
}

impl<F: PageFetcher> RateLimitedFetcher<F> {
    /// Allow `requests_per_second` fetches per second (minimum 1).
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(fetcher, Quota::per_second(rps))
    }

    /// Sustained rate with bursts of up to `burst` requests (minimum 1 each).
    pub fn with_burst(fetcher: F, requests_per_second: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(fetcher, Quota::per_second(rps).allow_burst(burst))
    }

    /// Use a custom quota.
    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }
}

/// Extension trait for wrapping fetchers.
pub trait FetcherExt: PageFetcher + Sized {
    /// Wrap this fetcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::new(self, requests_per_second)
    }
}

impl<F: PageFetcher + Sized> FetcherExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.com/1", "<p>1</p>")
            .with_page("https://example.com/2", "<p>2</p>")
            .with_page("https://example.com/3", "<p>3</p>")
            .rate_limited(2);

        let start = Instant::now();
        for n in 1..=3 {
            fetcher
                .fetch(&format!("https://example.com/{n}"))
                .await
                .unwrap();
        }

        // first permit is immediate, the next two wait ~500ms each
        assert!(start.elapsed().as_millis() >= 500);
        assert_eq!(fetcher.inner().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let fetcher = MockFetcher::new().rate_limited(10);
        assert!(fetcher.fetch("https://example.com/missing").await.is_err());
    }

    #[tokio::test]
    async fn test_burst_allows_immediate_requests() {
        let fetcher = RateLimitedFetcher::with_burst(
            MockFetcher::new()
                .with_page("https://example.com/1", "1")
                .with_page("https://example.com/2", "2"),
            1,
            2,
        );

        let start = Instant::now();
        fetcher.fetch("https://example.com/1").await.unwrap();
        fetcher.fetch("https://example.com/2").await.unwrap();

        assert!(start.elapsed().as_millis() < 500);
    }

    #[test]
    fn test_zero_rate_clamps_to_one() {
        let _fetcher = MockFetcher::new().rate_limited(0);
    }
}
