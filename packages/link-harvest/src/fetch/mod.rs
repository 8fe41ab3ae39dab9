//! Page fetching.
//!
//! - [`HttpFetcher`] - reqwest-backed fetcher with browser-like headers
//! - [`RateLimitedFetcher`] - governor-backed wrapper for any fetcher

pub mod http;
pub mod rate_limited;

pub use http::HttpFetcher;
pub use rate_limited::{FetcherExt, RateLimitedFetcher};
