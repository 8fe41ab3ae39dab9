//! Capabilities the pipeline consumes.
//!
//! - [`engine::ExtractionEngine`] - the AI model (free text + schema-constrained output)
//! - [`fetcher::PageFetcher`] - raw HTML over HTTP
//!
//! Both are injected so the pipeline can run against mocks in tests.

pub mod engine;
pub mod fetcher;
pub mod schema;
