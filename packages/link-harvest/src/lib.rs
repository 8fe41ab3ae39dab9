//! Link Harvest Library
//!
//! Finds the links on a page that matter for a goal, then turns the pages
//! behind the links a human confirms into rows of a table.
//!
//! # Pipeline
//!
//! 1. **Discovery** - fetch a seed page, collect its same-origin links and
//!    let the extraction engine rank them into high / mid / remaining.
//! 2. **Selection** - the caller (usually a human) confirms a subset.
//! 3. **Extraction** - every confirmed page is fetched and filled into the
//!    user's columns, in sequential batches with concurrency inside each
//!    batch. A page that fails becomes an error row, never a failed run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use link_harvest::{ExtractionRequest, FieldSchema, HarvestConfig, Harvester, ResultSink};
//! use link_harvest::testing::{MockEngine, MockFetcher};
//!
//! let harvester = Harvester::new(MockEngine::new(), MockFetcher::new(), HarvestConfig::default())?;
//! let discovery = harvester.discover("https://example.com", "job postings").await?;
//!
//! let request = ExtractionRequest::new(FieldSchema::parse_list("Title, Location")?);
//! let sink = ResultSink::new();
//! harvester
//!     .extract(discovery.classified.preselected(), request, &sink, CancellationToken::new())
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capabilities the pipeline consumes (ExtractionEngine, PageFetcher)
//! - [`types`] - Links, field schemas, rows and configuration
//! - [`pipeline`] - Discovery, classification, extraction and batching
//! - [`fetch`] - HTTP and rate-limited fetchers
//! - [`html`] - Link extraction and content normalization
//! - [`export`] - CSV / TSV rendering
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod export;
pub mod fetch;
pub mod html;
pub mod pipeline;
pub mod sink;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    ClassificationError, EngineError, FetchError, HarvestError, RangeSpecError, SchemaError,
};
pub use traits::{
    engine::{ExtractionEngine, ExtractionEngineExt},
    fetcher::PageFetcher,
    schema::StructuredOutput,
};
pub use types::{
    config::HarvestConfig,
    link::{ClassifiedLinks, LinkRecord, Relevance},
    page::FetchedPage,
    row::{columns, FieldValue, ResultRow, EXTRACTION_FAILED},
    schema::{Field, FieldSchema},
};

// Re-export pipeline components
pub use pipeline::{
    classify_links, partition, BatchOrchestrator, Discovery, ExtractionRequest, Harvester,
    RangeSpec, RangeToken, RecordExtractor, RunSummary,
};

pub use export::{to_csv, to_tsv};
pub use fetch::{FetcherExt, HttpFetcher, RateLimitedFetcher};
pub use sink::{progress_channel, BatchProgress, ProgressReceiver, ResultSink};

#[cfg(feature = "openai")]
pub use ai::OpenAiEngine;

// Re-export testing utilities
pub use testing::{MockEngine, MockFetcher};
