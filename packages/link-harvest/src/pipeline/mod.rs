//! The harvest pipeline.
//!
//! - [`discover`] - seed page to ranked links ([`Harvester`])
//! - [`classify`] - engine-backed relevance buckets
//! - [`range`] - RangeSpec codec for engine index lists
//! - [`extract`] - one link to one row, with fallbacks
//! - [`batch`] - sequential batches, concurrent links
//! - [`prompts`] - engine prompt templates

pub mod batch;
pub mod classify;
pub mod discover;
pub mod extract;
pub mod prompts;
pub mod range;

pub use batch::{BatchOrchestrator, RunSummary, CANCELLED_ERROR};
pub use classify::{classify_links, partition, LinkSelection};
pub use discover::{Discovery, Harvester};
pub use extract::{ExtractionRequest, RecordExtractor};
pub use range::{RangeSpec, RangeToken};
