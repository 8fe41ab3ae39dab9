//! Typed errors for the harvest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! failed discovery apart from a failed fetch or a rejected column list.
//!
//! Only whole-phase failures travel as `Err`: fetching the seed page and
//! classifying its links. Per-link failures during extraction are folded
//! into error rows by the pipeline and never surface here.

use thiserror::Error;

/// Errors that abort a whole phase (discovery or run setup).
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The seed page could not be fetched
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The engine could not rank the discovered links
    #[error("link classification failed: {0}")]
    Classification(#[from] ClassificationError),

    /// Column names were rejected
    #[error("invalid field schema: {0}")]
    Schema(#[from] SchemaError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors raised by the fetch capability.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection, TLS or body read failure
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} {reason} for {url}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    /// Request exceeded the configured timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors raised by the extraction engine capability.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine unreachable or the request failed
    #[error("engine request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Engine answered but not with a value matching the schema
    #[error("engine output did not match schema: {reason}")]
    NonConforming { reason: String },

    /// Engine call exceeded the configured timeout
    #[error("engine call timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl EngineError {
    /// Build a `NonConforming` error from anything displayable.
    pub fn non_conforming(reason: impl std::fmt::Display) -> Self {
        Self::NonConforming {
            reason: reason.to_string(),
        }
    }
}

/// Errors that make link classification fail as a unit.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The engine call itself failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine returned a range list that does not follow the grammar
    #[error("undecodable {bucket} range list {raw:?}: {source}")]
    RangeSpec {
        bucket: &'static str,
        raw: String,
        #[source]
        source: RangeSpecError,
    },
}

/// Grammar violations in a range list such as `"10-20, 3, 90"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeSpecError {
    /// Token is neither an integer nor `a-b`
    #[error("invalid token {token:?}")]
    InvalidToken { token: String },

    /// Range end lies before its start
    #[error("descending range {start}-{end}")]
    DescendingRange { start: usize, end: usize },
}

/// Column name validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No column names given
    #[error("at least one column name is required")]
    Empty,

    /// A column name is blank after trimming
    #[error("column {position} is blank")]
    BlankName { position: usize },

    /// A column name collides with a bookkeeping column
    #[error("column {name:?} is reserved")]
    Reserved { name: String },

    /// Two column names normalize to the same key
    #[error("columns {first:?} and {second:?} both map to key {key:?}")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },
}

/// Result type alias for whole-phase operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
