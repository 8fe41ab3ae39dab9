//! Extraction engine trait.
//!
//! The engine is the AI model used both to rank links and to fill rows.
//! It is stateless from the pipeline's point of view: one prompt in,
//! one value or error out.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::traits::schema::StructuredOutput;

/// Extraction engine capability.
///
/// Implementations wrap a specific model provider. Latency and occasional
/// malformed output are expected; callers treat them as recoverable.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Free-text completion.
    async fn complete(&self, prompt: &str) -> EngineResult<String>;

    /// Schema-constrained generation.
    ///
    /// Returns a JSON value conforming to `schema`, or
    /// [`EngineError::NonConforming`] when the model cannot produce one.
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> EngineResult<Value>;
}

/// Typed structured generation on top of any engine.
#[async_trait]
pub trait ExtractionEngineExt: ExtractionEngine {
    /// Generate a value of type `T`, with the schema derived from `T`.
    async fn generate<T: StructuredOutput + Send>(&self, prompt: &str) -> EngineResult<T> {
        let schema = T::strict_schema();
        let value = self.generate_structured(prompt, &schema).await?;
        serde_json::from_value(value).map_err(EngineError::non_conforming)
    }
}

impl<E: ExtractionEngine> ExtractionEngineExt for E {}
