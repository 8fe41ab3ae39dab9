//! Per-link record extraction with structured, degraded and terminal paths.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult, FetchError, FetchResult};
use crate::html::{normalize, truncate_chars};
use crate::pipeline::prompts::{format_extract_prompt, format_fallback_prompt};
use crate::traits::{engine::ExtractionEngine, fetcher::PageFetcher};
use crate::types::{
    config::HarvestConfig,
    link::LinkRecord,
    page::FetchedPage,
    row::{FieldValue, ResultRow},
    schema::FieldSchema,
};

/// What to extract from every confirmed link.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Columns to fill
    pub schema: FieldSchema,

    /// Free-text extraction guidance
    pub guidance: Option<String>,
}

impl ExtractionRequest {
    pub fn new(schema: FieldSchema) -> Self {
        Self {
            schema,
            guidance: None,
        }
    }

    /// Attach guidance. Blank guidance is treated as none.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        let guidance = guidance.into();
        self.guidance = (!guidance.trim().is_empty()).then_some(guidance);
        self
    }
}

/// Turns one link into one [`ResultRow`].
///
/// Never fails: a fetch failure or a failure of both engine paths yields an
/// error row so one bad page cannot sink a batch.
pub struct RecordExtractor<E, F> {
    engine: Arc<E>,
    fetcher: Arc<F>,
    config: HarvestConfig,
}

impl<E, F> Clone for RecordExtractor<E, F> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            fetcher: Arc::clone(&self.fetcher),
            config: self.config.clone(),
        }
    }
}

impl<E: ExtractionEngine, F: PageFetcher> RecordExtractor<E, F> {
    pub fn new(engine: Arc<E>, fetcher: Arc<F>, config: HarvestConfig) -> Self {
        Self {
            engine,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Fetch `link` and extract one row for `request`.
    pub async fn extract_link(&self, link: &LinkRecord, request: &ExtractionRequest) -> ResultRow {
        let schema = &request.schema;
        let guidance = request.guidance.as_deref();

        let page = match self.fetch(&link.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %link.url, error = %e, "fetch failed, emitting error row");
                return ResultRow::failed(link.clone(), schema, format!("fetch failed: {e}"));
            }
        };

        let markdown = normalize(&page.html);

        let structured_err = match self
            .extract_structured(link, schema, guidance, &markdown, &page.html)
            .await
        {
            Ok(values) => {
                debug!(url = %link.url, "structured extraction succeeded");
                return ResultRow::new(link.clone(), values);
            }
            Err(e) => e,
        };
        warn!(
            url = %link.url,
            error = %structured_err,
            "structured extraction failed, trying plain-text fallback"
        );

        match self.extract_degraded(schema, guidance, &markdown).await {
            Ok(values) => ResultRow::new(link.clone(), values),
            Err(fallback_err) => {
                warn!(url = %link.url, error = %fallback_err, "fallback extraction failed");
                ResultRow::failed(
                    link.clone(),
                    schema,
                    format!(
                        "structured extraction failed: {structured_err}; fallback extraction failed: {fallback_err}"
                    ),
                )
            }
        }
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        tokio::time::timeout(self.config.fetch_timeout(), self.fetcher.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })?
    }

    async fn extract_structured(
        &self,
        link: &LinkRecord,
        schema: &FieldSchema,
        guidance: Option<&str>,
        markdown: &str,
        html: &str,
    ) -> EngineResult<IndexMap<String, FieldValue>> {
        let prompt = format_extract_prompt(
            link,
            schema,
            guidance,
            truncate_chars(markdown, self.config.max_content_chars),
            truncate_chars(html, self.config.max_html_chars),
        );
        let value = self
            .timed(self.engine.generate_structured(&prompt, &schema.json_schema()))
            .await?;
        map_structured(schema, &value)
    }

    async fn extract_degraded(
        &self,
        schema: &FieldSchema,
        guidance: Option<&str>,
        markdown: &str,
    ) -> EngineResult<IndexMap<String, FieldValue>> {
        let prompt = format_fallback_prompt(
            schema,
            guidance,
            truncate_chars(markdown, self.config.fallback_content_chars),
        );
        let text = self.timed(self.engine.complete(&prompt)).await?;
        Ok(parse_fallback(schema, &text))
    }

    async fn timed<T>(&self, call: impl Future<Output = EngineResult<T>>) -> EngineResult<T> {
        tokio::time::timeout(self.config.call_timeout(), call)
            .await
            .map_err(|_| EngineError::Timeout {
                secs: self.config.call_timeout_secs,
            })?
    }
}

/// Map a structured response back onto the original column names.
///
/// A non-object response does not conform. Absent keys and `null` become
/// `Missing`; strings are entity-decoded and trimmed; other scalars are
/// stringified.
pub fn map_structured(
    schema: &FieldSchema,
    value: &Value,
) -> EngineResult<IndexMap<String, FieldValue>> {
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::non_conforming("response is not a JSON object"))?;

    let values = schema
        .fields()
        .iter()
        .map(|field| {
            let cell = match object.get(&field.key) {
                None | Some(Value::Null) => FieldValue::Missing,
                Some(Value::String(s)) => text_value(&html_escape::decode_html_entities(s)),
                Some(other) => FieldValue::Value(other.to_string()),
            };
            (field.name.clone(), cell)
        })
        .collect();

    Ok(values)
}

/// Pull `Field: value` lines out of a plain-text answer.
///
/// A field matches only at the start of a line (after an optional `-` or `*`
/// bullet), case-insensitively on the original column name, and its value
/// stays on that line. No line for a field means `Failed`; `N/A` means
/// `Missing`.
pub fn parse_fallback(schema: &FieldSchema, text: &str) -> IndexMap<String, FieldValue> {
    schema
        .names()
        .map(|name| {
            let pattern = format!(
                r"(?im)^[ \t]*(?:[-*][ \t]*)?{}:[ \t]*(.+)",
                regex::escape(name)
            );
            let cell = Regex::new(&pattern)
                .ok()
                .and_then(|re| re.captures(text))
                .and_then(|caps| caps.get(1))
                .map(|m| {
                    let raw = m.as_str().trim();
                    if raw.eq_ignore_ascii_case("n/a") {
                        FieldValue::Missing
                    } else {
                        text_value(&html_escape::decode_html_entities(raw))
                    }
                })
                .unwrap_or(FieldValue::Failed);
            (name.to_string(), cell)
        })
        .collect()
}

fn text_value(s: &str) -> FieldValue {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Value(trimmed.to_string())
    }
}
