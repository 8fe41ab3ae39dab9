//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the harvest library
//! without making real engine or network calls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{EngineError, EngineResult, FetchError, FetchResult};
use crate::traits::{engine::ExtractionEngine, fetcher::PageFetcher};
use crate::types::page::FetchedPage;

/// Scripted outcome for a mock engine call.
#[derive(Debug, Clone)]
enum MockReply<T> {
    Ok(T),
    Fail(String),
    Panic,
}

/// A mock engine with scripted responses.
///
/// Responses are keyed by a marker substring of the prompt; the first rule
/// whose marker appears in the prompt wins, so register more specific
/// markers (such as the classification prompt) before per-URL ones.
/// Unmatched structured calls fail as non-conforming and unmatched
/// completions fail as request errors.
#[derive(Default)]
pub struct MockEngine {
    /// Rules for `generate_structured`
    structured: Arc<RwLock<Vec<(String, MockReply<Value>)>>>,

    /// Rules for `complete`
    completions: Arc<RwLock<Vec<(String, MockReply<String>)>>>,

    /// Latency applied to every call
    latency: Duration,

    /// Calls currently in flight and the peak seen
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockEngineCall>>>,
}

/// Record of a call made to the mock engine.
#[derive(Debug, Clone)]
pub enum MockEngineCall {
    Complete { prompt: String },
    Structured { prompt: String, schema: Value },
}

impl MockEngineCall {
    pub fn prompt(&self) -> &str {
        match self {
            Self::Complete { prompt } | Self::Structured { prompt, .. } => prompt,
        }
    }
}

impl MockEngine {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer structured calls whose prompt contains `marker` with `value`.
    pub fn with_structured(self, marker: impl Into<String>, value: Value) -> Self {
        self.structured
            .write()
            .unwrap()
            .push((marker.into(), MockReply::Ok(value)));
        self
    }

    /// Fail structured calls whose prompt contains `marker`.
    pub fn with_structured_failure(self, marker: impl Into<String>) -> Self {
        self.structured
            .write()
            .unwrap()
            .push((marker.into(), MockReply::Fail("scripted structured failure".into())));
        self
    }

    /// Answer completions whose prompt contains `marker` with `text`.
    pub fn with_completion(self, marker: impl Into<String>, text: impl Into<String>) -> Self {
        self.completions
            .write()
            .unwrap()
            .push((marker.into(), MockReply::Ok(text.into())));
        self
    }

    /// Fail completions whose prompt contains `marker`.
    pub fn with_completion_failure(self, marker: impl Into<String>) -> Self {
        self.completions
            .write()
            .unwrap()
            .push((marker.into(), MockReply::Fail("scripted completion failure".into())));
        self
    }

    /// Panic inside any call whose prompt contains `marker`.
    pub fn with_panic(self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.structured
            .write()
            .unwrap()
            .insert(0, (marker.clone(), MockReply::Panic));
        self.completions
            .write()
            .unwrap()
            .insert(0, (marker, MockReply::Panic));
        self
    }

    /// Delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockEngineCall> {
        self.calls.read().unwrap().clone()
    }

    /// Prompts of structured calls.
    pub fn structured_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockEngineCall::Structured { .. }))
            .map(|c| c.prompt().to_string())
            .collect()
    }

    /// Prompts of completion calls.
    pub fn completion_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockEngineCall::Complete { .. }))
            .map(|c| c.prompt().to_string())
            .collect()
    }

    /// Highest number of calls that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn simulate(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn lookup<T: Clone>(
        rules: &RwLock<Vec<(String, MockReply<T>)>>,
        prompt: &str,
    ) -> Option<MockReply<T>> {
        rules
            .read()
            .unwrap()
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl ExtractionEngine for MockEngine {
    async fn complete(&self, prompt: &str) -> EngineResult<String> {
        self.calls.write().unwrap().push(MockEngineCall::Complete {
            prompt: prompt.to_string(),
        });
        self.simulate().await;

        match Self::lookup(&self.completions, prompt) {
            Some(MockReply::Ok(text)) => Ok(text),
            Some(MockReply::Fail(reason)) => Err(EngineError::Request(reason.into())),
            Some(MockReply::Panic) => panic!("mock engine panic"),
            None => Err(EngineError::Request("no scripted completion".into())),
        }
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> EngineResult<Value> {
        self.calls.write().unwrap().push(MockEngineCall::Structured {
            prompt: prompt.to_string(),
            schema: schema.clone(),
        });
        self.simulate().await;

        match Self::lookup(&self.structured, prompt) {
            Some(MockReply::Ok(value)) => Ok(value),
            Some(MockReply::Fail(reason)) => Err(EngineError::non_conforming(reason)),
            Some(MockReply::Panic) => panic!("mock engine panic"),
            None => Err(EngineError::non_conforming("no scripted structured response")),
        }
    }
}

/// A mock fetcher serving pages from memory.
///
/// Unknown URLs answer `404 Not Found`.
#[derive(Default)]
pub struct MockFetcher {
    /// Pages by URL
    pages: Arc<RwLock<HashMap<String, String>>>,

    /// Status failures by URL
    failures: Arc<RwLock<HashMap<String, u16>>>,

    /// Latency applied to every fetch
    latency: Duration,

    /// URLs fetched, in call order
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    /// Answer `url` with a non-2xx status.
    pub fn with_failure(self, url: impl Into<String>, status: u16) -> Self {
        self.failures.write().unwrap().insert(url.into(), status);
        self
    }

    /// Delay every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// URLs fetched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(status) = self.failures.read().unwrap().get(url).copied() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                reason: "Scripted Failure".to_string(),
            });
        }

        match self.pages.read().unwrap().get(url) {
            Some(html) => Ok(FetchedPage::new(url, html.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
                reason: "Not Found".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_matching_marker_wins() {
        let engine = MockEngine::new()
            .with_structured("classify", json!({"a": 1}))
            .with_structured("https://a.com", json!({"b": 2}));

        let value = engine
            .generate_structured("classify https://a.com", &json!({}))
            .await
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(engine.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_calls_fail() {
        let engine = MockEngine::new();

        assert!(engine.complete("anything").await.is_err());
        assert!(matches!(
            engine.generate_structured("anything", &json!({})).await,
            Err(EngineError::NonConforming { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.com/", "<p>hi</p>")
            .with_failure("https://a.com/down", 503);

        assert_eq!(
            fetcher.fetch("https://a.com/").await.unwrap().html,
            "<p>hi</p>"
        );
        assert!(matches!(
            fetcher.fetch("https://a.com/down").await,
            Err(FetchError::Status { status: 503, .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://a.com/none").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(fetcher.calls().len(), 3);
    }
}
