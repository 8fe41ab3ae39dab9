//! Discovery and extraction entry points.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{HarvestError, Result};
use crate::html::{extract_links, normalize};
use crate::pipeline::batch::{BatchOrchestrator, RunSummary};
use crate::pipeline::classify::classify_links;
use crate::pipeline::extract::{ExtractionRequest, RecordExtractor};
use crate::sink::{ProgressReceiver, ResultSink};
use crate::traits::{engine::ExtractionEngine, fetcher::PageFetcher};
use crate::types::{
    config::HarvestConfig,
    link::{ClassifiedLinks, LinkRecord},
};

/// Result of the discovery phase, handed to the human for confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    /// Seed page URL after redirects
    pub page_url: String,

    /// Links in discovery order
    pub links: Vec<LinkRecord>,

    pub classified: ClassifiedLinks,
}

/// The two-phase pipeline: discover and rank links, then extract rows from
/// the confirmed ones.
///
/// # Example
///
/// ```rust,ignore
/// use link_harvest::{ExtractionRequest, FieldSchema, HarvestConfig, Harvester, ResultSink};
///
/// let harvester = Harvester::new(engine, fetcher, HarvestConfig::default())?;
/// let discovery = harvester.discover("https://example.com/portfolio", "portfolio companies").await?;
///
/// let request = ExtractionRequest::new(FieldSchema::parse_list("Name, Founded, CEO")?);
/// let sink = ResultSink::new();
/// let summary = harvester
///     .extract(discovery.classified.preselected(), request, &sink, CancellationToken::new())
///     .await;
/// ```
pub struct Harvester<E, F> {
    engine: Arc<E>,
    fetcher: Arc<F>,
    config: HarvestConfig,
    orchestrator: BatchOrchestrator<E, F>,
}

impl<E, F> Harvester<E, F>
where
    E: ExtractionEngine + 'static,
    F: PageFetcher + 'static,
{
    /// Create a harvester. Fails if `config` would stall a run.
    pub fn new(engine: E, fetcher: F, config: HarvestConfig) -> Result<Self> {
        Self::from_shared(Arc::new(engine), Arc::new(fetcher), config)
    }

    /// Create a harvester around already shared capabilities.
    pub fn from_shared(engine: Arc<E>, fetcher: Arc<F>, config: HarvestConfig) -> Result<Self> {
        config.validate()?;
        let extractor =
            RecordExtractor::new(Arc::clone(&engine), Arc::clone(&fetcher), config.clone());
        Ok(Self {
            engine,
            fetcher,
            config,
            orchestrator: BatchOrchestrator::new(extractor),
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Watch batch progress of extraction runs.
    pub fn progress(&self) -> ProgressReceiver {
        self.orchestrator.subscribe()
    }

    /// Fetch the seed page, extract its links and rank them against `guidance`.
    ///
    /// Fetch and classification failures propagate; nothing is retried.
    #[instrument(skip_all, fields(seed_url = %seed_url))]
    pub async fn discover(&self, seed_url: &str, guidance: &str) -> Result<Discovery> {
        let page = tokio::time::timeout(self.config.fetch_timeout(), self.fetcher.fetch(seed_url))
            .await
            .map_err(|_| crate::error::FetchError::Timeout {
                url: seed_url.to_string(),
            })??;

        // relative links resolve against where we actually landed
        let links = extract_links(&page.html, &page.final_url);
        let markdown = normalize(&page.html);
        info!(
            links = links.len(),
            content_chars = markdown.len(),
            "seed page processed"
        );

        let classified = classify_links(
            self.engine.as_ref(),
            &links,
            guidance,
            &markdown,
            &page.html,
            &self.config,
        )
        .await?;

        Ok(Discovery {
            page_url: page.final_url,
            links,
            classified,
        })
    }

    /// [`discover`](Self::discover) that gives up when `cancel` fires.
    pub async fn discover_with_cancel(
        &self,
        seed_url: &str,
        guidance: &str,
        cancel: CancellationToken,
    ) -> Result<Discovery> {
        tokio::select! {
            result = self.discover(seed_url, guidance) => result,
            _ = cancel.cancelled() => Err(HarvestError::Cancelled),
        }
    }

    /// Extract one row per confirmed link into `sink`.
    pub async fn extract(
        &self,
        links: Vec<LinkRecord>,
        request: ExtractionRequest,
        sink: &ResultSink,
        cancel: CancellationToken,
    ) -> RunSummary {
        self.orchestrator.run(links, request, sink, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassificationError, FetchError};
    use crate::testing::{MockEngine, MockFetcher};
    use serde_json::json;
    use std::time::Duration;

    const SEED: &str = "https://a.com/x/y";

    fn seed_html() -> &'static str {
        r#"<html><body>
            <h1>Portfolio</h1>
            <a href="/z">Zed</a>
            <a href="z2">Zed Two</a>
            <a href="https://b.com/q">Elsewhere</a>
        </body></html>"#
    }

    #[tokio::test]
    async fn test_discover_ranks_same_origin_links() {
        let engine = MockEngine::new().with_structured(
            "Evaluate the links",
            json!({"high_confidence": "1", "mid_confidence": ""}),
        );
        let fetcher = MockFetcher::new().with_page(SEED, seed_html());
        let harvester = Harvester::new(engine, fetcher, HarvestConfig::default()).unwrap();

        let discovery = harvester.discover(SEED, "companies").await.unwrap();

        assert_eq!(discovery.links.len(), 2);
        assert_eq!(discovery.classified.high[0].url, "https://a.com/x/z2");
        assert_eq!(discovery.classified.remaining[0].url, "https://a.com/z");
        assert!(discovery.classified.mid.is_empty());
    }

    #[tokio::test]
    async fn test_seed_fetch_failure_propagates() {
        let fetcher = MockFetcher::new().with_failure(SEED, 503);
        let harvester =
            Harvester::new(MockEngine::new(), fetcher, HarvestConfig::default()).unwrap();

        let err = harvester.discover(SEED, "companies").await.unwrap_err();

        assert!(matches!(
            err,
            HarvestError::Fetch(FetchError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_classification_failure_propagates() {
        let fetcher = MockFetcher::new().with_page(SEED, seed_html());
        let harvester =
            Harvester::new(MockEngine::new(), fetcher, HarvestConfig::default()).unwrap();

        let err = harvester.discover(SEED, "companies").await.unwrap_err();

        assert!(matches!(
            err,
            HarvestError::Classification(ClassificationError::Engine(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_cancelled() {
        let fetcher = MockFetcher::new()
            .with_page(SEED, seed_html())
            .with_latency(Duration::from_secs(10));
        let harvester =
            Harvester::new(MockEngine::new(), fetcher, HarvestConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = harvester
            .discover_with_cancel(SEED, "companies", cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Cancelled));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = HarvestConfig::default().with_batch_size(0);
        assert!(Harvester::new(MockEngine::new(), MockFetcher::new(), config).is_err());
    }
}
