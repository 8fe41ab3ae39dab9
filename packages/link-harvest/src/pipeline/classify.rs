//! Relevance classification of discovered links.

use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{ClassificationError, EngineError};
use crate::html::truncate_chars;
use crate::pipeline::prompts::format_classify_prompt;
use crate::pipeline::range::RangeSpec;
use crate::traits::engine::{ExtractionEngine, ExtractionEngineExt};
use crate::types::config::HarvestConfig;
use crate::types::link::{ClassifiedLinks, LinkRecord};

/// Structured answer requested from the engine.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LinkSelection {
    /// Range list of link indices that clearly match the goal, most relevant first
    pub high_confidence: String,

    /// Range list of link indices that might match the goal, most relevant first
    pub mid_confidence: String,
}

/// Ask the engine to bucket `links` by relevance to `guidance`.
///
/// Fails as a unit: an engine failure or an undecodable range list is an
/// error, never an empty partition. An empty link list returns an empty
/// partition without calling the engine.
pub async fn classify_links<E: ExtractionEngine>(
    engine: &E,
    links: &[LinkRecord],
    guidance: &str,
    markdown: &str,
    html: &str,
    config: &HarvestConfig,
) -> Result<ClassifiedLinks, ClassificationError> {
    if links.is_empty() {
        debug!("no links to classify");
        return Ok(ClassifiedLinks::default());
    }

    let prompt = format_classify_prompt(
        links,
        guidance,
        truncate_chars(markdown, config.max_content_chars),
        truncate_chars(html, config.max_html_chars),
    );

    let selection = tokio::time::timeout(
        config.call_timeout(),
        engine.generate::<LinkSelection>(&prompt),
    )
    .await
    .map_err(|_| EngineError::Timeout {
        secs: config.call_timeout_secs,
    })?
    .inspect_err(|e| warn!(error = %e, "link classification call failed"))?;

    let high = decode("high", &selection.high_confidence)?;
    let mid = decode("mid", &selection.mid_confidence)?;
    let classified = partition(links, &high, &mid);

    info!(
        links = links.len(),
        high = classified.high.len(),
        mid = classified.mid.len(),
        remaining = classified.remaining.len(),
        "classified links"
    );
    Ok(classified)
}

/// Split `links` into high / mid / remaining from decoded range lists.
///
/// Out-of-range indices are dropped, repeats within `high` are dropped,
/// `mid` skips anything already used, and `remaining` keeps discovery
/// order. The three buckets always partition `links`.
pub fn partition(links: &[LinkRecord], high: &RangeSpec, mid: &RangeSpec) -> ClassifiedLinks {
    let bound = links.len();
    let mut used = HashSet::new();

    let mut take = |spec: &RangeSpec| -> Vec<LinkRecord> {
        spec.indices(bound)
            .into_iter()
            .filter(|&i| used.insert(i))
            .map(|i| links[i].clone())
            .collect()
    };

    let high = take(high);
    let mid = take(mid);

    let remaining = links
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, link)| link.clone())
        .collect();

    ClassifiedLinks {
        high,
        mid,
        remaining,
    }
}

fn decode(bucket: &'static str, raw: &str) -> Result<RangeSpec, ClassificationError> {
    RangeSpec::parse(raw).map_err(|source| {
        warn!(bucket, raw = %raw, error = %source, "undecodable range list");
        ClassificationError::RangeSpec {
            bucket,
            raw: raw.to_string(),
            source,
        }
    })
}
