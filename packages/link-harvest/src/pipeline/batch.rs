//! Batched extraction over confirmed links.
//!
//! Batches run strictly one after another; links inside a batch run as
//! spawned tasks, bounded by a semaphore, and are joined before the next
//! batch starts. Rows reach the sink a whole batch at a time, in selection
//! order.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::pipeline::extract::{ExtractionRequest, RecordExtractor};
use crate::sink::{progress_channel, BatchProgress, ProgressReceiver, ProgressSender, ResultSink};
use crate::traits::{engine::ExtractionEngine, fetcher::PageFetcher};
use crate::types::{link::LinkRecord, row::ResultRow};

/// Error text for links interrupted by cancellation.
pub const CANCELLED_ERROR: &str = "cancelled";

/// Outcome of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,

    /// Batches whose rows reached the sink
    pub batches_run: usize,

    /// Rows appended by this run
    pub rows: usize,

    pub succeeded: usize,

    pub failed: usize,

    pub cancelled: bool,
}

/// Runs a [`RecordExtractor`] over links in sequential batches.
pub struct BatchOrchestrator<E, F> {
    extractor: RecordExtractor<E, F>,
    progress: ProgressSender,
}

impl<E, F> BatchOrchestrator<E, F>
where
    E: ExtractionEngine + 'static,
    F: PageFetcher + 'static,
{
    pub fn new(extractor: RecordExtractor<E, F>) -> Self {
        let (progress, _) = progress_channel();
        Self {
            extractor,
            progress,
        }
    }

    /// Watch progress of the current (or last) run.
    pub fn subscribe(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    /// Extract every link, appending rows to `sink` after each batch.
    ///
    /// Never fails: per-link failures, panicked tasks and cancellation all
    /// end up as error rows.
    pub async fn run(
        &self,
        links: Vec<LinkRecord>,
        request: ExtractionRequest,
        sink: &ResultSink,
        cancel: CancellationToken,
    ) -> RunSummary {
        let run_id = Uuid::now_v7();
        self.run_batches(run_id, links, request, sink, cancel)
            .instrument(info_span!("batch_run", %run_id))
            .await
    }

    async fn run_batches(
        &self,
        run_id: Uuid,
        links: Vec<LinkRecord>,
        request: ExtractionRequest,
        sink: &ResultSink,
        cancel: CancellationToken,
    ) -> RunSummary {
        let config = self.extractor.config();
        let batch_size = config.batch_size.max(1);
        let total_batches = config.batch_count(links.len());
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let request = Arc::new(request);

        let mut summary = RunSummary {
            run_id,
            batches_run: 0,
            rows: 0,
            succeeded: 0,
            failed: 0,
            cancelled: false,
        };
        self.publish(&summary, total_batches, total_batches == 0);

        info!(
            links = links.len(),
            total_batches,
            batch_size,
            "starting extraction run"
        );

        for (index, chunk) in links.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let batch = index + 1;
            info!(batch, total_batches, links = chunk.len(), "batch started");

            let rows = self.run_batch(chunk, &request, &semaphore, &cancel).await;

            summary.batches_run = batch;
            summary.rows += rows.len();
            summary.failed += rows.iter().filter(|r| r.is_error()).count();
            summary.succeeded = summary.rows - summary.failed;
            sink.append(rows);

            if cancel.is_cancelled() {
                summary.cancelled = true;
            }
            let finished = summary.cancelled || batch == total_batches;
            self.publish(&summary, total_batches, finished);

            info!(
                batch,
                rows = summary.rows,
                failed = summary.failed,
                "batch complete"
            );

            if summary.cancelled {
                break;
            }
        }

        if summary.cancelled {
            warn!(
                batches_run = summary.batches_run,
                "extraction run cancelled"
            );
            self.publish(&summary, total_batches, true);
        }

        info!(
            rows = summary.rows,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "extraction run finished"
        );
        summary
    }

    async fn run_batch(
        &self,
        chunk: &[LinkRecord],
        request: &Arc<ExtractionRequest>,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Vec<ResultRow> {
        let handles: Vec<_> = chunk
            .iter()
            .cloned()
            .map(|link| {
                let extractor = self.extractor.clone();
                let request = Arc::clone(request);
                let semaphore = Arc::clone(semaphore);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let _permit = tokio::select! {
                        permit = semaphore.acquire_owned() => permit.ok(),
                        _ = cancel.cancelled() => {
                            return ResultRow::failed(link, &request.schema, CANCELLED_ERROR);
                        }
                    };
                    tokio::select! {
                        row = extractor.extract_link(&link, &request) => row,
                        _ = cancel.cancelled() => {
                            ResultRow::failed(link.clone(), &request.schema, CANCELLED_ERROR)
                        }
                    }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(chunk)
            .map(|(joined, link)| {
                joined.unwrap_or_else(|e| {
                    warn!(url = %link.url, error = %e, "link task aborted");
                    ResultRow::failed(link.clone(), &request.schema, format!("task failed: {e}"))
                })
            })
            .collect()
    }

    fn publish(&self, summary: &RunSummary, total_batches: usize, finished: bool) {
        self.progress.send_replace(BatchProgress {
            run_id: summary.run_id,
            current_batch: summary.batches_run,
            total_batches,
            rows_collected: summary.rows,
            finished,
            cancelled: summary.cancelled,
        });
    }
}
