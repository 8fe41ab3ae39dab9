//! Append-only result sink and run progress.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use crate::types::row::ResultRow;

/// Progress of a batch run, published after every batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub run_id: Uuid,

    /// 1-based index of the last completed batch (0 before the first)
    pub current_batch: usize,

    pub total_batches: usize,

    /// Rows appended to the sink so far
    pub rows_collected: usize,

    pub finished: bool,

    pub cancelled: bool,
}

/// Shared, append-only collection of result rows.
///
/// Cloning shares the same storage. Readers take snapshots; rows are never
/// removed or reordered, so the row count only grows.
#[derive(Clone, Default)]
pub struct ResultSink {
    rows: Arc<RwLock<Vec<ResultRow>>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rows` in order. Returns the new total.
    pub fn append(&self, rows: impl IntoIterator<Item = ResultRow>) -> usize {
        let mut guard = self.rows.write().unwrap_or_else(|e| e.into_inner());
        guard.extend(rows);
        guard.len()
    }

    /// Copy of every row appended so far.
    pub fn snapshot(&self) -> Vec<ResultRow> {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sender half of a progress channel.
pub type ProgressSender = watch::Sender<BatchProgress>;

/// Receiver half of a progress channel.
pub type ProgressReceiver = watch::Receiver<BatchProgress>;

/// Create a progress channel starting at the default (nothing run yet).
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    watch::channel(BatchProgress::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::link::LinkRecord;

    fn row(n: usize) -> ResultRow {
        ResultRow::new(
            LinkRecord::new(format!("L{n}"), format!("https://a.com/{n}")),
            Default::default(),
        )
    }

    #[test]
    fn test_append_is_ordered_and_shared() {
        let sink = ResultSink::new();
        let reader = sink.clone();

        assert_eq!(sink.append([row(0), row(1)]), 2);
        let before = reader.snapshot();
        assert_eq!(sink.append([row(2)]), 3);

        assert_eq!(before.len(), 2);
        let urls: Vec<_> = reader.snapshot().into_iter().map(|r| r.link.url).collect();
        assert_eq!(
            urls,
            vec!["https://a.com/0", "https://a.com/1", "https://a.com/2"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let sink = ResultSink::new();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        sink.append([row(n * 100 + i)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(sink.len(), 200);
    }
}
